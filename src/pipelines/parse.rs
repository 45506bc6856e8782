use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

const MAX_RECOMMENDATIONS: usize = 5;

/// Outcome of parsing a raw model reply. Absence of valid JSON is not an
/// error, it is a degraded-but-valid outcome.
#[derive(Debug, Clone)]
pub enum Parsed {
    Structured(AiPlan),
    TextOnly(Vec<String>),
    Empty,
}

/// Candidate plan fragment as the model returns it: every field optional,
/// every field repairable downstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiPlan {
    pub summary: Option<String>,
    pub weekly_plan: Vec<AiWeek>,
    pub final_week_strategy: Option<String>,
    pub study_tips: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiWeek {
    pub week: Option<u32>,
    pub focus: Option<String>,
    /// Day name (monday..sunday) -> task; BTreeMap keeps iteration order
    /// stable across runs
    pub days: BTreeMap<String, AiTask>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiTask {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(deserialize_with = "deserialize_duration")]
    pub duration_minutes: Option<u32>,
    pub resource: Option<String>,
    pub task_type: Option<String>,
}

// Models return durations as numbers, floats, or strings like "45 minutes";
// accept all of them.
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct DurationVisitor;

    impl<'de> Visitor<'de> for DurationVisitor {
        type Value = Option<u32>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a duration as number or string")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
            Ok(Some(value.min(u32::MAX as u64) as u32))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
            Ok(if value > 0 { Some(value as u32) } else { None })
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
            Ok(if value > 0.0 { Some(value as u32) } else { None })
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
            let digits: String = value.chars().take_while(|c| c.is_ascii_digit()).collect();
            Ok(digits.parse::<u32>().ok())
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }
    }

    deserializer.deserialize_any(DurationVisitor)
}

/// Remove trailing commas from JSON (invalid but common in model output)
fn remove_trailing_commas(json: &str) -> String {
    let mut result = String::with_capacity(json.len());
    let chars: Vec<char> = json.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        if ch == ',' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j < chars.len() && matches!(chars[j], '}' | ']') {
                i += 1;
                continue;
            }
        }
        result.push(ch);
        i += 1;
    }

    result
}

/// Strip code fences and smart quotes before boundary extraction.
fn sanitize(raw: &str) -> String {
    let mut sanitized = raw.replace("```json", "");
    sanitized = sanitized.replace("```", "");
    sanitized = sanitized.replace('\u{201C}', "\"");
    sanitized = sanitized.replace('\u{201D}', "\"");
    sanitized = sanitized.replace('\u{2018}', "'");
    sanitized = sanitized.replace('\u{2019}', "'");
    sanitized
}

/// Extract the first balanced `{...}` span, tracking strings and escapes so
/// braces inside string values do not end the span early.
fn balanced_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut brace_count = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => brace_count += 1,
            '}' if !in_string => {
                brace_count -= 1;
                if brace_count == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Best-effort JSON extraction from surrounding prose. Returns a string
/// that parses as a JSON value, or None.
pub fn extract_json(text: &str) -> Option<String> {
    // The whole reply may already be clean JSON.
    let trimmed = text.trim();
    if serde_json::from_str::<serde_json::Value>(trimmed).is_ok() {
        return Some(trimmed.to_string());
    }

    let sanitized = sanitize(trimmed);
    let span = balanced_object_span(&sanitized)?;
    let cleaned = remove_trailing_commas(span);

    if serde_json::from_str::<serde_json::Value>(&cleaned).is_ok() {
        return Some(cleaned);
    }

    // One more pass for doubled commas and comma-before-close leftovers.
    let fixed = cleaned.replace(",}", "}").replace(",]", "]").replace(",,", ",");
    if serde_json::from_str::<serde_json::Value>(&fixed).is_ok() {
        return Some(fixed);
    }

    None
}

/// Fall back to reading the reply as plain-text recommendations: bounded,
/// blank lines, heading lines, and broken-JSON debris dropped, bullet
/// markers stripped.
fn text_recommendations(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| !line.contains('{') && !line.contains('}'))
        .map(|line| {
            line.trim_start_matches(['-', '*', '•'])
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .take(MAX_RECOMMENDATIONS)
        .collect()
}

/// Tiered extraction: whole-string JSON, then a balanced object span, then
/// plain-text recommendations. Never errors.
pub fn parse_response(raw: &str) -> Parsed {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Parsed::Empty;
    }

    if let Some(json) = extract_json(trimmed) {
        match serde_json::from_str::<AiPlan>(&json) {
            Ok(plan) => {
                tracing::debug!(
                    weeks = plan.weekly_plan.len(),
                    "Parsed structured plan from model reply"
                );
                return Parsed::Structured(plan);
            }
            Err(e) => {
                tracing::debug!(error = %e, "JSON found but not plan-shaped, degrading to text");
            }
        }
    }

    let recommendations = text_recommendations(trimmed);
    if recommendations.is_empty() {
        Parsed::Empty
    } else {
        Parsed::TextOnly(recommendations)
    }
}
