use crate::plan::Topic;

struct PhraseRule {
    phrases: &'static [&'static str],
    progress: u8,
}

// Ordered: first matching rule wins. Minimal phrases are tested before
// partial ones so "barely started" reads as minimal, not partial.
const PHRASE_RULES: &[PhraseRule] = &[
    PhraseRule {
        phrases: &["completely", "finished", "mastered"],
        progress: 100,
    },
    PhraseRule {
        phrases: &["mostly", "almost done", "very comfortable"],
        progress: 80,
    },
    PhraseRule {
        phrases: &["barely", "just introduced"],
        progress: 10,
    },
    PhraseRule {
        phrases: &["partially", "started", "somewhat"],
        progress: 40,
    },
];

// Phrases that talk about the plan as a whole rather than a single topic.
const WHOLE_PLAN_PHRASES: &[&str] = &["all topics", "final review", "practice exam"];
const SETBACK_SIGNALS: &[&str] = &["behind", "struggl", "not "];

const WHOLE_PLAN_DELTA: i16 = 10;

fn clamp_progress(value: i16) -> u8 {
    value.clamp(0, 100) as u8
}

/// First "NN%" found after `from` in `text`, clamped to 100.
fn percent_after(text: &str, from: usize) -> Option<u8> {
    let tail = &text[from..];
    let mut digits = String::new();
    for ch in tail.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
        } else if ch == '%' && !digits.is_empty() {
            let value: u32 = digits.parse().ok()?;
            return Some(value.min(100) as u8);
        } else {
            digits.clear();
        }
    }
    None
}

/// Split a sentence into clauses so a phrase only affects the topic
/// mentioned alongside it, not every topic in the sentence.
fn clauses(sentence: &str) -> Vec<String> {
    sentence
        .split([',', ';'])
        .flat_map(|part| part.split(" and "))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

fn progress_for_topic(note_lower: &str, title_lower: &str) -> Option<u8> {
    let sentence = note_lower
        .split(['.', '!', '?'])
        .find(|s| s.contains(title_lower))?;

    // An explicit "NN%" after the mention wins over any phrase, and may sit
    // in a later clause of the same sentence.
    let mention_end = sentence.find(title_lower)? + title_lower.len();
    if let Some(pct) = percent_after(sentence, mention_end) {
        return Some(pct);
    }

    // Clause splitting can cut through multi-word titles; fall back to the
    // whole sentence in that case.
    let fragment = clauses(sentence)
        .into_iter()
        .find(|c| c.contains(title_lower))
        .unwrap_or_else(|| sentence.trim().to_string());

    for rule in PHRASE_RULES {
        if rule.phrases.iter().any(|p| fragment.contains(p)) {
            return Some(rule.progress);
        }
    }
    None
}

/// Map a free-text progress note onto per-topic completion percentages.
/// Whole-plan phrases shift every topic by a uniform +-10 instead of
/// matching per topic. Output never leaves [0, 100]; topics the note does
/// not mention are left unchanged.
pub fn apply_progress_note(note: &str, topics: &mut [Topic]) {
    let note_lower = note.to_lowercase();

    if WHOLE_PLAN_PHRASES.iter().any(|p| note_lower.contains(p)) {
        let delta = if SETBACK_SIGNALS.iter().any(|s| note_lower.contains(s)) {
            -WHOLE_PLAN_DELTA
        } else {
            WHOLE_PLAN_DELTA
        };
        for topic in topics.iter_mut() {
            topic.progress = clamp_progress(topic.progress as i16 + delta);
        }
        tracing::debug!(delta = delta, "Whole-plan progress note applied");
        return;
    }

    for topic in topics.iter_mut() {
        let title_lower = topic.title.to_lowercase();
        if let Some(progress) = progress_for_topic(&note_lower, &title_lower) {
            tracing::debug!(topic = %topic.title, progress = progress, "Progress note matched");
            topic.progress = progress;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topics(titles: &[&str]) -> Vec<Topic> {
        titles
            .iter()
            .enumerate()
            .map(|(i, t)| Topic {
                id: format!("t{}", i),
                title: t.to_string(),
                progress: 50,
            })
            .collect()
    }

    #[test]
    fn mastered_and_barely_started() {
        let mut topics = topics(&["Topic A", "Topic B"]);
        apply_progress_note(
            "I've mastered Topic A and am barely started on Topic B",
            &mut topics,
        );
        assert_eq!(topics[0].progress, 100);
        assert_eq!(topics[1].progress, 10);
    }

    #[test]
    fn explicit_percent_beats_phrases() {
        let mut topics = topics(&["Genetics"]);
        apply_progress_note("Genetics is mostly done, around 65% through", &mut topics);
        assert_eq!(topics[0].progress, 65);
    }

    #[test]
    fn percent_is_clamped_to_100() {
        let mut topics = topics(&["Genetics"]);
        apply_progress_note("Genetics 250% done", &mut topics);
        assert_eq!(topics[0].progress, 100);
    }

    #[test]
    fn unmentioned_topics_are_untouched() {
        let mut topics = topics(&["Memory", "Cognition"]);
        apply_progress_note("I finished Memory", &mut topics);
        assert_eq!(topics[0].progress, 100);
        assert_eq!(topics[1].progress, 50);
    }

    #[test]
    fn whole_plan_phrase_applies_uniform_delta() {
        let mut topics = topics(&["A", "B"]);
        apply_progress_note("Went over all topics this weekend", &mut topics);
        assert_eq!(topics[0].progress, 60);
        assert_eq!(topics[1].progress, 60);
    }

    #[test]
    fn whole_plan_setback_applies_negative_delta() {
        let mut topics = topics(&["A", "B"]);
        apply_progress_note("Struggling to get through all topics", &mut topics);
        assert_eq!(topics[0].progress, 40);
        assert_eq!(topics[1].progress, 40);
    }

    #[test]
    fn progress_never_leaves_bounds() {
        let mut low = topics(&["A"]);
        low[0].progress = 3;
        apply_progress_note("Behind on all topics", &mut low);
        assert_eq!(low[0].progress, 0);

        let mut high = topics(&["A"]);
        high[0].progress = 97;
        apply_progress_note("Reviewed all topics again", &mut high);
        assert_eq!(high[0].progress, 100);
    }
}
