use crate::pipelines::model::ChatMessage;
use crate::plan::{GeneratedPlan, PlanInput, RefinementRequest, Resource, StudyRules, Topic};

pub const SYSTEM_PROMPT: &str = r#"You are a study-plan coach that turns course details and scheduling rules into concrete weekly study calendars.

Rules:
Be short, precise, and practical.
NEVER include commentary outside JSON.
NEVER include markdown.
ALWAYS return valid JSON matching the requested schema exactly.
Dates and week numbers must respect the scheduling rules you are given.
If the inputs seem incomplete, still follow the JSON schema and fill what you can."#;

fn topic_lines(topics: &[Topic]) -> String {
    topics
        .iter()
        .map(|t| format!("- {} ({}% complete)", t.title, t.progress))
        .collect::<Vec<_>>()
        .join("\n")
}

fn resource_lines(resources: &[Resource]) -> String {
    if resources.is_empty() {
        return "- none".to_string();
    }
    resources
        .iter()
        .map(|r| {
            format!(
                "- {} ({:?}, best in {:?} phase)",
                r.name, r.classification.kind, r.classification.phase
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

const PLAN_SCHEMA: &str = r#"{
  "summary": "one-paragraph overview of the plan",
  "weeklyPlan": [
    {
      "week": 1,
      "focus": "topic names for the week",
      "days": {
        "monday": {"title": "...", "description": "...", "durationMinutes": 30, "resource": "optional resource name", "taskType": "study|review|practice"}
      }
    }
  ],
  "finalWeekStrategy": "how to use the final week",
  "studyTips": ["..."]
}"#;

/// Render the initial-generation request: scheduling rules plus course,
/// topic, and resource context, instructing strict JSON output.
pub fn generation_messages(
    input: &PlanInput,
    rules: &StudyRules,
    topics: &[Topic],
    resources: &[Resource],
) -> Vec<ChatMessage> {
    let user = format!(
        r#"Build a weekly study plan and return ONLY valid JSON in this schema:

{schema}

Course: {course}
Exam date: {exam} ({days} days away, {weeks} week(s))
Weekly study time: {hours} hours, {sessions} sessions/week of {lo}-{hi} minutes

Topics:
{topics}

Resources:
{resources}

Scheduling rules, in order:
{directives}

Return ONLY JSON, no markdown, no explanations."#,
        schema = PLAN_SCHEMA,
        course = input.course_name,
        exam = input.exam_date,
        days = rules.days_until_exam,
        weeks = rules.weeks_until_exam,
        hours = input.weekly_study_time_hours,
        sessions = rules.sessions_per_week,
        lo = rules.session_minutes.0,
        hi = rules.session_minutes.1,
        topics = topic_lines(topics),
        resources = resource_lines(resources),
        directives = rules
            .directives
            .iter()
            .map(|d| format!("- {}", d))
            .collect::<Vec<_>>()
            .join("\n"),
    );

    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)]
}

fn week_outline(plan: &GeneratedPlan) -> String {
    plan.weeks
        .iter()
        .map(|w| {
            let tasks = w
                .tasks
                .iter()
                .map(|t| format!("{} ({}min)", t.title, t.duration_minutes))
                .collect::<Vec<_>>()
                .join("; ");
            format!("Week {} [{}] focus: {} -- {}", w.week, w.date_range, w.focus, tasks)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a refinement request against the prior plan's weekly structure.
/// The model is told to make substantial, visible changes and to surface
/// requested techniques in multiple task descriptions.
pub fn refinement_messages(
    current: &GeneratedPlan,
    request: &RefinementRequest,
) -> Vec<ChatMessage> {
    let techniques = if request.preferred_techniques.is_empty() {
        "none requested".to_string()
    } else {
        request.preferred_techniques.join(", ")
    };

    let user = format!(
        r#"Revise the study plan below and return ONLY valid JSON in this schema:

{schema}

Student goal: {goal}
Stress level: {stress:?}
Strong topics (reduce time): {strong}
Weak topics (increase time): {weak}
Requested techniques: {techniques}

Current plan for course "{course}" (exam {exam}):
{outline}

Requirements:
- Make substantial, clearly visible changes; do not echo the current plan back.
- Rebalance time from strong topics toward weak topics.
- Work each requested technique into the descriptions of several tasks, not just one.
- Keep every week inside the existing date ranges.

Return ONLY JSON, no markdown, no explanations."#,
        schema = PLAN_SCHEMA,
        goal = request.goal,
        stress = request.stress_level,
        strong = if request.strong_topics.is_empty() {
            "none".to_string()
        } else {
            request.strong_topics.join(", ")
        },
        weak = if request.weak_topics.is_empty() {
            "none".to_string()
        } else {
            request.weak_topics.join(", ")
        },
        techniques = techniques,
        course = current.plan.course_name,
        exam = current.plan.exam_date,
        outline = week_outline(current),
    );

    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)]
}
