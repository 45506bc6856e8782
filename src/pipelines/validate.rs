use crate::pipelines::parse::{AiPlan, AiTask, Parsed};
use crate::plan::{GeneratedPlan, Task, TaskType, WeekPlan};
use crate::rng::PlanRng;
use chrono::{Duration, NaiveDate};

use crate::schedule::FINAL_WEEK_BUFFER_DAYS;

const DEFAULT_DURATION_MINUTES: u32 = 60;
const DEFAULT_TASK_TITLE: &str = "Study session";

fn day_offset(day: &str) -> i64 {
    match day.to_lowercase().as_str() {
        "monday" => 0,
        "tuesday" => 1,
        "wednesday" => 2,
        "thursday" => 3,
        "friday" => 4,
        "saturday" => 5,
        "sunday" => 6,
        _ => 0,
    }
}

fn parse_task_type(raw: Option<&str>) -> Option<TaskType> {
    match raw?.to_lowercase().as_str() {
        "study" => Some(TaskType::Study),
        "review" => Some(TaskType::Review),
        "practice" => Some(TaskType::Practice),
        _ => None,
    }
}

/// Final repair pass: whatever happened upstream, every task leaves with a
/// non-empty title, a positive duration, and the topic-progress map keyed
/// exactly by the topic titles. Invariant violations die here, inside the
/// merger, never past it.
fn enforce_invariants(result: &mut GeneratedPlan) {
    result.plan.rebuild_topic_progress();

    let fix = |task: &mut Task| {
        if task.title.trim().is_empty() {
            task.title = DEFAULT_TASK_TITLE.to_string();
        }
        if task.duration_minutes == 0 {
            task.duration_minutes = DEFAULT_DURATION_MINUTES;
        }
    };
    for task in &mut result.tasks {
        fix(task);
    }
    for week in &mut result.weeks {
        for task in &mut week.tasks {
            fix(task);
        }
    }
}

fn merge_task(
    ai_task: &AiTask,
    positional: Option<&Task>,
    plan_id: &str,
    date: NaiveDate,
    rng: &PlanRng,
) -> Task {
    Task {
        id: positional
            .map(|t| t.id.clone())
            .unwrap_or_else(|| rng.next_id("task")),
        plan_id: plan_id.to_string(),
        title: ai_task
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| positional.map(|t| t.title.clone()))
            .unwrap_or_else(|| DEFAULT_TASK_TITLE.to_string()),
        description: ai_task
            .description
            .clone()
            .or_else(|| positional.and_then(|t| t.description.clone())),
        date,
        duration_minutes: ai_task
            .duration_minutes
            .filter(|d| *d > 0)
            .or_else(|| positional.map(|t| t.duration_minutes))
            .unwrap_or(DEFAULT_DURATION_MINUTES),
        resource: ai_task
            .resource
            .clone()
            .or_else(|| positional.and_then(|t| t.resource.clone())),
        completed: false,
        task_type: parse_task_type(ai_task.task_type.as_deref())
            .or_else(|| positional.map(|t| t.task_type))
            .unwrap_or(TaskType::Study),
    }
}

fn merge_structured(ai: AiPlan, mut result: GeneratedPlan, rng: &PlanRng) -> GeneratedPlan {
    // Candidate fields win only when present; missing ones keep the
    // baseline's values.
    if let Some(summary) = ai.summary {
        result.plan.ai_summary = Some(summary);
    }
    if let Some(strategy) = ai.final_week_strategy {
        result.plan.final_week_strategy = Some(strategy);
    }
    if !ai.study_tips.is_empty() {
        result.plan.recommendations = ai.study_tips;
    }

    if !ai.weekly_plan.is_empty() {
        // Week dates anchor on the baseline's first task day; the AI only
        // chooses day names, never raw dates.
        let anchor = result
            .tasks
            .iter()
            .map(|t| t.date)
            .min()
            .unwrap_or(result.plan.exam_date);
        let latest = (result.plan.exam_date + Duration::days(FINAL_WEEK_BUFFER_DAYS)).max(anchor);

        let mut weeks: Vec<WeekPlan> = Vec::new();
        let mut tasks: Vec<Task> = Vec::new();
        let mut positional_index = 0usize;

        for (i, ai_week) in ai.weekly_plan.iter().enumerate() {
            let week_no = i as u32 + 1;
            let start = (anchor + Duration::days(7 * i as i64)).min(latest);
            let baseline_week = result.weeks.get(i);

            let mut week_tasks = Vec::new();
            for (day, ai_task) in &ai_week.days {
                let date = (start + Duration::days(day_offset(day)))
                    .max(anchor)
                    .min(latest);
                let positional = result.tasks.get(positional_index);
                week_tasks.push(merge_task(ai_task, positional, &result.plan.id, date, rng));
                positional_index += 1;
            }

            let focus = ai_week
                .focus
                .clone()
                .filter(|f| !f.trim().is_empty())
                .or_else(|| baseline_week.map(|w| w.focus.clone()))
                .unwrap_or_else(|| format!("Week {}", week_no));
            let date_range = baseline_week
                .map(|w| w.date_range.clone())
                .unwrap_or_else(|| format!("{} to {}", start, start + Duration::days(6)));

            tasks.extend(week_tasks.iter().cloned());
            weeks.push(WeekPlan {
                week: week_no,
                date_range,
                focus,
                tasks: week_tasks,
            });
        }

        result.weeks = weeks;
        result.tasks = tasks;
    }

    result
}

/// Check a candidate plan fragment against the required-field invariants,
/// repairing from the deterministic baseline wherever the candidate is
/// missing or malformed. Total: any parser outcome paired with any baseline
/// yields a structurally complete plan.
pub fn merge(candidate: Parsed, baseline: GeneratedPlan, rng: &PlanRng) -> GeneratedPlan {
    let mut result = match candidate {
        Parsed::Empty => {
            tracing::debug!("No usable model output, keeping baseline verbatim");
            baseline
        }
        Parsed::TextOnly(recommendations) => {
            tracing::debug!(
                count = recommendations.len(),
                "Model output degraded to text recommendations"
            );
            let mut result = baseline;
            result.plan.recommendations = recommendations;
            result
        }
        Parsed::Structured(ai) => merge_structured(ai, baseline, rng),
    };

    enforce_invariants(&mut result);
    result
}

#[cfg(test)]
pub mod tests_support {
    use crate::plan::{
        GeneratedPlan, PlanInput, SessionType, StudyPlan, Topic, TopicSpec,
    };
    use crate::rng::PlanRng;
    use crate::rules;
    use crate::schedule;
    use std::collections::BTreeMap;

    /// A small but fully populated baseline plan for merger tests.
    pub fn tiny_plan() -> GeneratedPlan {
        let mut input = PlanInput::new(
            "AP Psych",
            "2026-09-29".parse().unwrap(),
            6.0,
            SessionType::Short,
            vec![TopicSpec::from("Memory"), TopicSpec::from("Cognition")],
        );
        input.today = "2026-09-01".parse().unwrap();

        let rng = PlanRng::seeded(11);
        let topics: Vec<Topic> = input
            .topics
            .iter()
            .map(|t| Topic {
                id: rng.next_id("topic"),
                title: t.title.clone(),
                progress: t.progress,
            })
            .collect();
        let resources = rules::classify::build_resources(&input.resources, &rng);
        let derived = rules::derive_rules(&input, &resources);
        let plan_id = rng.next_id("plan");
        let built = schedule::build_schedule(&input, &topics, &resources, &derived, &plan_id, &rng);

        let mut plan = StudyPlan {
            id: plan_id,
            course_name: input.course_name.clone(),
            exam_date: input.exam_date,
            weekly_study_time_hours: input.weekly_study_time_hours,
            session_type: input.session_preference,
            learning_style: None,
            preferred_materials: vec![],
            topics,
            topic_progress: BTreeMap::new(),
            resources,
            ai_summary: None,
            final_week_strategy: None,
            recommendations: vec![],
        };
        plan.rebuild_topic_progress();

        GeneratedPlan {
            plan,
            weeks: built.weeks,
            tasks: built.tasks,
            partial_success: true,
            failure_note: None,
        }
    }
}
