use crate::plan::{
    PlanInput, Resource, ResourceKind, SessionType, StudyRules, Task, TaskType, Topic, WeekPlan,
};
use crate::rng::PlanRng;
use chrono::{Duration, NaiveDate};

/// Progress at or above this threshold moves a topic from full study to
/// review-only scheduling.
pub const REVIEW_THRESHOLD: u8 = 70;

/// Post-exam slack allowed for the fixed final review week.
pub const FINAL_WEEK_BUFFER_DAYS: i64 = 7;

// Slot offsets from a week's start: Monday, Wednesday, Friday, Weekend.
const MONDAY: i64 = 0;
const WEDNESDAY: i64 = 2;
const FRIDAY: i64 = 4;
const WEEKEND: i64 = 5;

pub struct BuiltSchedule {
    pub weeks: Vec<WeekPlan>,
    pub tasks: Vec<Task>,
}

struct SlotContext<'a> {
    plan_id: &'a str,
    resources: &'a [Resource],
    rng: &'a PlanRng,
    today: NaiveDate,
    exam_date: NaiveDate,
}

impl<'a> SlotContext<'a> {
    /// All task dates stay inside [today, exam + buffer]; on a short runway
    /// the nominal layout can overshoot, so the tail compresses into the
    /// buffer instead of escaping it. A past exam date is treated as one
    /// day away, matching the clamped day count.
    fn clamp(&self, date: NaiveDate) -> NaiveDate {
        let effective_exam = self.exam_date.max(self.today + Duration::days(1));
        let latest = effective_exam + Duration::days(FINAL_WEEK_BUFFER_DAYS);
        date.max(self.today).min(latest)
    }

    fn suggest_resource(&self, task_type: TaskType) -> Option<String> {
        let preferred = match task_type {
            TaskType::Study => ResourceKind::Learning,
            TaskType::Review => ResourceKind::Review,
            TaskType::Practice => ResourceKind::Practice,
        };
        let matching: Vec<&Resource> = self
            .resources
            .iter()
            .filter(|r| r.classification.kind == preferred)
            .collect();
        if matching.is_empty() {
            let idx = self.rng.pick_index(self.resources.len())?;
            return Some(self.resources[idx].name.clone());
        }
        let idx = self.rng.pick_index(matching.len())?;
        Some(matching[idx].name.clone())
    }

    fn task(
        &self,
        title: String,
        description: Option<String>,
        date: NaiveDate,
        duration_minutes: u32,
        task_type: TaskType,
    ) -> Task {
        Task {
            id: self.rng.next_id("task"),
            plan_id: self.plan_id.to_string(),
            title,
            description,
            date: self.clamp(date),
            duration_minutes,
            resource: self.suggest_resource(task_type),
            completed: false,
            task_type,
        }
    }
}

fn date_range_label(start: NaiveDate) -> String {
    format!("{} to {}", start, start + Duration::days(6))
}

/// Deterministically construct the week-indexed calendar: full-study topics
/// round-robined across study weeks, review-only topics as short standalone
/// tasks in the last study week, and a fixed final review week appended.
/// Byte-for-byte reproducible for a fixed seed.
pub fn build_schedule(
    input: &PlanInput,
    topics: &[Topic],
    resources: &[Resource],
    rules: &StudyRules,
    plan_id: &str,
    rng: &PlanRng,
) -> BuiltSchedule {
    let weeks_until_exam = rules.weeks_until_exam;
    let review_weeks = if weeks_until_exam > 4 { 2 } else { 1 };
    // Floored at 1: with a one-week runway the single week is a study week
    // and the final review block compresses into the date buffer.
    let study_weeks = weeks_until_exam.saturating_sub(review_weeks).max(1) as usize;

    let (full_study, review_only): (Vec<&Topic>, Vec<&Topic>) = topics
        .iter()
        .partition(|t| t.progress < REVIEW_THRESHOLD);

    // Round-robin by index: every full-study topic lands in exactly one bucket.
    let mut buckets: Vec<Vec<&Topic>> = vec![Vec::new(); study_weeks];
    for (i, topic) in full_study.iter().enumerate() {
        buckets[i % study_weeks].push(*topic);
    }

    let duration_minutes = (input.weekly_study_time_hours * 60.0
        / rules.sessions_per_week as f32)
        .floor()
        .max(1.0) as u32;

    let ctx = SlotContext {
        plan_id,
        resources,
        rng,
        today: input.today,
        exam_date: input.exam_date,
    };

    let mut weeks: Vec<WeekPlan> = Vec::new();

    for bucket in buckets.iter().filter(|b| !b.is_empty()) {
        let week_index = weeks.len() as u32 + 1;
        let start = input.today + Duration::days((week_index as i64 - 1) * 7);
        let first = bucket[0];
        let second = bucket.get(1).copied().unwrap_or(first);

        let mut tasks = Vec::new();
        tasks.push(ctx.task(
            format!("Study {}", first.title),
            Some(format!("First pass: work through {} and take notes", first.title)),
            start + Duration::days(MONDAY),
            duration_minutes,
            TaskType::Study,
        ));
        if rules.session_type == SessionType::Short {
            tasks.push(ctx.task(
                format!("Continue {}", second.title),
                None,
                start + Duration::days(WEDNESDAY),
                duration_minutes,
                TaskType::Study,
            ));
        }
        tasks.push(ctx.task(
            format!("Review {}", first.title),
            None,
            start + Duration::days(FRIDAY),
            duration_minutes,
            TaskType::Review,
        ));
        tasks.push(ctx.task(
            format!("Practice {}", second.title),
            Some(format!("Recall and problem work on {}", second.title)),
            start + Duration::days(WEEKEND),
            duration_minutes,
            TaskType::Practice,
        ));
        // Crowded weeks: every topic past the first two still gets its own
        // study slot, cycling through the weekdays.
        for (j, topic) in bucket.iter().enumerate().skip(2) {
            tasks.push(ctx.task(
                format!("Study {}", topic.title),
                None,
                start + Duration::days((j % 6) as i64),
                duration_minutes,
                TaskType::Study,
            ));
        }

        let focus = bucket
            .iter()
            .map(|t| t.title.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        weeks.push(WeekPlan {
            week: week_index,
            date_range: date_range_label(start),
            focus,
            tasks,
        });
    }

    // Topics already near mastery get short standalone reviews in the last
    // study week, one per weekday slot cycling modulo 6.
    if !review_only.is_empty() {
        if weeks.is_empty() {
            weeks.push(WeekPlan {
                week: 1,
                date_range: date_range_label(input.today),
                focus: String::new(),
                tasks: Vec::new(),
            });
        }
        let last = weeks.last_mut().expect("at least one study week");
        let start = input.today + Duration::days((last.week as i64 - 1) * 7);
        for (i, topic) in review_only.iter().enumerate() {
            last.tasks.push(ctx.task(
                format!("Quick review: {}", topic.title),
                None,
                start + Duration::days((i % 6) as i64),
                30,
                TaskType::Review,
            ));
        }
        if last.focus.is_empty() {
            last.focus = review_only
                .iter()
                .map(|t| t.title.as_str())
                .collect::<Vec<_>>()
                .join(", ");
        }
    }

    // Fixed final week, regardless of topic count.
    let final_index = weeks.len() as u32 + 1;
    let final_start = input.today + Duration::days((final_index as i64 - 1) * 7);
    let final_tasks = vec![
        ctx.task(
            "Comprehensive review of all topics".to_string(),
            None,
            final_start + Duration::days(MONDAY),
            60,
            TaskType::Review,
        ),
        ctx.task(
            "Timed practice test".to_string(),
            None,
            final_start + Duration::days(WEDNESDAY),
            60,
            TaskType::Practice,
        ),
        ctx.task(
            "Review weak areas".to_string(),
            None,
            final_start + Duration::days(FRIDAY),
            60,
            TaskType::Review,
        ),
        ctx.task(
            "Full-length practice exam".to_string(),
            None,
            final_start + Duration::days(WEEKEND),
            180,
            TaskType::Practice,
        ),
    ];
    weeks.push(WeekPlan {
        week: final_index,
        date_range: date_range_label(final_start),
        focus: "Final Review".to_string(),
        tasks: final_tasks,
    });

    let tasks: Vec<Task> = weeks.iter().flat_map(|w| w.tasks.iter().cloned()).collect();

    BuiltSchedule { weeks, tasks }
}
