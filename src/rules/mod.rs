pub mod classify;

use crate::plan::{LearningStyle, PlanInput, Resource, SessionType, StudyRules};
use chrono::NaiveDate;

/// Days until the exam, ceiling-divided at day granularity and clamped so
/// it is never below 1, including for exam dates in the past.
pub fn days_until_exam(today: NaiveDate, exam_date: NaiveDate) -> u32 {
    let days = (exam_date - today).num_days();
    days.max(1) as u32
}

pub fn weeks_until_exam(days: u32) -> u32 {
    days.div_ceil(7).max(1)
}

fn unit_minutes(session_type: SessionType) -> u32 {
    match session_type {
        SessionType::Short => 30,
        SessionType::Long => 75,
    }
}

fn session_minutes(session_type: SessionType) -> (u32, u32) {
    match session_type {
        SessionType::Short => (25, 40),
        SessionType::Long => (60, 90),
    }
}

pub fn sessions_per_week(weekly_hours: f32, session_type: SessionType) -> u32 {
    let per_week = (weekly_hours * 60.0 / unit_minutes(session_type) as f32).floor() as u32;
    per_week.max(1)
}

fn style_directive(style: LearningStyle) -> &'static str {
    match style {
        LearningStyle::Visual => {
            "Favor diagrams, mind maps, and color-coded notes when studying each topic."
        }
        LearningStyle::Auditory => {
            "Favor recorded lectures and podcasts, and explain each topic aloud from memory."
        }
        LearningStyle::Reading => {
            "Favor written summaries: condense each topic into one page of annotated notes."
        }
        LearningStyle::Kinesthetic => {
            "Favor hands-on work: walk through worked examples and re-derive results yourself."
        }
    }
}

/// Turn raw plan inputs into the ordered directive list plus derived
/// quantities. Pure and idempotent: identical inputs yield byte-identical
/// rules. Inputs are assumed validated; every optional field has a safe
/// default here.
pub fn derive_rules(input: &PlanInput, resources: &[Resource]) -> StudyRules {
    let days = days_until_exam(input.today, input.exam_date);
    let weeks = weeks_until_exam(days);
    let session_type = input.session_preference;
    let minutes = session_minutes(session_type);
    let per_week = sessions_per_week(input.weekly_study_time_hours, session_type);
    let study_days = per_week.min(6);

    let mut directives = Vec::new();

    if weeks > 1 {
        directives
            .push("Reserve the final week before the exam for review and practice exams.".into());
    }
    if weeks > 4 {
        directives.push("Complete at least 2 full-length mock exams before exam day.".into());
    } else if weeks > 1 {
        directives.push("Complete at least 1 full-length mock exam before exam day.".into());
    }
    directives.push(
        "Revisit each topic with spaced repetition: again after 1 day, 3 days, and 1 week.".into(),
    );

    directives.push(format!(
        "Plan {} sessions of {}-{} minutes across {} study days each week.",
        per_week, minutes.0, minutes.1, study_days
    ));

    if let Some(style) = input.learning_style {
        directives.push(style_directive(style).to_string());
    }

    for resource in resources {
        directives.push(format!(
            "Use {} for {:?} work during the {:?} phase: {}.",
            resource.name,
            resource.classification.kind,
            resource.classification.phase,
            resource.classification.description
        ));
    }

    if input.progress_note.is_some() {
        directives
            .push("A progress note is on file; weight sessions toward what is unfinished.".into());
    }

    StudyRules {
        directives,
        days_until_exam: days,
        weeks_until_exam: weeks,
        session_type,
        session_minutes: minutes,
        sessions_per_week: per_week,
        study_days_per_week: study_days,
    }
}
