pub mod store;

use crate::error::CramError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Short,
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningStyle {
    Visual,
    Auditory,
    Reading,
    Kinesthetic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StressLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Study,
    Review,
    Practice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Learning,
    Practice,
    Review,
    Reference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourcePhase {
    Early,
    Mid,
    Late,
}

/// Derived usage classification for a resource. Always present; recomputed
/// from the resource name whenever resources change, never user-supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub kind: ResourceKind,
    pub phase: ResourcePhase,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub title: String,
    /// Completion progress, 0-100
    pub progress: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub name: String,
    pub classification: Classification,
}

/// Scheduling directives plus derived quantities. Immutable once derived;
/// serialized into the model prompt, never re-parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyRules {
    pub directives: Vec<String>,
    /// Always >= 1, even for exam dates in the past
    pub days_until_exam: u32,
    /// Always >= 1
    pub weeks_until_exam: u32,
    pub session_type: SessionType,
    /// Descriptive session-length range in minutes, not a scheduling input
    pub session_minutes: (u32, u32),
    pub sessions_per_week: u32,
    pub study_days_per_week: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub plan_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub date: NaiveDate,
    pub duration_minutes: u32,
    #[serde(default)]
    pub resource: Option<String>,
    pub completed: bool,
    pub task_type: TaskType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekPlan {
    /// 1-based, contiguous
    pub week: u32,
    pub date_range: String,
    /// Topic names or "Final Review"
    pub focus: String,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyPlan {
    pub id: String,
    pub course_name: String,
    pub exam_date: NaiveDate,
    pub weekly_study_time_hours: f32,
    pub session_type: SessionType,
    #[serde(default)]
    pub learning_style: Option<LearningStyle>,
    #[serde(default)]
    pub preferred_materials: Vec<String>,
    pub topics: Vec<Topic>,
    /// Keys are exactly the topic titles: every title present, no orphans
    pub topic_progress: BTreeMap<String, u8>,
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub ai_summary: Option<String>,
    #[serde(default)]
    pub final_week_strategy: Option<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl StudyPlan {
    /// Rebuild the topic->progress map from the topic list, preserving the
    /// invariant that its keys are exactly the topic titles.
    pub fn rebuild_topic_progress(&mut self) {
        self.topic_progress = self
            .topics
            .iter()
            .map(|t| (t.title.clone(), t.progress))
            .collect();
    }

    pub fn topic_progress_consistent(&self) -> bool {
        self.topics.len() == self.topic_progress.len()
            && self
                .topics
                .iter()
                .all(|t| self.topic_progress.contains_key(&t.title))
    }
}

/// A study plan together with its weeks and flat task list; the value
/// returned to callers by both generate and refine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedPlan {
    pub plan: StudyPlan,
    pub weeks: Vec<WeekPlan>,
    pub tasks: Vec<Task>,
    /// False when the AI path failed and the deterministic result was used
    pub partial_success: bool,
    #[serde(default)]
    pub failure_note: Option<String>,
}

/// Free-text feedback driving a refinement pass. Transient; not persisted
/// independently of its resulting plan snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementRequest {
    pub goal: String,
    #[serde(default)]
    pub strong_topics: Vec<String>,
    #[serde(default)]
    pub weak_topics: Vec<String>,
    pub stress_level: StressLevel,
    #[serde(default)]
    pub preferred_techniques: Vec<String>,
}

impl RefinementRequest {
    /// A topic may be flagged strong or weak, never both.
    pub fn validate(&self) -> Result<(), CramError> {
        for topic in &self.strong_topics {
            if self.weak_topics.contains(topic) {
                return Err(CramError::InvalidInput(format!(
                    "topic '{}' flagged both strong and weak",
                    topic
                )));
            }
        }
        Ok(())
    }
}

/// One topic as supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicSpec {
    pub title: String,
    #[serde(default)]
    pub progress: u8,
}

impl From<&str> for TopicSpec {
    fn from(title: &str) -> Self {
        TopicSpec {
            title: title.to_string(),
            progress: 0,
        }
    }
}

/// Declarative inputs for plan generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanInput {
    pub course_name: String,
    pub exam_date: NaiveDate,
    /// Reference date for all derived quantities; injectable for
    /// reproducibility
    pub today: NaiveDate,
    pub weekly_study_time_hours: f32,
    pub session_preference: SessionType,
    #[serde(default)]
    pub learning_style: Option<LearningStyle>,
    #[serde(default)]
    pub preferred_materials: Vec<String>,
    pub topics: Vec<TopicSpec>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub progress_note: Option<String>,
}

impl PlanInput {
    pub fn new(
        course_name: &str,
        exam_date: NaiveDate,
        weekly_study_time_hours: f32,
        session_preference: SessionType,
        topics: Vec<TopicSpec>,
    ) -> Self {
        PlanInput {
            course_name: course_name.to_string(),
            exam_date,
            today: chrono::Utc::now().date_naive(),
            weekly_study_time_hours,
            session_preference,
            learning_style: None,
            preferred_materials: Vec::new(),
            topics,
            resources: Vec::new(),
            progress_note: None,
        }
    }

    /// Parse an ISO-8601 calendar date, rejecting anything unparseable
    /// before it can reach rule derivation.
    pub fn parse_exam_date(raw: &str) -> Result<NaiveDate, CramError> {
        raw.parse::<NaiveDate>()
            .map_err(|e| CramError::InvalidInput(format!("bad exam date '{}': {}", raw, e)))
    }

    /// Reject structurally unusable inputs. Everything that passes here has
    /// safe defaults downstream.
    pub fn validate(&self) -> Result<(), CramError> {
        if self.topics.is_empty() {
            return Err(CramError::InvalidInput("topic list is empty".into()));
        }
        if self.weekly_study_time_hours <= 0.0 {
            return Err(CramError::InvalidInput(format!(
                "weekly study time must be positive, got {}",
                self.weekly_study_time_hours
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn validate_rejects_empty_topics() {
        let input = PlanInput::new("Bio", date("2026-10-01"), 5.0, SessionType::Short, vec![]);
        assert!(matches!(input.validate(), Err(CramError::InvalidInput(_))));
    }

    #[test]
    fn validate_rejects_nonpositive_weekly_time() {
        let input = PlanInput::new(
            "Bio",
            date("2026-10-01"),
            0.0,
            SessionType::Short,
            vec!["Cells".into()],
        );
        assert!(matches!(input.validate(), Err(CramError::InvalidInput(_))));
    }

    #[test]
    fn parse_exam_date_rejects_garbage() {
        assert!(PlanInput::parse_exam_date("not-a-date").is_err());
        assert!(PlanInput::parse_exam_date("2026-09-30").is_ok());
    }

    #[test]
    fn strong_and_weak_topics_are_exclusive() {
        let req = RefinementRequest {
            goal: "focus harder".into(),
            strong_topics: vec!["A".into()],
            weak_topics: vec!["A".into()],
            stress_level: StressLevel::Medium,
            preferred_techniques: vec![],
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn rebuild_topic_progress_keeps_keys_exact() {
        let mut plan = StudyPlan {
            id: "plan_1".into(),
            course_name: "Bio".into(),
            exam_date: date("2026-10-01"),
            weekly_study_time_hours: 5.0,
            session_type: SessionType::Short,
            learning_style: None,
            preferred_materials: vec![],
            topics: vec![
                Topic {
                    id: "t1".into(),
                    title: "Cells".into(),
                    progress: 40,
                },
                Topic {
                    id: "t2".into(),
                    title: "Genetics".into(),
                    progress: 0,
                },
            ],
            topic_progress: BTreeMap::from([("Stale".into(), 99)]),
            resources: vec![],
            ai_summary: None,
            final_week_strategy: None,
            recommendations: vec![],
        };
        plan.rebuild_topic_progress();
        assert!(plan.topic_progress_consistent());
        assert_eq!(plan.topic_progress.get("Cells"), Some(&40));
        assert!(!plan.topic_progress.contains_key("Stale"));
    }
}
