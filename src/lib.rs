pub mod breaker;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipelines;
pub mod plan;
pub mod progress;
pub mod rng;
pub mod rules;
pub mod schedule;
pub mod state;

pub use engine::{baseline_plan, generate_study_plan, refine_plan};
pub use error::CramError;
pub use pipelines::model::{CannedChat, ChatMessage, ModelClient, OllamaChat};
pub use plan::store::{JsonFileStore, MemoryStore, PlanStore};
pub use plan::{
    GeneratedPlan, LearningStyle, PlanInput, RefinementRequest, SessionType, StressLevel,
    StudyPlan, Task, TaskType, Topic, TopicSpec, WeekPlan,
};
pub use rng::PlanRng;
pub use state::EngineState;
