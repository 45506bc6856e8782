use crate::error::CramError;
use crate::pipelines::model::ModelClient;
use crate::pipelines::{parse, prompt, validate};
use crate::plan::store::PlanStore;
use crate::plan::{GeneratedPlan, PlanInput, RefinementRequest, StudyPlan, StudyRules, Topic};
use crate::progress;
use crate::rng::PlanRng;
use crate::rules;
use crate::schedule;
use crate::state::EngineState;
use std::collections::BTreeMap;

/// Pipeline stages, for tracing and reasoning about control flow. Every
/// request walks Start -> BaselineBuilt -> (AiRequested -> AiParsed ->
/// Validated) | AiFailed -> Fallback -> Done; the AI leg is skipped when no
/// model is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    BaselineBuilt,
    AiRequested,
    AiParsed,
    Validated,
    AiFailed,
    Fallback,
    Done,
}

fn trace_stage(operation: &'static str, stage: Stage) {
    tracing::debug!(operation = operation, stage = ?stage, "Pipeline stage");
}

fn build_topics(input: &PlanInput, rng: &PlanRng) -> Vec<Topic> {
    let mut topics: Vec<Topic> = input
        .topics
        .iter()
        .map(|spec| Topic {
            id: rng.next_id("topic"),
            title: spec.title.clone(),
            progress: spec.progress.min(100),
        })
        .collect();

    if let Some(note) = &input.progress_note {
        progress::apply_progress_note(note, &mut topics);
    }
    topics
}

fn build_baseline(input: &PlanInput, rng: &PlanRng) -> (GeneratedPlan, StudyRules) {
    let topics = build_topics(input, rng);
    let resources = rules::classify::build_resources(&input.resources, rng);
    let derived = rules::derive_rules(input, &resources);
    let plan_id = rng.next_id("plan");

    let built = schedule::build_schedule(input, &topics, &resources, &derived, &plan_id, rng);

    let mut plan = StudyPlan {
        id: plan_id,
        course_name: input.course_name.clone(),
        exam_date: input.exam_date,
        weekly_study_time_hours: input.weekly_study_time_hours,
        session_type: input.session_preference,
        learning_style: input.learning_style,
        preferred_materials: input.preferred_materials.clone(),
        topics,
        topic_progress: BTreeMap::new(),
        resources,
        ai_summary: None,
        final_week_strategy: None,
        recommendations: vec![],
    };
    plan.rebuild_topic_progress();

    let generated = GeneratedPlan {
        plan,
        weeks: built.weeks,
        tasks: built.tasks,
        partial_success: true,
        failure_note: None,
    };
    (generated, derived)
}

/// Run the AI leg against an already-built baseline. Returns the merged
/// plan, or the recoverable error that sent us to Fallback.
async fn ai_pass(
    operation: &'static str,
    state: &EngineState,
    model: &ModelClient,
    messages: Vec<crate::pipelines::model::ChatMessage>,
    baseline: &GeneratedPlan,
    rng: &PlanRng,
) -> Result<GeneratedPlan, CramError> {
    trace_stage(operation, Stage::AiRequested);
    let raw = model.chat(state, &messages).await?;

    trace_stage(operation, Stage::AiParsed);
    let parsed = parse::parse_response(&raw);

    let merged = validate::merge(parsed, baseline.clone(), rng);
    trace_stage(operation, Stage::Validated);
    Ok(merged)
}

fn persist(store: &dyn PlanStore, plan: &GeneratedPlan) {
    if let Err(e) = store.save(plan) {
        tracing::warn!(plan_id = %plan.plan.id, error = %e, "Failed to save plan");
    }
}

/// Build a complete study plan from declarative inputs. The deterministic
/// baseline is always computed first; when a model is supplied the AI leg
/// runs on top of it, and any failure there falls back to the baseline with
/// `partial_success = false`. Only `InvalidInput` escapes.
pub async fn generate_study_plan(
    state: &EngineState,
    model: Option<&ModelClient>,
    store: &dyn PlanStore,
    rng: &PlanRng,
    input: &PlanInput,
) -> Result<GeneratedPlan, CramError> {
    trace_stage("generate", Stage::Start);
    input.validate()?;

    let (baseline, derived) = build_baseline(input, rng);
    state.metrics.record_plan_generated();
    trace_stage("generate", Stage::BaselineBuilt);

    let result = match model {
        None => baseline,
        Some(model) => {
            let messages = prompt::generation_messages(
                input,
                &derived,
                &baseline.plan.topics,
                &baseline.plan.resources,
            );
            match ai_pass("generate", state, model, messages, &baseline, rng).await {
                Ok(merged) => merged,
                Err(e) if e.is_recoverable() => {
                    trace_stage("generate", Stage::AiFailed);
                    state.metrics.record_ai_fallback();
                    tracing::warn!(error = %e, "AI generation failed, returning baseline");
                    trace_stage("generate", Stage::Fallback);
                    let mut fallback = baseline;
                    fallback.partial_success = false;
                    fallback.failure_note = Some(e.to_string());
                    fallback
                }
                Err(e) => return Err(e),
            }
        }
    };

    persist(store, &result);
    trace_stage("generate", Stage::Done);
    Ok(result)
}

/// Refine an existing plan from free-text feedback. The prior plan plays
/// the baseline role: a failed or unusable AI pass returns it annotated
/// with `partial_success = false`, with no task lost or duplicated. Every
/// outcome is appended to the plan's refinement history as a new snapshot.
pub async fn refine_plan(
    state: &EngineState,
    model: Option<&ModelClient>,
    store: &dyn PlanStore,
    rng: &PlanRng,
    current: &GeneratedPlan,
    request: &RefinementRequest,
) -> Result<GeneratedPlan, CramError> {
    trace_stage("refine", Stage::Start);
    request.validate()?;
    state.metrics.record_refinement();

    // The prior plan is the always-available baseline for this pass.
    trace_stage("refine", Stage::BaselineBuilt);

    let result = match model {
        None => {
            trace_stage("refine", Stage::Fallback);
            let mut fallback = current.clone();
            fallback.partial_success = false;
            fallback.failure_note = Some("no model available for refinement".to_string());
            fallback
        }
        Some(model) => {
            let messages = prompt::refinement_messages(current, request);
            match ai_pass("refine", state, model, messages, current, rng).await {
                Ok(mut merged) => {
                    merged.partial_success = true;
                    merged.failure_note = None;
                    merged
                }
                Err(e) if e.is_recoverable() => {
                    trace_stage("refine", Stage::AiFailed);
                    state.metrics.record_ai_fallback();
                    tracing::warn!(error = %e, "AI refinement failed, keeping prior plan");
                    trace_stage("refine", Stage::Fallback);
                    let mut fallback = current.clone();
                    fallback.partial_success = false;
                    fallback.failure_note = Some(e.to_string());
                    fallback
                }
                Err(e) => return Err(e),
            }
        }
    };

    if let Err(e) = store.append_history(&result.plan.id, &result) {
        tracing::warn!(plan_id = %result.plan.id, error = %e, "Failed to append refinement history");
    }
    persist(store, &result);
    trace_stage("refine", Stage::Done);
    Ok(result)
}

/// Expose the deterministic baseline directly; used by embedders that want
/// the AI-free schedule without constructing a ModelClient.
pub fn baseline_plan(input: &PlanInput, rng: &PlanRng) -> Result<GeneratedPlan, CramError> {
    input.validate()?;
    Ok(build_baseline(input, rng).0)
}
