use chrono::Duration;
use cram::{
    baseline_plan, generate_study_plan, refine_plan, CannedChat, CramError, EngineState,
    MemoryStore, ModelClient, PlanInput, PlanRng, PlanStore, RefinementRequest, SessionType,
    StressLevel, TopicSpec,
};

fn sample_input() -> PlanInput {
    let today: chrono::NaiveDate = "2026-09-01".parse().unwrap();
    let mut input = PlanInput::new(
        "AP Psych",
        today + Duration::days(28),
        6.0,
        SessionType::Short,
        vec![
            TopicSpec::from("Memory"),
            TopicSpec::from("Cognition"),
            TopicSpec::from("Development"),
        ],
    );
    input.today = today;
    input.resources = vec!["Textbook".to_string(), "Practice problems".to_string()];
    input
}

fn refinement() -> RefinementRequest {
    RefinementRequest {
        goal: "more practice problems before the exam".into(),
        strong_topics: vec!["Memory".into()],
        weak_topics: vec!["Cognition".into()],
        stress_level: StressLevel::Medium,
        preferred_techniques: vec!["active recall".into()],
    }
}

#[tokio::test]
async fn generate_without_model_returns_deterministic_plan() {
    let state = EngineState::new();
    let store = MemoryStore::new();
    let input = sample_input();

    let generated = generate_study_plan(&state, None, &store, &PlanRng::seeded(42), &input)
        .await
        .unwrap();

    assert!(generated.partial_success);
    assert!(generated.failure_note.is_none());
    assert!(!generated.tasks.is_empty());

    // The plan was saved through the injected store.
    let loaded = store.load(&generated.plan.id).unwrap().unwrap();
    assert_eq!(loaded.tasks.len(), generated.tasks.len());

    // And matches the pure baseline for the same seed.
    let pure = baseline_plan(&input, &PlanRng::seeded(42)).unwrap();
    assert_eq!(
        serde_json::to_string(&pure).unwrap(),
        serde_json::to_string(&generated).unwrap()
    );
}

#[tokio::test]
async fn generate_with_dead_model_falls_back_to_baseline() {
    let state = EngineState::new();
    let store = MemoryStore::new();
    let input = sample_input();
    let model = ModelClient::Canned(CannedChat::new(vec![
        Err("HTTP 500 Internal Server Error".into()),
        Err("HTTP 500 Internal Server Error".into()),
        Err("HTTP 500 Internal Server Error".into()),
    ]));

    let generated = generate_study_plan(&state, Some(&model), &store, &PlanRng::seeded(42), &input)
        .await
        .unwrap();

    assert!(!generated.partial_success);
    let note = generated.failure_note.clone().unwrap();
    assert!(note.contains("model_call"), "note should name the failing stage: {}", note);

    // Task-for-task identical to the deterministic baseline.
    let pure = baseline_plan(&input, &PlanRng::seeded(42)).unwrap();
    assert_eq!(generated.tasks.len(), pure.tasks.len());
    for (a, b) in generated.tasks.iter().zip(pure.tasks.iter()) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.title, b.title);
        assert_eq!(a.date, b.date);
    }
}

#[tokio::test]
async fn refine_with_failing_service_keeps_prior_plan_intact() {
    let state = EngineState::new();
    let store = MemoryStore::new();
    let input = sample_input();
    let prior = baseline_plan(&input, &PlanRng::seeded(7)).unwrap();
    let model = ModelClient::Canned(CannedChat::new(vec![Err("HTTP 500".into())]));

    let refined = refine_plan(
        &state,
        Some(&model),
        &store,
        &PlanRng::seeded(8),
        &prior,
        &refinement(),
    )
    .await
    .unwrap();

    assert!(!refined.partial_success);
    assert!(refined.failure_note.is_some());

    // No task lost or duplicated.
    assert_eq!(refined.tasks.len(), prior.tasks.len());
    let mut prior_ids: Vec<&str> = prior.tasks.iter().map(|t| t.id.as_str()).collect();
    let mut refined_ids: Vec<&str> = refined.tasks.iter().map(|t| t.id.as_str()).collect();
    prior_ids.sort_unstable();
    refined_ids.sort_unstable();
    assert_eq!(prior_ids, refined_ids);

    // The failed refinement still lands in the history as a snapshot.
    assert_eq!(store.history_len(&prior.plan.id), 1);
}

#[tokio::test]
async fn refine_with_malformed_json_returns_prior_plan_verbatim() {
    let state = EngineState::new();
    let store = MemoryStore::new();
    let input = sample_input();
    let prior = baseline_plan(&input, &PlanRng::seeded(7)).unwrap();
    let model = ModelClient::Canned(CannedChat::new(vec![Ok("Sure! {not valid json".into())]));

    let refined = refine_plan(
        &state,
        Some(&model),
        &store,
        &PlanRng::seeded(8),
        &prior,
        &refinement(),
    )
    .await
    .unwrap();

    // Parser yields Empty; the merger hands the prior plan back untouched.
    assert_eq!(refined.tasks.len(), prior.tasks.len());
    assert_eq!(refined.weeks.len(), prior.weeks.len());
    for (a, b) in refined.tasks.iter().zip(prior.tasks.iter()) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.title, b.title);
    }
}

#[tokio::test]
async fn refine_with_structured_reply_merges_changes() {
    let state = EngineState::new();
    let store = MemoryStore::new();
    let input = sample_input();
    let prior = baseline_plan(&input, &PlanRng::seeded(7)).unwrap();

    let reply = r#"Here you go:
```json
{
  "summary": "Rebalanced toward Cognition with active recall blocks",
  "weeklyPlan": [
    {"week": 1, "focus": "Cognition", "days": {
      "monday": {"title": "Active recall: Cognition", "durationMinutes": 45, "taskType": "study"},
      "friday": {"title": "Practice set: Cognition", "durationMinutes": 40, "taskType": "practice"}
    }},
    {"week": 2, "focus": "Memory", "days": {
      "tuesday": {"title": "Light review: Memory", "durationMinutes": 25, "taskType": "review"}
    }}
  ],
  "finalWeekStrategy": "Two timed practice exams",
  "studyTips": ["Use active recall daily"]
}
```"#;
    let model = ModelClient::Canned(CannedChat::new(vec![Ok(reply.into())]));

    let refined = refine_plan(
        &state,
        Some(&model),
        &store,
        &PlanRng::seeded(8),
        &prior,
        &refinement(),
    )
    .await
    .unwrap();

    assert!(refined.partial_success);
    assert_eq!(
        refined.plan.ai_summary.as_deref(),
        Some("Rebalanced toward Cognition with active recall blocks")
    );
    assert_eq!(
        refined.plan.final_week_strategy.as_deref(),
        Some("Two timed practice exams")
    );
    assert_eq!(refined.weeks.len(), 2);
    assert_eq!(refined.tasks.len(), 3);
    assert!(refined
        .tasks
        .iter()
        .any(|t| t.title == "Active recall: Cognition"));
    assert!(refined.plan.topic_progress_consistent());
    assert_eq!(store.history_len(&prior.plan.id), 1);
}

#[tokio::test]
async fn invalid_input_is_the_only_escaping_error() {
    let state = EngineState::new();
    let store = MemoryStore::new();
    let mut input = sample_input();
    input.topics.clear();

    let err = generate_study_plan(&state, None, &store, &PlanRng::seeded(1), &input)
        .await
        .unwrap_err();
    assert!(matches!(err, CramError::InvalidInput(_)));

    let mut input = sample_input();
    input.weekly_study_time_hours = -2.0;
    let err = generate_study_plan(&state, None, &store, &PlanRng::seeded(1), &input)
        .await
        .unwrap_err();
    assert!(matches!(err, CramError::InvalidInput(_)));
}

#[tokio::test]
async fn conflicting_refinement_flags_are_rejected() {
    let state = EngineState::new();
    let store = MemoryStore::new();
    let input = sample_input();
    let prior = baseline_plan(&input, &PlanRng::seeded(7)).unwrap();

    let mut request = refinement();
    request.weak_topics.push("Memory".into());

    let err = refine_plan(&state, None, &store, &PlanRng::seeded(8), &prior, &request)
        .await
        .unwrap_err();
    assert!(matches!(err, CramError::InvalidInput(_)));
}
