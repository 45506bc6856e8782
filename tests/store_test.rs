use cram::{baseline_plan, JsonFileStore, PlanInput, PlanRng, PlanStore, SessionType, TopicSpec};

fn scratch_store(name: &str) -> (JsonFileStore, std::path::PathBuf) {
    let root = std::env::temp_dir().join(format!("cram-store-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&root);
    (JsonFileStore::at(root.clone()), root)
}

fn sample_plan() -> cram::GeneratedPlan {
    let today: chrono::NaiveDate = "2026-09-01".parse().unwrap();
    let mut input = PlanInput::new(
        "Linear Algebra",
        today + chrono::Duration::days(21),
        4.0,
        SessionType::Long,
        vec![TopicSpec::from("Eigenvalues"), TopicSpec::from("Rank")],
    );
    input.today = today;
    baseline_plan(&input, &PlanRng::seeded(3)).unwrap()
}

#[test]
fn save_load_roundtrip() {
    let (store, root) = scratch_store("roundtrip");
    let plan = sample_plan();

    assert!(store.load(&plan.plan.id).unwrap().is_none());
    store.save(&plan).unwrap();

    let loaded = store.load(&plan.plan.id).unwrap().unwrap();
    assert_eq!(loaded.plan.id, plan.plan.id);
    assert_eq!(loaded.tasks.len(), plan.tasks.len());
    assert_eq!(loaded.plan.course_name, "Linear Algebra");

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn history_snapshots_append_in_order() {
    let (store, root) = scratch_store("history");
    let plan = sample_plan();

    let mut second = plan.clone();
    second.partial_success = false;
    second.failure_note = Some("refinement failed".into());

    store.append_history(&plan.plan.id, &plan).unwrap();
    store.append_history(&plan.plan.id, &second).unwrap();

    // History lives beside the plan file and accumulates snapshots.
    let history_file = root.join(format!("{}.history.json", plan.plan.id));
    let content = std::fs::read_to_string(history_file).unwrap();
    let history: Vec<cram::GeneratedPlan> = serde_json::from_str(&content).unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[0].partial_success);
    assert!(!history[1].partial_success);

    let _ = std::fs::remove_dir_all(root);
}
