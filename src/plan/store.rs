use crate::error::CramError;
use crate::plan::GeneratedPlan;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;

/// Persistence boundary for plans. The engine never touches storage
/// directly; an implementation is injected into the orchestrator.
/// Duplicate concurrent refinements each append their own snapshot; the
/// caller is responsible for serializing writes beyond that.
pub trait PlanStore: Send + Sync {
    fn load(&self, plan_id: &str) -> Result<Option<GeneratedPlan>, CramError>;
    fn save(&self, plan: &GeneratedPlan) -> Result<(), CramError>;
    /// Append a refinement snapshot to the plan's history.
    fn append_history(&self, plan_id: &str, snapshot: &GeneratedPlan) -> Result<(), CramError>;
}

fn plans_dir() -> PathBuf {
    // Use platform-specific app data directory
    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let mut dir = PathBuf::from(home);
            dir.push("Library/Application Support/com.cram.engine");
            dir.push("plans");
            return dir;
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            let mut dir = PathBuf::from(appdata);
            dir.push("com.cram.engine");
            dir.push("plans");
            return dir;
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let mut dir = PathBuf::from(home);
            dir.push(".local/share/com.cram.engine");
            dir.push("plans");
            return dir;
        }
    }

    // Fallback
    PathBuf::from("data/plans")
}

/// JSON-file store: one file per plan, one history file per plan with
/// snapshots appended in order.
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new() -> Self {
        JsonFileStore { root: plans_dir() }
    }

    pub fn at(root: PathBuf) -> Self {
        JsonFileStore { root }
    }

    fn plan_path(&self, plan_id: &str) -> PathBuf {
        self.root.join(format!("{}.json", plan_id))
    }

    fn history_path(&self, plan_id: &str) -> PathBuf {
        self.root.join(format!("{}.history.json", plan_id))
    }
}

impl Default for JsonFileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanStore for JsonFileStore {
    fn load(&self, plan_id: &str) -> Result<Option<GeneratedPlan>, CramError> {
        let path = self.plan_path(plan_id);
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let plan = serde_json::from_str(&content)?;
                Ok(Some(plan))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, plan: &GeneratedPlan) -> Result<(), CramError> {
        std::fs::create_dir_all(&self.root)?;
        let path = self.plan_path(&plan.plan.id);
        let json = serde_json::to_string_pretty(plan)?;
        std::fs::write(&path, json)?;
        Ok(())
    }

    fn append_history(&self, plan_id: &str, snapshot: &GeneratedPlan) -> Result<(), CramError> {
        std::fs::create_dir_all(&self.root)?;
        let path = self.history_path(plan_id);

        let mut history: Vec<GeneratedPlan> = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = ?path, error = %e, "Unreadable plan history, starting fresh");
                Vec::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        history.push(snapshot.clone());
        std::fs::write(&path, serde_json::to_string_pretty(&history)?)?;
        Ok(())
    }
}

/// In-memory store for tests and embedders that persist elsewhere.
#[derive(Default)]
pub struct MemoryStore {
    plans: RwLock<HashMap<String, GeneratedPlan>>,
    history: RwLock<HashMap<String, Vec<GeneratedPlan>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history_len(&self, plan_id: &str) -> usize {
        self.history
            .read()
            .get(plan_id)
            .map(|h| h.len())
            .unwrap_or(0)
    }
}

impl PlanStore for MemoryStore {
    fn load(&self, plan_id: &str) -> Result<Option<GeneratedPlan>, CramError> {
        Ok(self.plans.read().get(plan_id).cloned())
    }

    fn save(&self, plan: &GeneratedPlan) -> Result<(), CramError> {
        self.plans
            .write()
            .insert(plan.plan.id.clone(), plan.clone());
        Ok(())
    }

    fn append_history(&self, plan_id: &str, snapshot: &GeneratedPlan) -> Result<(), CramError> {
        self.history
            .write()
            .entry(plan_id.to_string())
            .or_default()
            .push(snapshot.clone());
        Ok(())
    }
}
