use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Injected randomness source for id minting and tie-breaking.
/// Every component that needs randomness takes a `&PlanRng` so tests can
/// fix the seed and assert exact output.
pub struct PlanRng {
    inner: Mutex<StdRng>,
}

impl PlanRng {
    /// Seeded source: identical seeds yield identical id and pick sequences.
    pub fn seeded(seed: u64) -> Self {
        PlanRng {
            inner: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Entropy-seeded source for production use.
    pub fn from_entropy() -> Self {
        PlanRng {
            inner: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Mint an id like `task_9f2c41d07a83e5b6`.
    pub fn next_id(&self, prefix: &str) -> String {
        let n = self.inner.lock().next_u64();
        format!("{}_{:016x}", prefix, n)
    }

    /// Pick an index in `[0, len)`; None for an empty collection.
    pub fn pick_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some(self.inner.lock().gen_range(0..len))
    }
}
