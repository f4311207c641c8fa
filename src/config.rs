use serde::Deserialize;
use std::time::Duration;

/// Tunables the coordinator depends on. Every field has a production
/// default, so partial configuration files work.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Minimum number of photos before an enrollment can be finalized.
    pub min_photos: usize,
    /// Quiet period after the last ambient photo before the batch fires.
    pub quiet_period_ms: u64,
    /// Face comparison tolerance handed to the oracle; lower is stricter.
    pub match_tolerance: f64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            min_photos: 3,
            quiet_period_ms: 5_000,
            match_tolerance: 0.5,
        }
    }
}

impl CoordinatorConfig {
    /// The quiet period as a `Duration`.
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }
}
