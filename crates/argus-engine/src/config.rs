//! Engine tunables.

use std::time::Duration;

/// Configuration for one console session's engine state.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Maximum position samples retained per robot trail.
    pub trail_cap: usize,
    /// Maximum autonomy change-log entries retained (oldest evicted).
    pub change_log_cap: usize,
    /// Maximum suggestion records retained before resolved ones are evicted.
    pub suggestion_cap: usize,
    /// Delay before a supervised suggestion auto-executes absent an override.
    pub supervised_countdown: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            trail_cap: 50,
            change_log_cap: 50,
            suggestion_cap: 50,
            supervised_countdown: Duration::from_secs(10),
        }
    }
}
