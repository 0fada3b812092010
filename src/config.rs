//! Analysis configuration supplied by the host.

use serde::{Deserialize, Serialize};

/// Host-tunable knobs. Neither field changes what the analysis considers
/// safe; `integer_loop_size_min` only suppresses plans for loops known to be
/// too small to be worth parallelizing, and `verbose` only controls whether
/// findings are collected alongside the verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Minimum literal trip count for a counted loop to receive a plan.
    /// Loops with symbolic bounds are never suppressed by this threshold.
    pub integer_loop_size_min: u64,

    /// Collect per-site findings (safety reasons, soft warnings) in the
    /// result. The parallelizability verdict is identical either way.
    pub verbose: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            integer_loop_size_min: 0,
            verbose: false,
        }
    }
}
