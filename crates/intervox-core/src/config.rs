//! Engine policy knobs shared by the selector, follow-up engine, and
//! orchestrator.

use serde::{Deserialize, Serialize};

/// Tunable pacing and flow policy for one interview process.
///
/// Loaded from configuration by the infrastructure layer; every field has a
/// sensible default so a missing config file yields a working engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnginePolicy {
    /// Maximum follow-up probes on a single question thread before the
    /// selector is forced to pick a fresh question.
    pub max_follow_ups: u8,
    /// Estimated wall-clock cost of one question+answer+evaluation cycle,
    /// in seconds. Drives the affordability tri-state.
    pub exchange_cost_secs: u64,
    /// How many difficulty levels to drop when time is tight, so generated
    /// questions stay answerable within the budget.
    pub tight_difficulty_drop: u8,
    /// Bounded timeout for external service calls, in seconds.
    pub service_timeout_secs: u64,
    /// Optional fixed wrap-up question used when both bank and generation
    /// are exhausted. When absent, exhaustion ends the session.
    pub wrap_up_question: Option<String>,
    /// Optional hard cap on exchanges per session (external turn-limit
    /// signal). `None` means time budget alone decides.
    pub max_exchanges: Option<u32>,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            max_follow_ups: 3,
            exchange_cost_secs: 90,
            tight_difficulty_drop: 1,
            service_timeout_secs: 10,
            wrap_up_question: None,
            max_exchanges: None,
        }
    }
}
