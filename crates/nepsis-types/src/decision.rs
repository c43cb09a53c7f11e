// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Nepsis Kernel Decision Types
// ─────────────────────────────────────────────────────────────────────

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a step resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollapseMode {
    /// Commit to a single explanation, or defer when contradiction is high.
    #[default]
    Occam,
    /// Commit to a compatible cluster of explanations.
    Hickam,
    /// Reset the belief portion to the reset target.
    ZeroBack,
    /// Red channel fired; the blue channel did not run.
    Preempt,
}

impl CollapseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollapseMode::Occam => "occam",
            CollapseMode::Hickam => "hickam",
            CollapseMode::ZeroBack => "zero_back",
            CollapseMode::Preempt => "preempt",
        }
    }
}

impl fmt::Display for CollapseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one kernel step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub mode: CollapseMode,
    /// Committed hypothesis ids. Empty on defer, reset, pre-emption, or
    /// escalation.
    pub selected: Vec<String>,
    pub posterior: Vec<f64>,
    pub rho: f64,
    pub lyapunov: f64,
    pub converged: bool,
    pub unstable: bool,
    pub ruin_prob: f64,
    pub preempted: bool,
    /// Safety gate withheld a selection because `ruin_prob` is at or above
    /// the red-channel threshold.
    pub escalated: bool,
    /// 1-based index of the signal that produced this decision; 0 when no
    /// signal was processed.
    pub step: u64,
}

impl Decision {
    /// True when the step commits to at least one hypothesis.
    pub fn is_committed(&self) -> bool {
        !self.selected.is_empty()
    }

    /// Committed without pre-emption or escalation.
    pub fn is_actionable(&self) -> bool {
        self.is_committed() && !self.preempted && !self.escalated
    }
}
