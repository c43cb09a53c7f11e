// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Nepsis Kernel Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Data model, configuration, and error hierarchy for the Nepsis
//! belief-revision kernel.

pub mod belief;
pub mod config;
pub mod decision;
pub mod error;
pub mod exclusivity;
pub mod hypothesis;
pub mod math;
pub mod signal;

pub use belief::{Belief, BeliefState, HypothesisContext, LyapunovTrack, SafetyState};
pub use config::{
    CollapsePolicy, InterpretantConfig, LyapunovWeights, MismatchMetric, ResetTarget,
    StrategyConfig,
};
pub use decision::{CollapseMode, Decision};
pub use error::{NepsisError, NepsisResult};
pub use exclusivity::ExclusivityMatrix;
pub use hypothesis::Hypothesis;
pub use signal::{Direction, Signal, SignalType};
