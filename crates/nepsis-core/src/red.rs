// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Nepsis Red Channel
// ─────────────────────────────────────────────────────────────────────
//! Safety pre-emption gate, evaluated before the blue channel on every
//! signal.
//!
//! Triggers on a declared `red_threshold` crossed in the critical
//! direction, or on any `red`-typed signal. Severity feeds the monotone
//! ruin accumulator:
//!
//!   severity = clamp(base + (1 − base) · overshoot, 0, 1)
//!   overshoot = min(1, |value − threshold| / max(|threshold|, 1e-9))

use serde::{Deserialize, Serialize};

use nepsis_types::config::StrategyConfig;
use nepsis_types::math::clamp_score;
use nepsis_types::signal::{Direction, Signal, SignalType};

const THRESHOLD_FLOOR: f64 = 1e-9;

/// What fired the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedTrigger {
    ThresholdCrossed,
    RedSignal,
}

/// A fired red-channel check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedAlert {
    pub trigger: RedTrigger,
    pub severity: f64,
    /// Normalized distance past the threshold; 0 when none was crossed.
    pub overshoot: f64,
}

#[derive(Debug, Clone)]
pub struct RedChannel {
    base_severity: f64,
}

impl RedChannel {
    pub fn new(base_severity: f64) -> Self {
        Self {
            base_severity: clamp_score(base_severity, 0.0, 1.0),
        }
    }

    pub fn from_strategy(strategy: &StrategyConfig) -> Self {
        Self::new(strategy.red_base_severity)
    }

    /// Normalized overshoot past a crossed threshold, or `None`.
    pub fn overshoot(signal: &Signal) -> Option<f64> {
        if !signal.crosses_red_threshold() {
            return None;
        }
        let t = signal.red_threshold?;
        let past = match signal.critical_direction() {
            Direction::Above => signal.value - t,
            Direction::Below => t - signal.value,
        };
        Some((past.abs() / t.abs().max(THRESHOLD_FLOOR)).min(1.0))
    }

    pub fn severity_for(&self, overshoot: f64) -> f64 {
        clamp_score(
            self.base_severity + (1.0 - self.base_severity) * overshoot,
            0.0,
            1.0,
        )
    }

    /// Check one signal. `None` lets it through to the blue channel.
    pub fn check(&self, signal: &Signal) -> Option<RedAlert> {
        if let Some(overshoot) = Self::overshoot(signal) {
            return Some(RedAlert {
                trigger: RedTrigger::ThresholdCrossed,
                severity: self.severity_for(overshoot),
                overshoot,
            });
        }
        if signal.signal_type == SignalType::Red {
            return Some(RedAlert {
                trigger: RedTrigger::RedSignal,
                severity: self.base_severity,
                overshoot: 0.0,
            });
        }
        None
    }
}

impl Default for RedChannel {
    fn default() -> Self {
        Self::from_strategy(&StrategyConfig::default())
    }
}
