// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Nepsis Audit Trail
// ─────────────────────────────────────────────────────────────────────
//! Per-step audit records and the sinks that collect them.
//!
//! The kernel writes one `StepRecord` per processed signal to whatever
//! `AuditSink` the caller passes to `reason`. Passing none is a no-op.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use nepsis_types::belief::BeliefState;
use nepsis_types::decision::Decision;
use nepsis_types::error::NepsisResult;
use nepsis_types::signal::Signal;

/// Record of one reasoning step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: u64,
    pub signal: Signal,
    pub rho: f64,
    pub lyapunov: f64,
    pub top_hypothesis: Option<String>,
    pub top_posterior: f64,
    pub decision: Decision,
}

impl StepRecord {
    /// Record for `decision`, taken on `state` after `signal`.
    pub fn new(state: &BeliefState, signal: &Signal, decision: &Decision) -> Self {
        let top = state.top_hypothesis();
        Self {
            step: decision.step,
            signal: signal.clone(),
            rho: decision.rho,
            lyapunov: decision.lyapunov,
            top_hypothesis: top.map(|(h, _)| h.id.clone()),
            top_posterior: top.map_or(0.0, |(_, p)| p),
            decision: decision.clone(),
        }
    }
}

/// Receiver for step records.
pub trait AuditSink {
    fn record(&mut self, record: StepRecord);
}

/// In-memory audit trail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditTrail {
    pub steps: Vec<StepRecord>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn preempted_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.decision.preempted).count()
    }

    /// Human-readable summary, one block per step.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Reasoning Audit Trail");
        let _ = writeln!(out, "{}", "=".repeat(50));
        for s in &self.steps {
            let _ = writeln!(
                out,
                "Step {}: {}:{}={:.2}",
                s.step, s.signal.signal_type, s.signal.name, s.signal.value
            );
            let _ = writeln!(out, "  -> rho={:.3}, V={:.3}", s.rho, s.lyapunov);
            if let Some(top) = &s.top_hypothesis {
                let _ = writeln!(out, "  -> Top: {top} ({:.3})", s.top_posterior);
            }
            let _ = writeln!(
                out,
                "  -> Mode: {} [{}]",
                s.decision.mode,
                s.decision.selected.join(", ")
            );
            if s.decision.preempted {
                let _ = writeln!(out, "  -> RED CHANNEL PREEMPTED (ruin={:.3})", s.decision.ruin_prob);
            }
            if s.decision.escalated {
                let _ = writeln!(out, "  -> ESCALATED (ruin={:.3})", s.decision.ruin_prob);
            }
            out.push('\n');
        }
        out
    }

    pub fn to_json(&self) -> NepsisResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> NepsisResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl AuditSink for AuditTrail {
    fn record(&mut self, record: StepRecord) {
        self.steps.push(record);
    }
}

/// Audit trail shareable across runs and threads.
///
/// Thread-safe: appends are guarded by a `parking_lot::Mutex`.
#[derive(Debug, Clone, Default)]
pub struct SharedAuditTrail {
    inner: Arc<Mutex<AuditTrail>>,
}

impl SharedAuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Copy of the current trail.
    pub fn snapshot(&self) -> AuditTrail {
        self.inner.lock().clone()
    }

    pub fn summary(&self) -> String {
        self.inner.lock().summary()
    }
}

impl AuditSink for SharedAuditTrail {
    fn record(&mut self, record: StepRecord) {
        self.inner.lock().steps.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nepsis_types::decision::CollapseMode;

    fn record(step: u64, preempted: bool) -> StepRecord {
        StepRecord {
            step,
            signal: Signal::new("vital", "sbp", 60.0),
            rho: 0.1,
            lyapunov: 0.7,
            top_hypothesis: Some("sepsis".into()),
            top_posterior: 0.6,
            decision: Decision {
                mode: if preempted { CollapseMode::Preempt } else { CollapseMode::Occam },
                selected: if preempted { vec![] } else { vec!["sepsis".into()] },
                posterior: vec![0.6, 0.4],
                rho: 0.1,
                lyapunov: 0.7,
                converged: false,
                unstable: false,
                ruin_prob: if preempted { 0.325 } else { 0.0 },
                preempted,
                escalated: false,
                step,
            },
        }
    }

    #[test]
    fn test_summary_mentions_preemption() {
        let mut trail = AuditTrail::new();
        trail.record(record(1, false));
        trail.record(record(2, true));
        let s = trail.summary();
        assert!(s.contains("Step 1: vital:sbp=60.00"));
        assert!(s.contains("Top: sepsis (0.600)"));
        assert!(s.contains("RED CHANNEL PREEMPTED"));
        assert_eq!(trail.preempted_steps(), 1);
    }

    #[test]
    fn test_json_export() {
        let mut trail = AuditTrail::new();
        trail.record(record(1, false));
        let json = trail.to_json().unwrap();
        assert!(json.contains("\"mode\": \"occam\""));
        let back = AuditTrail::from_json(&json).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back.steps[0].decision.selected, vec!["sepsis".to_string()]);
    }

    #[test]
    fn test_shared_trail_clones_share_storage() {
        let trail = SharedAuditTrail::new();
        let mut a = trail.clone();
        let mut b = trail.clone();
        a.record(record(1, false));
        b.record(record(2, true));
        assert_eq!(trail.len(), 2);
        assert_eq!(trail.snapshot().preempted_steps(), 1);
    }
}
