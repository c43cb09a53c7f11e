// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Nepsis Kernel Belief State
// ─────────────────────────────────────────────────────────────────────
//! Belief state carried between kernel steps.
//!
//! A `BeliefState` is three parts composed together:
//!
//! - `HypothesisContext`: hypotheses, id index, declared prior, and Ξ.
//!   Immutable, shared by every state in a lineage through `Arc`.
//! - `Belief`: posterior and the metrics derived from it. ZeroBack
//!   resets this part.
//! - `SafetyState`: the ruin accumulator. It has no setter and no reset;
//!   the only mutation is `raise`, which takes the max.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::decision::CollapseMode;
use crate::error::{NepsisError, NepsisResult};
use crate::exclusivity::ExclusivityMatrix;
use crate::hypothesis::{build_index, normalized_priors, Hypothesis};
use crate::math::{argmax, uniform, POSTERIOR_TOLERANCE};

/// Cap on the retained Lyapunov history.
pub const LYAPUNOV_HISTORY_CAP: usize = 64;

/// Metadata key counting ZeroBack resets.
pub const ZEROBACK_RESETS_KEY: &str = "zeroback_resets";

/// Immutable hypothesis-set context.
#[derive(Debug)]
pub struct HypothesisContext {
    hypotheses: Vec<Hypothesis>,
    ids: Vec<String>,
    id_index: HashMap<String, usize>,
    prior: Vec<f64>,
    exclusivity: ExclusivityMatrix,
}

impl HypothesisContext {
    /// Validate hypotheses and align Ξ onto their order.
    pub fn new(
        hypotheses: Vec<Hypothesis>,
        exclusivity: Option<ExclusivityMatrix>,
    ) -> NepsisResult<Self> {
        let prior = normalized_priors(&hypotheses)?;
        let ids: Vec<String> = hypotheses.iter().map(|h| h.id.clone()).collect();
        let exclusivity = match exclusivity {
            Some(m) => m.aligned_to(&ids)?,
            None => ExclusivityMatrix::zeros(ids.clone()),
        };
        let id_index = build_index(&hypotheses);
        Ok(Self {
            hypotheses,
            ids,
            id_index,
            prior,
            exclusivity,
        })
    }

    pub fn hypotheses(&self) -> &[Hypothesis] {
        &self.hypotheses
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.id_index.get(id).copied()
    }

    /// Normalized declared prior.
    pub fn prior(&self) -> &[f64] {
        &self.prior
    }

    /// Ξ aligned to hypothesis order: `exclusivity().at(i, j)` uses the
    /// same positions as the posterior.
    pub fn exclusivity(&self) -> &ExclusivityMatrix {
        &self.exclusivity
    }

    pub fn len(&self) -> usize {
        self.hypotheses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hypotheses.is_empty()
    }
}

/// Short-term Lyapunov trend track. Cleared by ZeroBack.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LyapunovTrack {
    pub history: VecDeque<f64>,
    pub non_increasing_streak: usize,
    pub rising_streak: usize,
    pub unstable_streak: usize,
    pub converged: bool,
    pub unstable: bool,
}

impl LyapunovTrack {
    pub fn last(&self) -> Option<f64> {
        self.history.back().copied()
    }

    pub fn push(&mut self, v: f64) {
        self.history.push_back(v);
        if self.history.len() > LYAPUNOV_HISTORY_CAP {
            self.history.pop_front();
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Resettable belief portion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Belief {
    /// Ordered like `HypothesisContext::ids`. Σ = 1.
    pub posterior: Vec<f64>,
    /// Coherence from the last blue-channel update.
    pub coherence: Vec<f64>,
    pub contradiction_density: f64,
    pub lyapunov_value: f64,
    pub track: LyapunovTrack,
    pub collapse_mode: CollapseMode,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Belief {
    fn initial(prior: &[f64]) -> Self {
        Self {
            posterior: prior.to_vec(),
            coherence: uniform(prior.len()),
            contradiction_density: 0.0,
            lyapunov_value: 0.0,
            track: LyapunovTrack::default(),
            collapse_mode: CollapseMode::Occam,
            metadata: BTreeMap::new(),
        }
    }

    /// ZeroBack: replace the posterior, clear the trend track, count it.
    pub fn reset_to(&mut self, target: Vec<f64>) {
        self.posterior = target;
        self.coherence = uniform(self.posterior.len());
        self.track.clear();
        self.collapse_mode = CollapseMode::ZeroBack;
        let count = self.zeroback_resets() + 1;
        self.metadata
            .insert(ZEROBACK_RESETS_KEY.to_string(), serde_json::Value::from(count));
    }

    pub fn zeroback_resets(&self) -> u64 {
        self.metadata
            .get(ZEROBACK_RESETS_KEY)
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0)
    }
}

/// Non-resettable safety portion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SafetyState {
    ruin_prob: f64,
    preemptions: u64,
}

impl SafetyState {
    pub fn ruin_prob(&self) -> f64 {
        self.ruin_prob
    }

    pub fn preemptions(&self) -> u64 {
        self.preemptions
    }

    /// `ruin_prob := max(ruin_prob, severity)`. Returns the new value.
    pub fn raise(&mut self, severity: f64) -> f64 {
        let before = self.ruin_prob;
        let severity = if severity.is_finite() { severity.clamp(0.0, 1.0) } else { 1.0 };
        self.ruin_prob = before.max(severity);
        assert!(
            self.ruin_prob >= before,
            "ruin_prob decreased from {before} to {}",
            self.ruin_prob
        );
        self.ruin_prob
    }

    pub fn record_preemption(&mut self) {
        self.preemptions += 1;
    }
}

/// One state in a reasoning lineage.
#[derive(Debug, Clone)]
pub struct BeliefState {
    context: Arc<HypothesisContext>,
    pub belief: Belief,
    pub safety: SafetyState,
    /// Signals processed so far in this lineage.
    pub step: u64,
}

impl BeliefState {
    /// Initial state from a hypothesis list. Posterior starts at the
    /// normalized prior; Ξ defaults to all-compatible.
    pub fn new(
        hypotheses: Vec<Hypothesis>,
        exclusivity: Option<ExclusivityMatrix>,
    ) -> NepsisResult<Self> {
        let context = HypothesisContext::new(hypotheses, exclusivity)?;
        Ok(Self::from_context(Arc::new(context)))
    }

    pub fn from_context(context: Arc<HypothesisContext>) -> Self {
        let belief = Belief::initial(context.prior());
        Self {
            context,
            belief,
            safety: SafetyState::default(),
            step: 0,
        }
    }

    /// Replace the posterior directly. Used by collaborators that seed a
    /// state from elsewhere; validates length, sign, and normalization.
    pub fn with_posterior(mut self, posterior: Vec<f64>) -> NepsisResult<Self> {
        if posterior.len() != self.context.len() {
            return Err(NepsisError::Validation(format!(
                "posterior has {} entries, expected {}",
                posterior.len(),
                self.context.len()
            )));
        }
        if posterior.iter().any(|p| !p.is_finite()) {
            return Err(NepsisError::Numerical(
                "posterior contains NaN or Inf".to_string(),
            ));
        }
        if posterior.iter().any(|p| *p < 0.0) {
            return Err(NepsisError::Validation(
                "posterior entries must be non-negative".to_string(),
            ));
        }
        let sum: f64 = posterior.iter().sum();
        if (sum - 1.0).abs() > POSTERIOR_TOLERANCE {
            return Err(NepsisError::Validation(format!(
                "posterior must sum to 1, got {sum}"
            )));
        }
        self.belief.posterior = posterior;
        Ok(self)
    }

    pub fn context(&self) -> &Arc<HypothesisContext> {
        &self.context
    }

    pub fn posterior(&self) -> &[f64] {
        &self.belief.posterior
    }

    pub fn posterior_of(&self, id: &str) -> Option<f64> {
        self.context.index_of(id).map(|i| self.belief.posterior[i])
    }

    pub fn exclusivity(&self) -> &ExclusivityMatrix {
        self.context.exclusivity()
    }

    pub fn ruin_prob(&self) -> f64 {
        self.safety.ruin_prob()
    }

    pub fn contradiction_density(&self) -> f64 {
        self.belief.contradiction_density
    }

    pub fn lyapunov_value(&self) -> f64 {
        self.belief.lyapunov_value
    }

    pub fn converged(&self) -> bool {
        self.belief.track.converged
    }

    /// Top `n` hypotheses by posterior, highest first.
    pub fn top_hypotheses(&self, n: usize) -> Vec<&Hypothesis> {
        let mut order: Vec<usize> = (0..self.context.len()).collect();
        order.sort_by(|&a, &b| {
            self.belief.posterior[b]
                .total_cmp(&self.belief.posterior[a])
                .then(a.cmp(&b))
        });
        order
            .into_iter()
            .take(n)
            .map(|i| &self.context.hypotheses()[i])
            .collect()
    }

    pub fn top_hypothesis(&self) -> Option<(&Hypothesis, f64)> {
        argmax(&self.belief.posterior)
            .map(|i| (&self.context.hypotheses()[i], self.belief.posterior[i]))
    }

    /// Contract checks. A failure is a kernel defect, not bad input.
    pub fn check_invariants(&self) {
        let sum: f64 = self.belief.posterior.iter().sum();
        assert!(
            (sum - 1.0).abs() <= POSTERIOR_TOLERANCE,
            "posterior sums to {sum}, expected 1"
        );
        assert!(
            self.belief.posterior.iter().all(|p| p.is_finite() && *p >= 0.0),
            "posterior contains negative or non-finite entries"
        );
        assert_eq!(self.belief.posterior.len(), self.context.len());
        let ruin = self.safety.ruin_prob();
        assert!((0.0..=1.0).contains(&ruin), "ruin_prob {ruin} outside [0, 1]");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hyps() -> Vec<Hypothesis> {
        vec![
            Hypothesis::new("h1", "A", 0.2),
            Hypothesis::new("h2", "B", 0.5),
            Hypothesis::new("h3", "C", 0.3),
        ]
    }

    #[test]
    fn test_initial_posterior_is_prior() {
        let s = BeliefState::new(hyps(), None).unwrap();
        assert_eq!(s.posterior(), s.context().prior());
        assert_eq!(s.ruin_prob(), 0.0);
        assert_eq!(s.step, 0);
        s.check_invariants();
    }

    #[test]
    fn test_top_hypothesis() {
        let s = BeliefState::new(hyps(), None).unwrap();
        let (top, p) = s.top_hypothesis().unwrap();
        assert_eq!(top.id, "h2");
        assert!((p - 0.5).abs() < 1e-12);
        let ids: Vec<&str> = s.top_hypotheses(2).iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["h2", "h3"]);
    }

    #[test]
    fn test_posterior_of() {
        let s = BeliefState::new(hyps(), None)
            .unwrap()
            .with_posterior(vec![0.1, 0.7, 0.2])
            .unwrap();
        assert_eq!(s.posterior_of("h2"), Some(0.7));
        assert_eq!(s.posterior_of("nope"), None);
    }

    #[test]
    fn test_with_posterior_rejects_unnormalized() {
        let s = BeliefState::new(hyps(), None).unwrap();
        assert!(s.with_posterior(vec![0.6, 0.5, 0.1]).is_err());
    }

    #[test]
    fn test_safety_raise_takes_max() {
        let mut safety = SafetyState::default();
        assert_eq!(safety.raise(0.3), 0.3);
        assert_eq!(safety.raise(0.1), 0.3);
        assert_eq!(safety.raise(0.6), 0.6);
        assert_eq!(safety.raise(f64::NAN), 1.0);
    }

    #[test]
    fn test_reset_counts_and_clears_track() {
        let mut s = BeliefState::new(hyps(), None).unwrap();
        s.belief.track.push(1.0);
        s.belief.track.rising_streak = 3;
        s.belief.reset_to(vec![1.0 / 3.0; 3]);
        s.belief.reset_to(vec![1.0 / 3.0; 3]);
        assert!(s.belief.track.history.is_empty());
        assert_eq!(s.belief.track.rising_streak, 0);
        assert_eq!(s.belief.zeroback_resets(), 2);
        assert_eq!(s.belief.collapse_mode, CollapseMode::ZeroBack);
    }

    #[test]
    fn test_track_history_capped() {
        let mut track = LyapunovTrack::default();
        for i in 0..(LYAPUNOV_HISTORY_CAP + 10) {
            track.push(i as f64);
        }
        assert_eq!(track.history.len(), LYAPUNOV_HISTORY_CAP);
        assert_eq!(track.last(), Some((LYAPUNOV_HISTORY_CAP + 9) as f64));
    }

    #[test]
    fn test_exclusivity_aligned_to_hypotheses() {
        let m = ExclusivityMatrix::try_new(
            vec!["h3".into(), "h1".into()],
            vec![vec![0.0, 0.8], vec![0.8, 0.0]],
            0.0,
        )
        .unwrap();
        let s = BeliefState::new(hyps(), Some(m)).unwrap();
        assert_eq!(s.exclusivity().at(0, 2), 0.8);
        assert_eq!(s.exclusivity().at(0, 1), 0.0);
    }

    #[test]
    fn test_unknown_exclusivity_id_is_configuration_error() {
        let m = ExclusivityMatrix::zeros(vec!["h1".into(), "ghost".into()]);
        let err = BeliefState::new(hyps(), Some(m)).unwrap_err();
        assert!(matches!(err, NepsisError::Configuration(_)));
    }

    #[test]
    fn test_branches_share_context() {
        let root = BeliefState::new(hyps(), None).unwrap();
        let a = root.clone();
        let b = root.clone();
        assert!(Arc::ptr_eq(a.context(), b.context()));
    }
}
