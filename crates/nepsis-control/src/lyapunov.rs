// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Nepsis Lyapunov Monitor
// ─────────────────────────────────────────────────────────────────────
//! Belief-trajectory stability as a Lyapunov-style functional.
//!
//! V(π) = α_c·ρ + α_e·H(π) + α_h·mismatch(coh, π) + α_v·‖Δπ‖₂
//!
//! - ρ: contradiction density of the posterior
//! - H(π): Shannon entropy in nats
//! - mismatch: aggregate |coh − π| (mean-abs, RMS, or max-abs)
//! - ‖Δπ‖₂: posterior velocity since the previous state
//!
//! Trend: V falling for K steps below `stability_threshold` is converged;
//! V rising for N steps above `divergence_threshold` is unstable.

use serde::{Deserialize, Serialize};

use nepsis_types::belief::LyapunovTrack;
use nepsis_types::config::{LyapunovWeights, MismatchMetric, StrategyConfig};
use nepsis_types::math::{entropy, l2_distance};

/// Slack for treating V as non-increasing.
pub const TREND_TOLERANCE: f64 = 1e-12;

/// Result of one Lyapunov measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyapunovResult {
    /// Weighted total (≥ 0, lower = more settled).
    pub v: f64,
    /// Change from the previous V; 0 when there is none.
    pub dv: f64,
    pub converged: bool,
    pub unstable: bool,
    /// Breakdown of unweighted terms.
    pub contradiction: f64,
    pub entropy: f64,
    pub mismatch: f64,
    pub velocity: f64,
}

/// Lyapunov functional plus the trend rules that read it.
#[derive(Debug, Clone)]
pub struct LyapunovMonitor {
    weights: LyapunovWeights,
    metric: MismatchMetric,
    stability_threshold: f64,
    divergence_threshold: f64,
    hysteresis_k: usize,
    divergence_n: usize,
}

impl LyapunovMonitor {
    pub fn new(
        weights: LyapunovWeights,
        metric: MismatchMetric,
        stability_threshold: f64,
        divergence_threshold: f64,
        hysteresis_k: usize,
        divergence_n: usize,
    ) -> Self {
        Self {
            weights,
            metric,
            stability_threshold,
            divergence_threshold,
            hysteresis_k: hysteresis_k.max(1),
            divergence_n: divergence_n.max(1),
        }
    }

    pub fn from_strategy(strategy: &StrategyConfig) -> Self {
        Self::new(
            strategy.lyapunov_weights,
            strategy.mismatch,
            strategy.stability_threshold,
            strategy.divergence_threshold,
            strategy.hysteresis_k,
            strategy.divergence_n,
        )
    }

    /// Aggregate |coh − π| under the configured metric.
    pub fn mismatch(&self, coherence: &[f64], posterior: &[f64]) -> f64 {
        let diffs: Vec<f64> = coherence
            .iter()
            .zip(posterior)
            .map(|(c, p)| (c - p).abs())
            .collect();
        if diffs.is_empty() {
            return 0.0;
        }
        let n = diffs.len() as f64;
        match self.metric {
            MismatchMetric::MeanAbsolute => diffs.iter().sum::<f64>() / n,
            MismatchMetric::RootMeanSquare => {
                (diffs.iter().map(|d| d * d).sum::<f64>() / n).sqrt()
            }
            MismatchMetric::MaxAbsolute => diffs.iter().copied().fold(0.0, f64::max),
        }
    }

    /// Evaluate V without touching any trend state.
    pub fn evaluate(
        &self,
        rho: f64,
        posterior: &[f64],
        coherence: &[f64],
        previous: Option<&[f64]>,
    ) -> LyapunovResult {
        let h = entropy(posterior);
        let mismatch = self.mismatch(coherence, posterior);
        let velocity = previous.map_or(0.0, |prev| l2_distance(posterior, prev));
        let w = &self.weights;
        let mut v = w.contradiction * rho + w.entropy * h + w.coherence * mismatch + w.velocity * velocity;
        if !v.is_finite() {
            log::warn!("lyapunov: non-finite V (rho={rho}, H={h}, mismatch={mismatch}), using 0");
            v = 0.0;
        }
        LyapunovResult {
            v,
            dv: 0.0,
            converged: false,
            unstable: false,
            contradiction: rho,
            entropy: h,
            mismatch,
            velocity,
        }
    }

    /// Fold a new V into `track`, updating streaks and flags.
    pub fn observe(&self, track: &mut LyapunovTrack, v: f64) -> (bool, bool, f64) {
        let dv = match track.last() {
            Some(prev) => {
                if v <= prev + TREND_TOLERANCE {
                    track.non_increasing_streak += 1;
                    track.rising_streak = 0;
                } else {
                    track.rising_streak += 1;
                    track.non_increasing_streak = 0;
                }
                v - prev
            }
            None => 0.0,
        };
        track.push(v);

        track.converged =
            v < self.stability_threshold && track.non_increasing_streak >= self.hysteresis_k;
        track.unstable =
            track.rising_streak >= self.divergence_n && v > self.divergence_threshold;
        if track.unstable {
            track.unstable_streak += 1;
            log::warn!(
                "lyapunov: V rising for {} steps (V={v:.4}), unstable streak {}",
                track.rising_streak,
                track.unstable_streak
            );
        } else {
            track.unstable_streak = 0;
        }
        (track.converged, track.unstable, dv)
    }

    /// Evaluate V and fold it into `track`.
    pub fn measure(
        &self,
        track: &mut LyapunovTrack,
        rho: f64,
        posterior: &[f64],
        coherence: &[f64],
        previous: Option<&[f64]>,
    ) -> LyapunovResult {
        let mut result = self.evaluate(rho, posterior, coherence, previous);
        let (converged, unstable, dv) = self.observe(track, result.v);
        result.converged = converged;
        result.unstable = unstable;
        result.dv = dv;
        result
    }

    /// Lyapunov stability: ΔV ≤ tolerance.
    pub fn is_stable(result: &LyapunovResult, tolerance: f64) -> bool {
        result.dv <= tolerance
    }

    pub fn hysteresis_k(&self) -> usize {
        self.hysteresis_k
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> LyapunovMonitor {
        LyapunovMonitor::from_strategy(&StrategyConfig::default())
    }

    #[test]
    fn test_concentrated_matching_posterior_is_zero() {
        let m = monitor();
        let p = [1.0, 0.0];
        let r = m.evaluate(0.0, &p, &p, Some(&p));
        assert!(r.v.abs() < 1e-12, "V should be 0, got {}", r.v);
    }

    #[test]
    fn test_weighted_sum() {
        let m = monitor();
        let p = [0.5, 0.5];
        let coh = [1.0, 0.0];
        let prev = [1.0, 0.0];
        let r = m.evaluate(0.25, &p, &coh, Some(&prev));
        let expected = 2.0 * 0.25 + 2.0_f64.ln() + 1.5 * 0.5 + 0.5 * 0.5_f64.sqrt();
        assert!((r.v - expected).abs() < 1e-12, "V={} expected {expected}", r.v);
    }

    #[test]
    fn test_mismatch_metrics() {
        let coh = [0.0, 0.0, 0.6];
        let p = [0.2, 0.2, 0.6];
        let mk = |metric| {
            LyapunovMonitor::new(LyapunovWeights::default(), metric, 0.5, 0.0, 3, 4)
        };
        let mae = mk(MismatchMetric::MeanAbsolute).mismatch(&coh, &p);
        let rms = mk(MismatchMetric::RootMeanSquare).mismatch(&coh, &p);
        let max = mk(MismatchMetric::MaxAbsolute).mismatch(&coh, &p);
        assert!((mae - 0.4 / 3.0).abs() < 1e-12);
        assert!((rms - (0.08_f64 / 3.0).sqrt()).abs() < 1e-12);
        assert!((max - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_converges_after_k_non_increasing() {
        let m = monitor();
        let mut track = LyapunovTrack::default();
        for (i, v) in [0.4, 0.3, 0.3, 0.2].into_iter().enumerate() {
            let (converged, _, _) = m.observe(&mut track, v);
            assert_eq!(converged, i == 3, "step {i}");
        }
    }

    #[test]
    fn test_not_converged_above_threshold() {
        let m = monitor();
        let mut track = LyapunovTrack::default();
        for v in [0.9, 0.8, 0.7, 0.6, 0.55] {
            m.observe(&mut track, v);
        }
        assert!(!track.converged);
        assert_eq!(track.non_increasing_streak, 4);
    }

    #[test]
    fn test_unstable_after_n_rising() {
        let m = monitor();
        let mut track = LyapunovTrack::default();
        for v in [0.1, 0.2, 0.3, 0.4] {
            m.observe(&mut track, v);
        }
        assert!(!track.unstable);
        m.observe(&mut track, 0.5);
        assert!(track.unstable);
        assert_eq!(track.unstable_streak, 1);
        m.observe(&mut track, 0.6);
        assert_eq!(track.unstable_streak, 2);
        m.observe(&mut track, 0.1);
        assert!(!track.unstable);
        assert_eq!(track.unstable_streak, 0);
        assert_eq!(track.rising_streak, 0);
    }

    #[test]
    fn test_first_measurement_has_no_trend() {
        let m = monitor();
        let mut track = LyapunovTrack::default();
        let r = m.measure(&mut track, 0.0, &[0.5, 0.5], &[0.5, 0.5], None);
        assert_eq!(r.dv, 0.0);
        assert_eq!(track.non_increasing_streak, 0);
        assert_eq!(track.rising_streak, 0);
        assert!(LyapunovMonitor::is_stable(&r, 0.0));
    }
}
