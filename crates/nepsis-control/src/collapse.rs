// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Nepsis Collapse Governor
// ─────────────────────────────────────────────────────────────────────
//! Collapse decision state machine.
//!
//! Priority, evaluated fresh every blue-channel step:
//!   1. ZeroBack: ρ ≥ reset threshold, or unstable for K consecutive steps
//!   2. Hickam: compatible cluster (policy `hickam`, or `auto` when it
//!      qualifies)
//!   3. Occam: argmax while ρ is below the Occam threshold, else defer
//!
//! Escalation runs after the choice: when `ruin_prob` is at or above the
//! red-channel threshold, Occam/Hickam selections are withheld.

use serde::{Deserialize, Serialize};

use nepsis_types::belief::LyapunovTrack;
use nepsis_types::config::{CollapsePolicy, ResetTarget, StrategyConfig};
use nepsis_types::decision::CollapseMode;
use nepsis_types::exclusivity::ExclusivityMatrix;
use nepsis_types::math::{argmax, uniform};

/// Why ZeroBack fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetReason {
    Contradiction,
    Instability,
}

/// Collapse choice with positional selections.
#[derive(Debug, Clone, PartialEq)]
pub enum Collapse {
    ZeroBack { target: Vec<f64>, reason: ResetReason },
    Hickam { cluster: Vec<usize> },
    /// `None` means deferred.
    Occam { selected: Option<usize> },
}

impl Collapse {
    pub fn mode(&self) -> CollapseMode {
        match self {
            Collapse::ZeroBack { .. } => CollapseMode::ZeroBack,
            Collapse::Hickam { .. } => CollapseMode::Hickam,
            Collapse::Occam { .. } => CollapseMode::Occam,
        }
    }

    /// Selected positions. Empty for ZeroBack and deferral.
    pub fn selected(&self) -> Vec<usize> {
        match self {
            Collapse::ZeroBack { .. } => Vec::new(),
            Collapse::Hickam { cluster } => cluster.clone(),
            Collapse::Occam { selected } => selected.iter().copied().collect(),
        }
    }
}

/// Governor output: the collapse plus the escalation gate.
#[derive(Debug, Clone, PartialEq)]
pub struct CollapseVerdict {
    pub collapse: Collapse,
    pub escalated: bool,
}

impl CollapseVerdict {
    /// Positions to report, after escalation.
    pub fn committed(&self) -> Vec<usize> {
        if self.escalated {
            Vec::new()
        } else {
            self.collapse.selected()
        }
    }
}

/// Inputs the governor reads from one blue-channel step.
#[derive(Debug, Clone, Copy)]
pub struct CollapseInputs<'a> {
    pub posterior: &'a [f64],
    pub rho: f64,
    pub track: &'a LyapunovTrack,
    pub exclusivity: &'a ExclusivityMatrix,
    pub prior: &'a [f64],
    pub ruin_prob: f64,
}

#[derive(Debug, Clone)]
pub struct CollapseGovernor {
    policy: CollapsePolicy,
    rho_occam_threshold: f64,
    rho_reset_threshold: f64,
    cluster_exclusivity_threshold: f64,
    inclusion_floor: f64,
    hickam_min_mass: f64,
    hysteresis_k: usize,
    red_channel_threshold: f64,
    reset_target: ResetTarget,
}

impl CollapseGovernor {
    pub fn from_strategy(strategy: &StrategyConfig) -> Self {
        Self {
            policy: strategy.collapse_policy,
            rho_occam_threshold: strategy.rho_occam_threshold,
            rho_reset_threshold: strategy.rho_reset_threshold,
            cluster_exclusivity_threshold: strategy.cluster_exclusivity_threshold,
            inclusion_floor: strategy.inclusion_floor,
            hickam_min_mass: strategy.hickam_min_mass,
            hysteresis_k: strategy.hysteresis_k.max(1),
            red_channel_threshold: strategy.red_channel_threshold,
            reset_target: strategy.reset_target,
        }
    }

    pub fn policy(&self) -> CollapsePolicy {
        self.policy
    }

    /// Posterior ZeroBack restores.
    pub fn reset_posterior(&self, prior: &[f64]) -> Vec<f64> {
        match self.reset_target {
            ResetTarget::Prior => prior.to_vec(),
            ResetTarget::Uniform => uniform(prior.len()),
        }
    }

    /// ZeroBack trigger, if any.
    pub fn reset_reason(&self, rho: f64, track: &LyapunovTrack) -> Option<ResetReason> {
        if rho >= self.rho_reset_threshold {
            Some(ResetReason::Contradiction)
        } else if track.unstable_streak >= self.hysteresis_k {
            Some(ResetReason::Instability)
        } else {
            None
        }
    }

    /// Greedy compatible cluster in descending posterior order (ties by
    /// index). A candidate joins if its posterior reaches the inclusion
    /// floor and its Ξ with every member is below the cluster threshold.
    pub fn hickam_cluster(&self, posterior: &[f64], exclusivity: &ExclusivityMatrix) -> Vec<usize> {
        let mut order: Vec<usize> = (0..posterior.len()).collect();
        order.sort_by(|&a, &b| posterior[b].total_cmp(&posterior[a]).then(a.cmp(&b)));

        let mut cluster: Vec<usize> = Vec::new();
        for i in order {
            if posterior[i] < self.inclusion_floor {
                break;
            }
            let compatible = cluster
                .iter()
                .all(|&m| exclusivity.at(i, m) < self.cluster_exclusivity_threshold);
            if compatible {
                cluster.push(i);
            }
        }
        cluster
    }

    fn occam(&self, posterior: &[f64], rho: f64) -> Collapse {
        if rho < self.rho_occam_threshold {
            Collapse::Occam {
                selected: argmax(posterior),
            }
        } else {
            log::debug!(
                "collapse: deferring, rho={rho:.4} >= occam threshold {:.4}",
                self.rho_occam_threshold
            );
            Collapse::Occam { selected: None }
        }
    }

    fn choose(&self, inputs: &CollapseInputs<'_>) -> Collapse {
        if let Some(reason) = self.reset_reason(inputs.rho, inputs.track) {
            return Collapse::ZeroBack {
                target: self.reset_posterior(inputs.prior),
                reason,
            };
        }
        match self.policy {
            CollapsePolicy::Occam => self.occam(inputs.posterior, inputs.rho),
            CollapsePolicy::Hickam => {
                let cluster = self.hickam_cluster(inputs.posterior, inputs.exclusivity);
                if cluster.is_empty() {
                    self.occam(inputs.posterior, inputs.rho)
                } else {
                    Collapse::Hickam { cluster }
                }
            }
            CollapsePolicy::Auto => {
                let cluster = self.hickam_cluster(inputs.posterior, inputs.exclusivity);
                let mass: f64 = cluster.iter().map(|&i| inputs.posterior[i]).sum();
                if cluster.len() >= 2 && mass >= self.hickam_min_mass {
                    Collapse::Hickam { cluster }
                } else {
                    self.occam(inputs.posterior, inputs.rho)
                }
            }
        }
    }

    /// Decide the collapse for one step.
    pub fn decide(&self, inputs: &CollapseInputs<'_>) -> CollapseVerdict {
        let collapse = self.choose(inputs);
        let escalated = !matches!(collapse, Collapse::ZeroBack { .. })
            && inputs.ruin_prob >= self.red_channel_threshold;
        if escalated {
            log::warn!(
                "collapse: ruin_prob {:.4} >= {:.4}, withholding {} selection",
                inputs.ruin_prob,
                self.red_channel_threshold,
                collapse.mode()
            );
        }
        CollapseVerdict { collapse, escalated }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("h{i}")).collect()
    }

    fn scenario_c_matrix() -> ExclusivityMatrix {
        ExclusivityMatrix::try_new(
            ids(3),
            vec![
                vec![0.0, 0.1, 0.9],
                vec![0.1, 0.0, 0.0],
                vec![0.9, 0.0, 0.0],
            ],
            0.0,
        )
        .unwrap()
    }

    fn inputs<'a>(
        posterior: &'a [f64],
        rho: f64,
        track: &'a LyapunovTrack,
        xi: &'a ExclusivityMatrix,
        prior: &'a [f64],
    ) -> CollapseInputs<'a> {
        CollapseInputs {
            posterior,
            rho,
            track,
            exclusivity: xi,
            prior,
            ruin_prob: 0.0,
        }
    }

    // ── Hickam tests ────────────────────────────────────────────────

    #[test]
    fn test_hickam_cluster_excludes_conflicting() {
        let strategy = StrategyConfig {
            collapse_policy: CollapsePolicy::Hickam,
            cluster_exclusivity_threshold: 0.5,
            ..StrategyConfig::default()
        };
        let gov = CollapseGovernor::from_strategy(&strategy);
        let xi = scenario_c_matrix();
        let post = [0.4, 0.35, 0.25];
        let track = LyapunovTrack::default();
        let prior = [1.0 / 3.0; 3];
        let verdict = gov.decide(&inputs(&post, 0.1, &track, &xi, &prior));
        assert_eq!(verdict.collapse, Collapse::Hickam { cluster: vec![0, 1] });
        assert_eq!(verdict.committed(), vec![0, 1]);
    }

    #[test]
    fn test_hickam_respects_inclusion_floor() {
        let strategy = StrategyConfig {
            inclusion_floor: 0.3,
            ..StrategyConfig::default()
        };
        let gov = CollapseGovernor::from_strategy(&strategy);
        let xi = ExclusivityMatrix::zeros(ids(3));
        assert_eq!(gov.hickam_cluster(&[0.5, 0.25, 0.25], &xi), vec![0]);
    }

    #[test]
    fn test_hickam_ties_by_index() {
        let gov = CollapseGovernor::from_strategy(&StrategyConfig::default());
        let xi = ExclusivityMatrix::zeros(ids(3));
        assert_eq!(gov.hickam_cluster(&[0.2, 0.4, 0.4], &xi), vec![1, 2, 0]);
    }

    #[test]
    fn test_auto_falls_back_to_occam_on_low_mass() {
        let strategy = StrategyConfig {
            collapse_policy: CollapsePolicy::Auto,
            cluster_exclusivity_threshold: 0.5,
            ..StrategyConfig::default()
        };
        let gov = CollapseGovernor::from_strategy(&strategy);
        let xi = scenario_c_matrix();
        let post = [0.4, 0.35, 0.25];
        let track = LyapunovTrack::default();
        let prior = [1.0 / 3.0; 3];
        // Cluster {h1, h2} has mass 0.75 < 0.85.
        let verdict = gov.decide(&inputs(&post, 0.1, &track, &xi, &prior));
        assert_eq!(verdict.collapse, Collapse::Occam { selected: Some(0) });
    }

    #[test]
    fn test_auto_takes_qualifying_cluster() {
        let strategy = StrategyConfig {
            collapse_policy: CollapsePolicy::Auto,
            ..StrategyConfig::default()
        };
        let gov = CollapseGovernor::from_strategy(&strategy);
        let xi = ExclusivityMatrix::zeros(ids(3));
        let post = [0.5, 0.45, 0.05];
        let track = LyapunovTrack::default();
        let prior = [1.0 / 3.0; 3];
        let verdict = gov.decide(&inputs(&post, 0.0, &track, &xi, &prior));
        assert_eq!(verdict.collapse, Collapse::Hickam { cluster: vec![0, 1, 2] });
    }

    // ── Occam tests ─────────────────────────────────────────────────

    #[test]
    fn test_occam_commits_below_threshold() {
        let gov = CollapseGovernor::from_strategy(&StrategyConfig::default());
        let xi = ExclusivityMatrix::zeros(ids(2));
        let track = LyapunovTrack::default();
        let post = [0.3, 0.7];
        let prior = [0.5, 0.5];
        let verdict = gov.decide(&inputs(&post, 0.1, &track, &xi, &prior));
        assert_eq!(verdict.collapse, Collapse::Occam { selected: Some(1) });
    }

    #[test]
    fn test_occam_defers_between_thresholds() {
        let gov = CollapseGovernor::from_strategy(&StrategyConfig::default());
        let xi = ExclusivityMatrix::zeros(ids(2));
        let track = LyapunovTrack::default();
        let post = [0.5, 0.5];
        let prior = [0.5, 0.5];
        let verdict = gov.decide(&inputs(&post, 0.3, &track, &xi, &prior));
        assert_eq!(verdict.collapse, Collapse::Occam { selected: None });
        assert_eq!(verdict.collapse.mode(), CollapseMode::Occam);
        assert!(verdict.committed().is_empty());
    }

    // ── ZeroBack tests ──────────────────────────────────────────────

    #[test]
    fn test_zeroback_on_contradiction() {
        let strategy = StrategyConfig {
            collapse_policy: CollapsePolicy::Hickam,
            rho_reset_threshold: 0.4,
            ..StrategyConfig::default()
        };
        let gov = CollapseGovernor::from_strategy(&strategy);
        let xi = ExclusivityMatrix::zeros(ids(2));
        let track = LyapunovTrack::default();
        let post = [0.5, 0.5];
        let prior = [0.8, 0.2];
        let verdict = gov.decide(&inputs(&post, 0.4, &track, &xi, &prior));
        assert_eq!(
            verdict.collapse,
            Collapse::ZeroBack {
                target: vec![0.8, 0.2],
                reason: ResetReason::Contradiction
            }
        );
    }

    #[test]
    fn test_zeroback_on_sustained_instability() {
        let strategy = StrategyConfig {
            reset_target: ResetTarget::Uniform,
            ..StrategyConfig::default()
        };
        let gov = CollapseGovernor::from_strategy(&strategy);
        let track = LyapunovTrack {
            unstable_streak: 3,
            unstable: true,
            ..LyapunovTrack::default()
        };
        assert_eq!(gov.reset_reason(0.0, &track), Some(ResetReason::Instability));
        assert_eq!(gov.reset_posterior(&[0.9, 0.1]), vec![0.5, 0.5]);
    }

    // ── Escalation tests ────────────────────────────────────────────

    #[test]
    fn test_escalation_withholds_selection() {
        let gov = CollapseGovernor::from_strategy(&StrategyConfig::default());
        let xi = ExclusivityMatrix::zeros(ids(2));
        let track = LyapunovTrack::default();
        let post = [0.1, 0.9];
        let prior = [0.5, 0.5];
        let verdict = gov.decide(&CollapseInputs {
            ruin_prob: 0.5,
            ..inputs(&post, 0.05, &track, &xi, &prior)
        });
        assert!(verdict.escalated);
        assert_eq!(verdict.collapse, Collapse::Occam { selected: Some(1) });
        assert!(verdict.committed().is_empty());
    }
}
