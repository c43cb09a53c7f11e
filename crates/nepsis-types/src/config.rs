// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Nepsis Kernel Configuration
// ─────────────────────────────────────────────────────────────────────

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{NepsisError, NepsisResult};

/// Weights for the four Lyapunov terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LyapunovWeights {
    pub contradiction: f64,
    pub entropy: f64,
    pub coherence: f64,
    pub velocity: f64,
}

impl Default for LyapunovWeights {
    fn default() -> Self {
        Self {
            contradiction: 2.0,
            entropy: 1.0,
            coherence: 1.5,
            velocity: 0.5,
        }
    }
}

impl LyapunovWeights {
    fn validate(&self) -> NepsisResult<()> {
        for (name, w) in [
            ("contradiction", self.contradiction),
            ("entropy", self.entropy),
            ("coherence", self.coherence),
            ("velocity", self.velocity),
        ] {
            if !w.is_finite() || w < 0.0 {
                return Err(NepsisError::Configuration(format!(
                    "lyapunov weight '{name}' must be finite and >= 0, got {w}"
                )));
            }
        }
        Ok(())
    }
}

/// Which collapse outcome the governor aims for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollapsePolicy {
    /// Single best hypothesis.
    #[default]
    Occam,
    /// Co-occurring causes: always emit the compatible cluster.
    Hickam,
    /// Cluster when it qualifies, single best otherwise.
    Auto,
}

/// Posterior that ZeroBack restores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetTarget {
    /// Normalized declared priors.
    #[default]
    Prior,
    Uniform,
}

/// Aggregate used for the coherence/posterior mismatch term.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchMetric {
    #[default]
    MeanAbsolute,
    RootMeanSquare,
    MaxAbsolute,
}

/// Domain strategy: every threshold the kernel consults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub name: String,

    pub collapse_policy: CollapsePolicy,

    /// Ruin level at which Occam/Hickam commitments are withheld.
    /// Default: 0.5.
    pub red_channel_threshold: f64,

    /// Severity floor for any red-channel trigger.
    /// Default: 0.1.
    pub red_base_severity: f64,

    pub lyapunov_weights: LyapunovWeights,

    pub mismatch: MismatchMetric,

    /// Occam commits only while ρ is below this.
    /// Default: 0.25.
    pub rho_occam_threshold: f64,

    /// ZeroBack fires when ρ reaches this. ρ of the reset target must stay
    /// below it, otherwise every reset retriggers.
    /// Default: 0.7.
    pub rho_reset_threshold: f64,

    /// Hickam admits a candidate only if Ξ with every member is below this.
    /// Default: 0.4.
    pub cluster_exclusivity_threshold: f64,

    /// Minimum posterior for Hickam admission.
    /// Default: 0.05.
    pub inclusion_floor: f64,

    /// Mass an `auto` cluster needs before it beats Occam.
    /// Default: 0.85.
    pub hickam_min_mass: f64,

    /// V must be below this to count as converged.
    /// Default: 0.5.
    pub stability_threshold: f64,

    /// V must exceed this for a rising streak to count as unstable.
    /// Default: 0.0.
    pub divergence_threshold: f64,

    /// Consecutive non-increasing steps required for convergence, and
    /// consecutive unstable steps before ZeroBack.
    /// Default: 3.
    pub hysteresis_k: usize,

    /// Consecutive rising steps before the monitor flags instability.
    /// Default: 4.
    pub divergence_n: usize,

    /// Coherence exponent λ in π_post ∝ π·L·coh^λ.
    /// Default: 1.0.
    pub coherence_exponent: f64,

    /// Softmax temperature over log-likelihoods for coherence.
    /// Default: 1.0.
    pub softmax_temperature: f64,

    pub reset_target: ResetTarget,

    /// Stop after this many signals. `None` processes all.
    pub max_steps: Option<usize>,

    /// Stop as soon as the monitor reports convergence.
    pub stop_on_convergence: bool,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            collapse_policy: CollapsePolicy::Occam,
            red_channel_threshold: 0.5,
            red_base_severity: 0.1,
            lyapunov_weights: LyapunovWeights::default(),
            mismatch: MismatchMetric::MeanAbsolute,
            rho_occam_threshold: 0.25,
            rho_reset_threshold: 0.7,
            cluster_exclusivity_threshold: 0.4,
            inclusion_floor: 0.05,
            hickam_min_mass: 0.85,
            stability_threshold: 0.5,
            divergence_threshold: 0.0,
            hysteresis_k: 3,
            divergence_n: 4,
            coherence_exponent: 1.0,
            softmax_temperature: 1.0,
            reset_target: ResetTarget::Prior,
            max_steps: None,
            stop_on_convergence: false,
        }
    }
}

impl StrategyConfig {
    /// Balanced default strategy.
    pub fn default_strategy() -> Self {
        Self::default()
    }

    /// Emergency medicine: multiple diagnoses expected, sensitive red
    /// escalation, heavy contradiction and coherence weighting.
    pub fn emergency_medicine() -> Self {
        Self {
            name: "emergency_medicine".to_string(),
            collapse_policy: CollapsePolicy::Hickam,
            red_channel_threshold: 0.3,
            lyapunov_weights: LyapunovWeights {
                contradiction: 2.5,
                entropy: 1.0,
                coherence: 2.0,
                velocity: 0.3,
            },
            cluster_exclusivity_threshold: 0.4,
            inclusion_floor: 0.1,
            ..Self::default()
        }
    }

    /// Research: tolerate uncertainty, explore, converge slowly.
    pub fn research() -> Self {
        Self {
            name: "research".to_string(),
            collapse_policy: CollapsePolicy::Auto,
            red_channel_threshold: 0.9,
            lyapunov_weights: LyapunovWeights {
                contradiction: 1.5,
                entropy: 2.0,
                coherence: 1.0,
                velocity: 0.8,
            },
            rho_occam_threshold: 0.2,
            hysteresis_k: 5,
            ..Self::default()
        }
    }

    /// Look up a preset by name.
    pub fn preset(name: &str) -> NepsisResult<Self> {
        match name {
            "default" => Ok(Self::default_strategy()),
            "emergency_medicine" => Ok(Self::emergency_medicine()),
            "research" => Ok(Self::research()),
            other => Err(NepsisError::Configuration(format!(
                "unknown strategy preset '{other}'"
            ))),
        }
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> NepsisResult<()> {
        for (name, v) in [
            ("red_channel_threshold", self.red_channel_threshold),
            ("red_base_severity", self.red_base_severity),
            ("rho_occam_threshold", self.rho_occam_threshold),
            ("rho_reset_threshold", self.rho_reset_threshold),
            ("cluster_exclusivity_threshold", self.cluster_exclusivity_threshold),
            ("inclusion_floor", self.inclusion_floor),
            ("hickam_min_mass", self.hickam_min_mass),
        ] {
            if !v.is_finite() || !(0.0..=1.0).contains(&v) {
                return Err(NepsisError::Configuration(format!(
                    "{name} must be in [0, 1], got {v}"
                )));
            }
        }
        if self.rho_occam_threshold > self.rho_reset_threshold {
            return Err(NepsisError::Configuration(format!(
                "rho_occam_threshold ({}) must not exceed rho_reset_threshold ({})",
                self.rho_occam_threshold, self.rho_reset_threshold
            )));
        }
        self.lyapunov_weights.validate()?;
        if !self.stability_threshold.is_finite() || self.stability_threshold < 0.0 {
            return Err(NepsisError::Configuration(format!(
                "stability_threshold must be >= 0, got {}",
                self.stability_threshold
            )));
        }
        if !self.divergence_threshold.is_finite() {
            return Err(NepsisError::Configuration(
                "divergence_threshold must be finite".to_string(),
            ));
        }
        if self.hysteresis_k < 1 {
            return Err(NepsisError::Configuration(format!(
                "hysteresis_k must be >= 1, got {}",
                self.hysteresis_k
            )));
        }
        if self.divergence_n < 1 {
            return Err(NepsisError::Configuration(format!(
                "divergence_n must be >= 1, got {}",
                self.divergence_n
            )));
        }
        if !self.coherence_exponent.is_finite() || self.coherence_exponent < 0.0 {
            return Err(NepsisError::Configuration(format!(
                "coherence_exponent must be >= 0, got {}",
                self.coherence_exponent
            )));
        }
        if !self.softmax_temperature.is_finite() || self.softmax_temperature <= 0.0 {
            return Err(NepsisError::Configuration(format!(
                "softmax_temperature must be > 0, got {}",
                self.softmax_temperature
            )));
        }
        if self.max_steps == Some(0) {
            return Err(NepsisError::Configuration(
                "max_steps must be > 0 when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Load from JSON string. Missing fields take their defaults.
    pub fn from_json(json: &str) -> NepsisResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| NepsisError::Configuration(format!("JSON parse error: {e}")))
    }
}

/// Interpretant activation and gating.
///
/// `gating` (Γ_I) and `compatibility` (C_IO) are `dim × n_hypotheses`
/// row-major matrices; `None` means all ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpretantConfig {
    pub dim: usize,
    /// Activation for signal types absent from `activations`.
    pub default_activation: Vec<f64>,
    /// Activation vector per signal type string.
    pub activations: HashMap<String, Vec<f64>>,
    pub gating: Option<Vec<Vec<f64>>>,
    pub compatibility: Option<Vec<Vec<f64>>>,
}

impl Default for InterpretantConfig {
    fn default() -> Self {
        Self::uniform(16)
    }
}

impl InterpretantConfig {
    /// Uniform activation 1/dim, all-ones gating and compatibility.
    pub fn uniform(dim: usize) -> Self {
        let d = dim.max(1);
        Self {
            dim: d,
            default_activation: vec![1.0 / d as f64; d],
            activations: HashMap::new(),
            gating: None,
            compatibility: None,
        }
    }

    pub fn with_activation(mut self, signal_type: impl Into<String>, activation: Vec<f64>) -> Self {
        self.activations.insert(signal_type.into(), activation);
        self
    }

    /// Activation vector for a signal type.
    pub fn activation_for(&self, signal_type: &str) -> &[f64] {
        self.activations
            .get(signal_type)
            .map(Vec::as_slice)
            .unwrap_or(self.default_activation.as_slice())
    }

    /// Validate dimensions against a hypothesis count.
    pub fn validate(&self, n_hypotheses: usize) -> NepsisResult<()> {
        if self.dim == 0 {
            return Err(NepsisError::Configuration(
                "interpretant dim must be >= 1".to_string(),
            ));
        }
        let check_vec = |label: &str, v: &[f64]| -> NepsisResult<()> {
            if v.len() != self.dim {
                return Err(NepsisError::Configuration(format!(
                    "{label} has length {}, expected interpretant dim {}",
                    v.len(),
                    self.dim
                )));
            }
            if v.iter().any(|x| !x.is_finite() || *x < 0.0) {
                return Err(NepsisError::Configuration(format!(
                    "{label} must be finite and non-negative"
                )));
            }
            Ok(())
        };
        check_vec("default_activation", &self.default_activation)?;
        for (ty, v) in &self.activations {
            check_vec(&format!("activation for '{ty}'"), v)?;
        }
        for (label, m) in [("gating", &self.gating), ("compatibility", &self.compatibility)] {
            if let Some(m) = m {
                if m.len() != self.dim || m.iter().any(|row| row.len() != n_hypotheses) {
                    return Err(NepsisError::Configuration(format!(
                        "{label} must be {}x{n_hypotheses}",
                        self.dim
                    )));
                }
                if m.iter().flatten().any(|x| !x.is_finite() || *x < 0.0) {
                    return Err(NepsisError::Configuration(format!(
                        "{label} must be finite and non-negative"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> NepsisResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| NepsisError::Configuration(format!("JSON parse error: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_valid() {
        assert!(StrategyConfig::default().validate().is_ok());
    }

    #[test]
    fn test_presets_valid() {
        for name in ["default", "emergency_medicine", "research"] {
            let s = StrategyConfig::preset(name).unwrap();
            assert_eq!(s.name, name);
            assert!(s.validate().is_ok(), "preset {name} invalid");
        }
        assert!(StrategyConfig::preset("astrology").is_err());
    }

    #[test]
    fn test_emergency_uses_hickam() {
        assert_eq!(
            StrategyConfig::emergency_medicine().collapse_policy,
            CollapsePolicy::Hickam
        );
    }

    #[test]
    fn test_threshold_out_of_range() {
        let cfg = StrategyConfig {
            rho_reset_threshold: 1.2,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_occam_above_reset_rejected() {
        let cfg = StrategyConfig {
            rho_occam_threshold: 0.5,
            rho_reset_threshold: 0.3,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_hysteresis_rejected() {
        let cfg = StrategyConfig {
            hysteresis_k: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut cfg = StrategyConfig::default();
        cfg.lyapunov_weights.entropy = -1.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_from_json_partial() {
        let cfg = StrategyConfig::from_json(
            r#"{"name":"x","collapse_policy":"hickam","reset_target":"uniform","lyapunov_weights":{"entropy":3.0}}"#,
        )
        .unwrap();
        assert_eq!(cfg.collapse_policy, CollapsePolicy::Hickam);
        assert_eq!(cfg.reset_target, ResetTarget::Uniform);
        assert_eq!(cfg.lyapunov_weights.entropy, 3.0);
        assert_eq!(cfg.lyapunov_weights.contradiction, 2.0);
        assert_eq!(cfg.hysteresis_k, 3);
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(StrategyConfig::from_json("{not json").is_err());
    }

    #[test]
    fn test_interpretant_uniform() {
        let cfg = InterpretantConfig::uniform(4);
        assert!(cfg.validate(3).is_ok());
        assert_eq!(cfg.activation_for("lab"), &[0.25; 4]);
    }

    #[test]
    fn test_interpretant_activation_lookup() {
        let cfg = InterpretantConfig::uniform(2).with_activation("lab", vec![1.0, 0.0]);
        assert_eq!(cfg.activation_for("lab"), &[1.0, 0.0]);
        assert_eq!(cfg.activation_for("vital"), &[0.5, 0.5]);
    }

    #[test]
    fn test_interpretant_gating_shape_checked() {
        let cfg = InterpretantConfig {
            gating: Some(vec![vec![1.0, 1.0]; 2]),
            ..InterpretantConfig::uniform(2)
        };
        assert!(cfg.validate(2).is_ok());
        assert!(cfg.validate(3).is_err());
    }

    #[test]
    fn test_interpretant_bad_activation_len() {
        let cfg = InterpretantConfig::uniform(2).with_activation("lab", vec![1.0]);
        assert!(cfg.validate(2).is_err());
    }
}
