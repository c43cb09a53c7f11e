// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Nepsis Interpretant Layer
// ─────────────────────────────────────────────────────────────────────
//! Contextual modulation between raw evidence and the updater.
//!
//! - modulated evidence: S' = S ⊙ (I · Γ_I)
//! - coherence: coh = normalize((I · C_IO) ⊙ softmax(log S / τ))
//!
//! I is the activation for the signal's type, Γ_I and C_IO are `d × n`
//! matrices (all ones when unset). Activations are configuration, never
//! learned at runtime.

use nepsis_types::config::InterpretantConfig;
use nepsis_types::error::NepsisResult;
use nepsis_types::math::{entropy, l2_norm, normalize, softmax, vec_mat, LOG_FLOOR};
use nepsis_types::signal::Signal;

/// Output of one interpretant pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Modulation {
    pub activation: Vec<f64>,
    /// S'
    pub evidence: Vec<f64>,
    pub coherence: Vec<f64>,
}

/// Interpretant layer bound to a validated configuration.
#[derive(Debug, Clone)]
pub struct Interpretant {
    config: InterpretantConfig,
    temperature: f64,
}

impl Interpretant {
    pub fn new(config: InterpretantConfig, temperature: f64) -> Self {
        Self {
            config,
            temperature,
        }
    }

    pub fn config(&self) -> &InterpretantConfig {
        &self.config
    }

    /// Check dimensions against a hypothesis count.
    pub fn check_hypotheses(&self, n_hypotheses: usize) -> NepsisResult<()> {
        self.config.validate(n_hypotheses)
    }

    pub fn activation_for(&self, signal: &Signal) -> &[f64] {
        self.config.activation_for(signal.signal_type.as_str())
    }

    /// I · M for an optional `d × n` matrix; all ones when `None`.
    fn project(activation: &[f64], matrix: Option<&Vec<Vec<f64>>>, n: usize) -> Vec<f64> {
        match matrix {
            Some(m) => vec_mat(activation, m),
            None => vec![activation.iter().sum(); n],
        }
    }

    /// S' = S ⊙ (I · Γ_I)
    pub fn modulate(&self, raw: &[f64], activation: &[f64]) -> Vec<f64> {
        let gate = Self::project(activation, self.config.gating.as_ref(), raw.len());
        raw.iter().zip(&gate).map(|(s, g)| s * g).collect()
    }

    /// coh = normalize((I · C_IO) ⊙ softmax(log S / τ)); zero vector when
    /// the product sums to zero.
    pub fn coherence(&self, raw: &[f64], activation: &[f64]) -> Vec<f64> {
        let n = raw.len();
        let log_l: Vec<f64> = raw.iter().map(|s| s.max(LOG_FLOOR).ln()).collect();
        let weights = softmax(&log_l, self.temperature);
        let support = Self::project(activation, self.config.compatibility.as_ref(), n);
        let product: Vec<f64> = support.iter().zip(&weights).map(|(c, w)| c * w).collect();
        normalize(&product).unwrap_or_else(|| vec![0.0; n])
    }

    /// Full pass for one signal.
    pub fn apply(&self, signal: &Signal, raw: &[f64]) -> Modulation {
        let activation = self.activation_for(signal).to_vec();
        let evidence = self.modulate(raw, &activation);
        let coherence = self.coherence(raw, &activation);
        if activation.iter().all(|a| *a == 0.0) {
            log::debug!(
                "interpretant: zero activation for signal type '{}', evidence is uninformative",
                signal.signal_type
            );
        }
        Modulation {
            activation,
            evidence,
            coherence,
        }
    }
}

/// S-I-O alignment in [0, 1].
///
/// Mean of the signal/activation-strength alignment and the
/// activation/posterior entropy alignment.
pub fn triadic_consistency(signal_value: f64, activation: &[f64], posterior: &[f64]) -> f64 {
    const EPS: f64 = 1e-6;
    let strength = l2_norm(activation);
    let s = signal_value.abs();
    let s_i = 1.0 - (s - strength).abs() / s.max(strength).max(EPS);

    let i_entropy = normalize(activation).map_or(0.0, |p| entropy(&p));
    let h_entropy = entropy(posterior);
    let i_h = 1.0 - (i_entropy - h_entropy).abs() / i_entropy.max(h_entropy).max(EPS);

    let c = (s_i + i_h) / 2.0;
    if c.is_finite() {
        c.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
