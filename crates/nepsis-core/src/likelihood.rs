// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Nepsis Likelihood Models
// ─────────────────────────────────────────────────────────────────────
//! Raw evidence S: the likelihood contribution of each hypothesis for one
//! signal, before interpretant modulation.
//!
//! Three backends:
//! - `ExpectationLikelihood`: Gaussian kernel around `Hypothesis::expects`.
//! - `TableLikelihood`: explicit signal → hypothesis → likelihood table.
//! - `ExternalLikelihood`: caller-supplied closure (used by the FFI layer).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use nepsis_types::error::{NepsisError, NepsisResult};
use nepsis_types::hypothesis::Hypothesis;
use nepsis_types::signal::Signal;

/// Likelihood returned for hypotheses that say nothing about a signal.
pub const NEUTRAL_LIKELIHOOD: f64 = 1.0;

/// Trait for likelihood backends.
///
/// Returns one non-negative entry per hypothesis, in hypothesis order.
pub trait LikelihoodModel: Send + Sync {
    fn likelihoods(&self, signal: &Signal, hypotheses: &[Hypothesis]) -> Vec<f64>;
}

/// Replace negative or non-finite model output with 0.
pub fn sanitize(raw: Vec<f64>, expected_len: usize) -> Vec<f64> {
    if raw.len() != expected_len {
        log::warn!(
            "likelihood model returned {} entries for {expected_len} hypotheses, using neutral evidence",
            raw.len()
        );
        return vec![NEUTRAL_LIKELIHOOD; expected_len];
    }
    raw.into_iter()
        .map(|v| if v.is_finite() && v >= 0.0 { v } else { 0.0 })
        .collect()
}

/// Gaussian kernel around each hypothesis' expected value.
///
/// `L = exp(−(value − expected)² / 2σ²)`; neutral for hypotheses with no
/// expectation for the signal's name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectationLikelihood {
    /// Default kernel width.
    pub sigma: f64,
    /// Per-signal-name width overrides.
    #[serde(default)]
    pub sigma_by_signal: HashMap<String, f64>,
}

impl Default for ExpectationLikelihood {
    fn default() -> Self {
        Self {
            sigma: 1.0,
            sigma_by_signal: HashMap::new(),
        }
    }
}

impl ExpectationLikelihood {
    pub fn new(sigma: f64) -> NepsisResult<Self> {
        let model = Self {
            sigma,
            sigma_by_signal: HashMap::new(),
        };
        model.validate()?;
        Ok(model)
    }

    pub fn with_sigma_for(mut self, signal_name: impl Into<String>, sigma: f64) -> Self {
        self.sigma_by_signal.insert(signal_name.into(), sigma);
        self
    }

    pub fn validate(&self) -> NepsisResult<()> {
        let bad = std::iter::once(("default", self.sigma))
            .chain(self.sigma_by_signal.iter().map(|(k, v)| (k.as_str(), *v)))
            .find(|(_, s)| !s.is_finite() || *s <= 0.0);
        match bad {
            Some((name, s)) => Err(NepsisError::Configuration(format!(
                "likelihood sigma for '{name}' must be > 0, got {s}"
            ))),
            None => Ok(()),
        }
    }

    fn sigma_for(&self, signal_name: &str) -> f64 {
        self.sigma_by_signal
            .get(signal_name)
            .copied()
            .unwrap_or(self.sigma)
    }
}

impl LikelihoodModel for ExpectationLikelihood {
    fn likelihoods(&self, signal: &Signal, hypotheses: &[Hypothesis]) -> Vec<f64> {
        let sigma = self.sigma_for(&signal.name).max(1e-12);
        hypotheses
            .iter()
            .map(|h| match h.expects.get(&signal.name) {
                Some(&expected) => {
                    let z = (signal.value - expected) / sigma;
                    (-0.5 * z * z).exp()
                }
                None => NEUTRAL_LIKELIHOOD,
            })
            .collect()
    }
}

/// Explicit lookup table: signal name → hypothesis id → likelihood.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableLikelihood {
    table: HashMap<String, HashMap<String, f64>>,
}

impl TableLikelihood {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(
        mut self,
        signal_name: impl Into<String>,
        hypothesis_id: impl Into<String>,
        likelihood: f64,
    ) -> Self {
        self.insert(signal_name, hypothesis_id, likelihood);
        self
    }

    pub fn insert(
        &mut self,
        signal_name: impl Into<String>,
        hypothesis_id: impl Into<String>,
        likelihood: f64,
    ) {
        self.table
            .entry(signal_name.into())
            .or_default()
            .insert(hypothesis_id.into(), likelihood);
    }

    pub fn from_json(json: &str) -> NepsisResult<Self> {
        let table: HashMap<String, HashMap<String, f64>> = serde_json::from_str(json)
            .map_err(|e| NepsisError::Configuration(format!("JSON parse error: {e}")))?;
        Ok(Self { table })
    }
}

impl LikelihoodModel for TableLikelihood {
    fn likelihoods(&self, signal: &Signal, hypotheses: &[Hypothesis]) -> Vec<f64> {
        let row = self.table.get(&signal.name);
        hypotheses
            .iter()
            .map(|h| {
                row.and_then(|r| r.get(&h.id))
                    .copied()
                    .unwrap_or(NEUTRAL_LIKELIHOOD)
            })
            .collect()
    }
}

/// External likelihood backend that calls a function pointer.
///
/// Used by the PyO3 FFI layer to delegate evidence scoring to Python.
type LikelihoodFn = Box<dyn Fn(&Signal, &[Hypothesis]) -> Vec<f64> + Send + Sync>;

pub struct ExternalLikelihood {
    likelihood_fn: LikelihoodFn,
}

impl ExternalLikelihood {
    pub fn new(
        likelihood_fn: impl Fn(&Signal, &[Hypothesis]) -> Vec<f64> + Send + Sync + 'static,
    ) -> Self {
        Self {
            likelihood_fn: Box::new(likelihood_fn),
        }
    }
}

impl LikelihoodModel for ExternalLikelihood {
    fn likelihoods(&self, signal: &Signal, hypotheses: &[Hypothesis]) -> Vec<f64> {
        (self.likelihood_fn)(signal, hypotheses)
    }
}
