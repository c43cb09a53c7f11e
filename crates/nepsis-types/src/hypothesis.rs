// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Nepsis Kernel Hypothesis Types
// ─────────────────────────────────────────────────────────────────────

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{NepsisError, NepsisResult};
use crate::math::uniform;

/// A candidate explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub id: String,
    pub name: String,
    /// Declared prior in [0, 1]. Normalized together with its siblings.
    #[serde(default)]
    pub prior: f64,
    /// Expected value per signal name. Read by exclusivity inference and
    /// the expectation likelihood model, never by the kernel itself.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub expects: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Hypothesis {
    pub fn new(id: impl Into<String>, name: impl Into<String>, prior: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            prior,
            expects: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn expecting(mut self, signal_name: impl Into<String>, value: f64) -> Self {
        self.expects.insert(signal_name.into(), value);
        self
    }

    pub fn validate(&self) -> NepsisResult<()> {
        if self.id.is_empty() {
            return Err(NepsisError::Configuration(
                "hypothesis id must not be empty".to_string(),
            ));
        }
        if !self.prior.is_finite() || !(0.0..=1.0).contains(&self.prior) {
            return Err(NepsisError::Configuration(format!(
                "prior for '{}' must be in [0, 1], got {}",
                self.id, self.prior
            )));
        }
        Ok(())
    }
}

/// Validate a hypothesis set: non-empty, unique ids, valid priors.
pub fn validate_hypotheses(hypotheses: &[Hypothesis]) -> NepsisResult<()> {
    if hypotheses.is_empty() {
        return Err(NepsisError::Configuration(
            "at least one hypothesis is required".to_string(),
        ));
    }
    let mut seen = HashMap::with_capacity(hypotheses.len());
    for (i, h) in hypotheses.iter().enumerate() {
        h.validate()?;
        if let Some(prev) = seen.insert(h.id.as_str(), i) {
            return Err(NepsisError::Configuration(format!(
                "duplicate hypothesis id '{}' at positions {prev} and {i}",
                h.id
            )));
        }
    }
    Ok(())
}

/// Normalized prior vector. All-zero declarations fall back to uniform.
pub fn normalized_priors(hypotheses: &[Hypothesis]) -> NepsisResult<Vec<f64>> {
    validate_hypotheses(hypotheses)?;
    let total: f64 = hypotheses.iter().map(|h| h.prior).sum();
    if total <= 0.0 {
        return Ok(uniform(hypotheses.len()));
    }
    Ok(hypotheses.iter().map(|h| h.prior / total).collect())
}

/// Stable id → position lookup.
pub fn build_index(hypotheses: &[Hypothesis]) -> HashMap<String, usize> {
    hypotheses
        .iter()
        .enumerate()
        .map(|(i, h)| (h.id.clone(), i))
        .collect()
}
