// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Nepsis Kernel Signal Types
// ─────────────────────────────────────────────────────────────────────

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{NepsisError, NepsisResult};

/// Kind of observation. Selects the interpretant activation.
///
/// Serialized as a lowercase string; unknown strings become `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SignalType {
    Vital,
    Lab,
    Symptom,
    Imaging,
    History,
    /// Safety-critical. Always pre-empts the blue channel.
    Red,
    Custom(String),
}

impl SignalType {
    pub fn as_str(&self) -> &str {
        match self {
            SignalType::Vital => "vital",
            SignalType::Lab => "lab",
            SignalType::Symptom => "symptom",
            SignalType::Imaging => "imaging",
            SignalType::History => "history",
            SignalType::Red => "red",
            SignalType::Custom(s) => s,
        }
    }
}

impl From<String> for SignalType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "vital" => SignalType::Vital,
            "lab" => SignalType::Lab,
            "symptom" => SignalType::Symptom,
            "imaging" => SignalType::Imaging,
            "history" => SignalType::History,
            "red" => SignalType::Red,
            _ => SignalType::Custom(s),
        }
    }
}

impl From<&str> for SignalType {
    fn from(s: &str) -> Self {
        SignalType::from(s.to_string())
    }
}

impl From<SignalType> for String {
    fn from(t: SignalType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of `red_threshold` is critical.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Critical when `value >= red_threshold`.
    #[default]
    Above,
    /// Critical when `value <= red_threshold`.
    Below,
}

/// One observation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    pub name: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub red_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Signal {
    pub fn new(signal_type: impl Into<SignalType>, name: impl Into<String>, value: f64) -> Self {
        Self {
            signal_type: signal_type.into(),
            name: name.into(),
            value,
            red_threshold: None,
            direction: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Attach a red-channel threshold with its critical direction.
    pub fn with_red_threshold(mut self, threshold: f64, direction: Direction) -> Self {
        self.red_threshold = Some(threshold);
        self.direction = Some(direction);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Declared direction, `Above` when unspecified.
    pub fn critical_direction(&self) -> Direction {
        self.direction.unwrap_or_default()
    }

    /// True if `value` lies on the critical side of `red_threshold`.
    pub fn crosses_red_threshold(&self) -> bool {
        match self.red_threshold {
            Some(t) => match self.critical_direction() {
                Direction::Above => self.value >= t,
                Direction::Below => self.value <= t,
            },
            None => false,
        }
    }

    /// Reject non-finite values and thresholds.
    pub fn validate(&self) -> NepsisResult<()> {
        if !self.value.is_finite() {
            return Err(NepsisError::Validation(format!(
                "signal '{}' has non-finite value {}",
                self.name, self.value
            )));
        }
        if let Some(t) = self.red_threshold {
            if !t.is_finite() {
                return Err(NepsisError::Validation(format!(
                    "signal '{}' has non-finite red_threshold {t}",
                    self.name
                )));
            }
        }
        Ok(())
    }
}
