// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Nepsis Kernel Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use thiserror::Error;

/// Root error type for all Nepsis Kernel failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NepsisError {
    /// Structurally invalid hypotheses, exclusivity matrix, or strategy.
    /// Fatal at construction time.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Invalid runtime input (signal fields, mismatched vector lengths).
    #[error("validation error: {0}")]
    Validation(String),

    /// Modulated likelihood collapsed to zero for every hypothesis.
    /// Recoverable: the kernel falls back to a prior-only update.
    #[error("degenerate update: {0}")]
    DegenerateUpdate(String),

    /// Numerical error (NaN/Inf in computation).
    #[error("numerical error: {0}")]
    Numerical(String),

    /// JSON encode/decode failure.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl NepsisError {
    /// True for conditions the kernel absorbs instead of surfacing.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, NepsisError::DegenerateUpdate(_))
    }
}

impl From<serde_json::Error> for NepsisError {
    fn from(e: serde_json::Error) -> Self {
        NepsisError::Serialization(e.to_string())
    }
}

pub type NepsisResult<T> = Result<T, NepsisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_degenerate_is_recoverable() {
        assert!(NepsisError::DegenerateUpdate("zero".into()).is_recoverable());
        assert!(!NepsisError::Configuration("bad".into()).is_recoverable());
        assert!(!NepsisError::Numerical("nan".into()).is_recoverable());
    }

    #[test]
    fn test_display_prefix() {
        let e = NepsisError::Configuration("asymmetric".into());
        assert_eq!(e.to_string(), "configuration error: asymmetric");
    }
}
