// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Nepsis Bayesian Updater
// ─────────────────────────────────────────────────────────────────────
//! π_post[h] ∝ π_prior[h] · S'[h] · coh[h]^λ

use nepsis_types::error::{NepsisError, NepsisResult};
use nepsis_types::math::normalize;

/// Combine prior, modulated evidence, and coherence into a posterior.
///
/// Returns `DegenerateUpdate` when the unnormalized product sums to zero
/// or is not finite. Order is preserved; no entry is dropped.
pub fn update(
    prior: &[f64],
    evidence: &[f64],
    coherence: &[f64],
    coherence_exponent: f64,
) -> NepsisResult<Vec<f64>> {
    if prior.len() != evidence.len() || prior.len() != coherence.len() {
        return Err(NepsisError::DegenerateUpdate(format!(
            "length mismatch: prior {}, evidence {}, coherence {}",
            prior.len(),
            evidence.len(),
            coherence.len()
        )));
    }
    let unnormalized: Vec<f64> = prior
        .iter()
        .zip(evidence)
        .zip(coherence)
        .map(|((p, s), c)| p * s * c.powf(coherence_exponent))
        .collect();
    normalize(&unnormalized).ok_or_else(|| {
        NepsisError::DegenerateUpdate(format!(
            "unnormalized posterior sums to {}",
            unnormalized.iter().sum::<f64>()
        ))
    })
}
