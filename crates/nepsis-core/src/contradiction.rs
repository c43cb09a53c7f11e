// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Nepsis Contradiction Meter
// ─────────────────────────────────────────────────────────────────────
//! Contradiction density: probability mass held jointly by mutually
//! exclusive hypotheses.
//!
//! ρ = Σ_{i<j} Ξ[i,j] · π[i] · π[j], clamped to [0, 1].

use serde::{Deserialize, Serialize};

use nepsis_types::exclusivity::ExclusivityMatrix;
use nepsis_types::math::clamp_score;

/// ρ for a posterior ordered like `exclusivity`.
pub fn contradiction_density(posterior: &[f64], exclusivity: &ExclusivityMatrix) -> f64 {
    let n = posterior.len().min(exclusivity.len());
    let mut rho = 0.0;
    for i in 0..n {
        if posterior[i] == 0.0 {
            continue;
        }
        for j in (i + 1)..n {
            rho += exclusivity.at(i, j) * posterior[i] * posterior[j];
        }
    }
    clamp_score(rho, 0.0, 1.0)
}

/// One contributing pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contradiction {
    pub first: String,
    pub second: String,
    /// Ξ · π · π for the pair.
    pub strength: f64,
}

/// Pairs with non-zero exclusivity whose strength reaches `min_strength`,
/// strongest first.
pub fn identify_contradictions(
    posterior: &[f64],
    exclusivity: &ExclusivityMatrix,
    min_strength: f64,
) -> Vec<Contradiction> {
    let ids = exclusivity.ids();
    let n = posterior.len().min(ids.len());
    let mut out = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            let xi = exclusivity.at(i, j);
            if xi <= 0.0 {
                continue;
            }
            let strength = xi * posterior[i] * posterior[j];
            if strength >= min_strength {
                out.push(Contradiction {
                    first: ids[i].clone(),
                    second: ids[j].clone(),
                    strength,
                });
            }
        }
    }
    out.sort_by(|a, b| b.strength.total_cmp(&a.strength));
    out
}
