// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Nepsis Kernel Exclusivity Matrix
// ─────────────────────────────────────────────────────────────────────
//! Typed mutual-exclusivity matrix Ξ with hypothesis ordering.
//!
//! - Ξ[i,j] ∈ [0, 1]: 0.0 = compatible, 1.0 = mutually exclusive
//! - Symmetric, zero diagonal
//! - Unknown ids look up as `default`

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{NepsisError, NepsisResult};

const SYMMETRY_TOLERANCE: f64 = 1e-9;

#[derive(Deserialize)]
struct RawExclusivity {
    ids: Vec<String>,
    matrix: Vec<Vec<f64>>,
    #[serde(default)]
    default: f64,
}

impl TryFrom<RawExclusivity> for ExclusivityMatrix {
    type Error = NepsisError;

    fn try_from(raw: RawExclusivity) -> NepsisResult<Self> {
        ExclusivityMatrix::try_new(raw.ids, raw.matrix, raw.default)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawExclusivity")]
pub struct ExclusivityMatrix {
    ids: Vec<String>,
    matrix: Vec<Vec<f64>>,
    default: f64,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl ExclusivityMatrix {
    /// Build and validate. Rejects non-square, asymmetric, out-of-range,
    /// or non-zero-diagonal input.
    pub fn try_new(ids: Vec<String>, matrix: Vec<Vec<f64>>, default: f64) -> NepsisResult<Self> {
        let n = ids.len();
        if matrix.len() != n || matrix.iter().any(|row| row.len() != n) {
            return Err(NepsisError::Configuration(format!(
                "exclusivity matrix must be {n}x{n} to match its ids"
            )));
        }
        if !default.is_finite() || !(0.0..=1.0).contains(&default) {
            return Err(NepsisError::Configuration(format!(
                "exclusivity default must be in [0, 1], got {default}"
            )));
        }
        let mut index = HashMap::with_capacity(n);
        for (i, id) in ids.iter().enumerate() {
            if index.insert(id.clone(), i).is_some() {
                return Err(NepsisError::Configuration(format!(
                    "duplicate id '{id}' in exclusivity matrix"
                )));
            }
        }
        for i in 0..n {
            if matrix[i][i] != 0.0 {
                return Err(NepsisError::Configuration(format!(
                    "exclusivity diagonal must be zero, Ξ[{0},{0}] = {1}",
                    ids[i], matrix[i][i]
                )));
            }
            for j in (i + 1)..n {
                let (a, b) = (matrix[i][j], matrix[j][i]);
                for (r, c, v) in [(i, j, a), (j, i, b)] {
                    if !v.is_finite() || !(0.0..=1.0).contains(&v) {
                        return Err(NepsisError::Configuration(format!(
                            "Ξ[{},{}] = {v} outside [0, 1]",
                            ids[r], ids[c]
                        )));
                    }
                }
                if (a - b).abs() > SYMMETRY_TOLERANCE {
                    return Err(NepsisError::Configuration(format!(
                        "exclusivity matrix is asymmetric: Ξ[{0},{1}] = {a} but Ξ[{1},{0}] = {b}",
                        ids[i], ids[j]
                    )));
                }
            }
        }
        Ok(Self {
            ids,
            matrix,
            default,
            index,
        })
    }

    /// All-compatible matrix.
    pub fn zeros(ids: Vec<String>) -> Self {
        let n = ids.len();
        let index = ids.iter().enumerate().map(|(i, id)| (id.clone(), i)).collect();
        Self {
            ids,
            matrix: vec![vec![0.0; n]; n],
            default: 0.0,
            index,
        }
    }

    /// Exclusivity between two hypothesis ids. Symmetric; 0 on the diagonal.
    pub fn get(&self, a: &str, b: &str) -> f64 {
        if a == b {
            return 0.0;
        }
        match (self.index.get(a), self.index.get(b)) {
            (Some(&i), Some(&j)) => self.matrix[i][j],
            _ => self.default,
        }
    }

    /// Positional lookup in this matrix's own id order.
    #[inline]
    pub fn at(&self, i: usize, j: usize) -> f64 {
        self.matrix[i][j]
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.matrix
    }

    pub fn default_value(&self) -> f64 {
        self.default
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Count of unordered pairs with non-zero exclusivity.
    pub fn nonzero_pairs(&self) -> usize {
        let n = self.len();
        (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .filter(|&(i, j)| self.matrix[i][j] > 0.0)
            .count()
    }

    /// Re-index onto `ids` (the hypothesis order). Every id this matrix
    /// knows must appear in `ids`; ids it does not know use `default`.
    pub fn aligned_to(&self, ids: &[String]) -> NepsisResult<Self> {
        let wanted: HashMap<&str, usize> =
            ids.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect();
        if let Some(unknown) = self.ids.iter().find(|id| !wanted.contains_key(id.as_str())) {
            return Err(NepsisError::Configuration(format!(
                "exclusivity matrix references unknown hypothesis id '{unknown}'"
            )));
        }
        let n = ids.len();
        let mut matrix = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let xi = self.get(&ids[i], &ids[j]);
                matrix[i][j] = xi;
                matrix[j][i] = xi;
            }
        }
        Self::try_new(ids.to_vec(), matrix, self.default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_symmetric_lookup() {
        let m = ExclusivityMatrix::try_new(
            ids(&["stemi", "gerd"]),
            vec![vec![0.0, 0.9], vec![0.9, 0.0]],
            0.0,
        )
        .unwrap();
        assert_eq!(m.get("stemi", "gerd"), 0.9);
        assert_eq!(m.get("gerd", "stemi"), 0.9);
        assert_eq!(m.get("stemi", "stemi"), 0.0);
        assert_eq!(m.get("unknown", "stemi"), 0.0);
    }

    #[test]
    fn test_asymmetric_rejected() {
        let err = ExclusivityMatrix::try_new(
            ids(&["a", "b"]),
            vec![vec![0.0, 0.9], vec![0.2, 0.0]],
            0.0,
        )
        .unwrap_err();
        assert!(matches!(err, NepsisError::Configuration(_)));
        assert!(err.to_string().contains("asymmetric"));
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(ExclusivityMatrix::try_new(
            ids(&["a", "b"]),
            vec![vec![0.0, 1.5], vec![1.5, 0.0]],
            0.0,
        )
        .is_err());
    }

    #[test]
    fn test_nan_below_diagonal_rejected() {
        let err = ExclusivityMatrix::try_new(
            ids(&["h1", "h2"]),
            vec![vec![0.0, 0.5], vec![f64::NAN, 0.0]],
            0.0,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Ξ[h2,h1]"), "{err}");
    }

    #[test]
    fn test_nonzero_diagonal_rejected() {
        assert!(ExclusivityMatrix::try_new(
            ids(&["a", "b"]),
            vec![vec![0.3, 0.0], vec![0.0, 0.0]],
            0.0,
        )
        .is_err());
    }

    #[test]
    fn test_aligned_reorders() {
        let m = ExclusivityMatrix::try_new(
            ids(&["a", "b", "c"]),
            vec![
                vec![0.0, 0.1, 0.9],
                vec![0.1, 0.0, 0.0],
                vec![0.9, 0.0, 0.0],
            ],
            0.0,
        )
        .unwrap();
        let aligned = m.aligned_to(&ids(&["c", "a", "b", "d"])).unwrap();
        assert_eq!(aligned.at(0, 1), 0.9);
        assert_eq!(aligned.at(1, 2), 0.1);
        assert_eq!(aligned.at(3, 0), 0.0);
    }

    #[test]
    fn test_aligned_unknown_id_rejected() {
        let m = ExclusivityMatrix::zeros(ids(&["a", "ghost"]));
        let err = m.aligned_to(&ids(&["a", "b"])).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_json_validates() {
        let ok = r#"{"ids":["a","b"],"matrix":[[0.0,1.0],[1.0,0.0]]}"#;
        let m: ExclusivityMatrix = serde_json::from_str(ok).unwrap();
        assert_eq!(m.get("a", "b"), 1.0);
        let bad = r#"{"ids":["a","b"],"matrix":[[0.0,1.0],[0.5,0.0]]}"#;
        assert!(serde_json::from_str::<ExclusivityMatrix>(bad).is_err());
    }

    #[test]
    fn test_nonzero_pairs() {
        let m = ExclusivityMatrix::try_new(
            ids(&["a", "b", "c"]),
            vec![
                vec![0.0, 0.7, 0.0],
                vec![0.7, 0.0, 0.3],
                vec![0.0, 0.3, 0.0],
            ],
            0.0,
        )
        .unwrap();
        assert_eq!(m.nonzero_pairs(), 2);
    }
}
