// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Nepsis Exclusivity Builders
// ─────────────────────────────────────────────────────────────────────
//! Construction of Ξ from expert rules, from hypothesis expectations, or
//! from a legacy `(a, b) → ξ` pair map. Every builder returns a matrix
//! that passed `ExclusivityMatrix::try_new`.

use std::collections::{BTreeMap, HashMap};

use nepsis_types::error::NepsisResult;
use nepsis_types::exclusivity::ExclusivityMatrix;
use nepsis_types::hypothesis::Hypothesis;
use nepsis_types::math::clamp_score;

/// Expected values closer than this count as agreeing.
const EXPECTATION_TOLERANCE: f64 = 1e-12;

/// One explicit pair rule.
#[derive(Debug, Clone, PartialEq)]
pub struct PairRule {
    pub first: String,
    pub second: String,
    pub exclusivity: f64,
}

impl PairRule {
    pub fn new(first: impl Into<String>, second: impl Into<String>, exclusivity: f64) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
            exclusivity,
        }
    }
}

/// Every pair inside `members` gets `exclusivity`.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRule {
    pub members: Vec<String>,
    pub exclusivity: f64,
}

impl GroupRule {
    pub fn new(members: &[&str], exclusivity: f64) -> Self {
        Self {
            members: members.iter().map(|m| m.to_string()).collect(),
            exclusivity,
        }
    }
}

/// Build Ξ from expert rules.
///
/// Values are clamped to [0, 1]. Pair rules are applied in order (later
/// pairs overwrite earlier ones); group rules then raise each pair to the
/// max of its current value and the group's. Ids not in `ids` are ignored.
pub fn from_rules(
    ids: &[String],
    pairs: &[PairRule],
    groups: &[GroupRule],
    default: f64,
) -> NepsisResult<ExclusivityMatrix> {
    let n = ids.len();
    let idx: HashMap<&str, usize> = ids.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect();
    let mut m = vec![vec![0.0; n]; n];

    for rule in pairs {
        if let (Some(&i), Some(&j)) = (idx.get(rule.first.as_str()), idx.get(rule.second.as_str())) {
            if i == j {
                continue;
            }
            let xi = clamp_score(rule.exclusivity, 0.0, 1.0);
            m[i][j] = xi;
            m[j][i] = xi;
        } else {
            log::debug!(
                "exclusivity: ignoring pair rule ({}, {}) with unknown id",
                rule.first,
                rule.second
            );
        }
    }

    for group in groups {
        let xi = clamp_score(group.exclusivity, 0.0, 1.0);
        let members: Vec<usize> = group
            .members
            .iter()
            .filter_map(|id| idx.get(id.as_str()).copied())
            .collect();
        for (k, &a) in members.iter().enumerate() {
            for &b in &members[k + 1..] {
                if a == b {
                    continue;
                }
                let v = m[a][b].max(xi);
                m[a][b] = v;
                m[b][a] = v;
            }
        }
    }

    ExclusivityMatrix::try_new(ids.to_vec(), m, clamp_score(default, 0.0, 1.0))
}

/// Infer Ξ from overlapping expectations.
///
/// Ξ[i,j] = weighted fraction of shared expectation keys whose expected
/// values differ. Keys default to weight 1.0; pairs with no shared keys
/// stay at 0.
pub fn infer_from_expectations(
    hypotheses: &[Hypothesis],
    signal_weights: &HashMap<String, f64>,
    default: f64,
) -> NepsisResult<ExclusivityMatrix> {
    let n = hypotheses.len();
    let mut m = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let (hi, hj) = (&hypotheses[i], &hypotheses[j]);
            let mut conflict = 0.0;
            let mut weight_sum = 0.0;
            for (key, vi) in &hi.expects {
                let Some(vj) = hj.expects.get(key) else {
                    continue;
                };
                let w = signal_weights.get(key).copied().unwrap_or(1.0).max(0.0);
                weight_sum += w;
                if (vi - vj).abs() > EXPECTATION_TOLERANCE {
                    conflict += w;
                }
            }
            let xi = if weight_sum > 0.0 { conflict / weight_sum } else { 0.0 };
            m[i][j] = xi;
            m[j][i] = xi;
        }
    }
    let ids = hypotheses.iter().map(|h| h.id.clone()).collect();
    ExclusivityMatrix::try_new(ids, m, clamp_score(default, 0.0, 1.0))
}

/// Migrate a legacy `(a, b) → ξ` map.
pub fn from_pair_map(
    ids: &[String],
    pairs: &BTreeMap<(String, String), f64>,
    default: f64,
) -> NepsisResult<ExclusivityMatrix> {
    let rules: Vec<PairRule> = pairs
        .iter()
        .map(|((a, b), xi)| PairRule::new(a.clone(), b.clone(), *xi))
        .collect();
    from_rules(ids, &rules, &[], default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_rules_symmetric_and_clamped() {
        let m = from_rules(
            &ids(&["stemi", "angina", "gerd"]),
            &[
                PairRule::new("stemi", "gerd", 1.7),
                PairRule::new("angina", "stemi", 0.6),
                PairRule::new("stemi", "ghost", 0.9),
            ],
            &[],
            0.0,
        )
        .unwrap();
        assert_eq!(m.get("stemi", "gerd"), 1.0);
        assert_eq!(m.get("gerd", "stemi"), 1.0);
        assert_eq!(m.get("stemi", "angina"), 0.6);
        assert_eq!(m.get("angina", "gerd"), 0.0);
    }

    #[test]
    fn test_group_takes_max() {
        let m = from_rules(
            &ids(&["a", "b", "c"]),
            &[PairRule::new("a", "b", 0.8)],
            &[GroupRule::new(&["a", "b", "c"], 0.5)],
            0.0,
        )
        .unwrap();
        assert_eq!(m.get("a", "b"), 0.8);
        assert_eq!(m.get("a", "c"), 0.5);
        assert_eq!(m.get("b", "c"), 0.5);
    }

    #[test]
    fn test_infer_fraction_of_conflicts() {
        let hs = vec![
            Hypothesis::new("h1", "H1", 0.5)
                .expecting("fever", 1.0)
                .expecting("cough", 1.0),
            Hypothesis::new("h2", "H2", 0.5)
                .expecting("fever", 0.0)
                .expecting("cough", 1.0),
            Hypothesis::new("h3", "H3", 0.0).expecting("rash", 1.0),
        ];
        let m = infer_from_expectations(&hs, &HashMap::new(), 0.0).unwrap();
        assert!((m.get("h1", "h2") - 0.5).abs() < 1e-12);
        assert_eq!(m.get("h1", "h3"), 0.0);

        let mut weights = HashMap::new();
        weights.insert("fever".to_string(), 3.0);
        let m = infer_from_expectations(&hs, &weights, 0.0).unwrap();
        assert!((m.get("h1", "h2") - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_pair_map_migration() {
        let mut pairs = BTreeMap::new();
        pairs.insert(("stemi".to_string(), "gerd".to_string()), 0.9);
        let m = from_pair_map(&ids(&["stemi", "gerd"]), &pairs, 0.0).unwrap();
        assert_eq!(m.get("gerd", "stemi"), 0.9);
    }
}
