// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Nepsis Kernel Numeric Helpers
// ─────────────────────────────────────────────────────────────────────
//! Small dense-vector helpers shared by the interpretant layer, the
//! updater, and the Lyapunov monitor. Everything works on `&[f64]`.

/// Tolerance for the Σπ = 1 invariant.
pub const POSTERIOR_TOLERANCE: f64 = 1e-9;

/// Floor applied before taking logarithms of likelihoods.
pub const LOG_FLOOR: f64 = 1e-12;

/// Clamp a value to [lo, hi], mapping NaN to lo and Inf to nearest bound.
#[inline]
pub fn clamp_score(value: f64, lo: f64, hi: f64) -> f64 {
    if value.is_nan() {
        log::warn!("clamp_score: NaN detected, clamping to {lo:.4}");
        return lo;
    }
    if value.is_infinite() {
        let boundary = if value > 0.0 { hi } else { lo };
        log::warn!("clamp_score: Inf detected, clamping to {boundary:.4}");
        return boundary;
    }
    value.clamp(lo, hi)
}

/// Scale `x` to sum to 1. Returns `None` when the sum is zero or not finite.
pub fn normalize(x: &[f64]) -> Option<Vec<f64>> {
    let total: f64 = x.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return None;
    }
    Some(x.iter().map(|v| v / total).collect())
}

/// Uniform distribution over `n` entries.
pub fn uniform(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    vec![1.0 / n as f64; n]
}

/// Numerically stable softmax with temperature.
pub fn softmax(x: &[f64], temperature: f64) -> Vec<f64> {
    if x.is_empty() {
        return Vec::new();
    }
    let t = temperature.max(1e-12);
    let max = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = x.iter().map(|v| ((v - max) / t).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Shannon entropy in nats. Zero entries contribute nothing.
pub fn entropy(p: &[f64]) -> f64 {
    p.iter()
        .filter(|&&v| v > 0.0)
        .map(|&v| -v * v.ln())
        .sum()
}

/// Euclidean distance between two equally sized vectors.
pub fn l2_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Euclidean norm.
pub fn l2_norm(a: &[f64]) -> f64 {
    a.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Index of the largest entry; lowest index wins ties.
pub fn argmax(x: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &v) in x.iter().enumerate() {
        match best {
            Some(b) if x[b] >= v => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Vector × matrix for a row vector `v` (len d) and a row-major `d × n` matrix.
pub fn vec_mat(v: &[f64], m: &[Vec<f64>]) -> Vec<f64> {
    let n = m.first().map_or(0, |row| row.len());
    let mut out = vec![0.0; n];
    for (vk, row) in v.iter().zip(m) {
        for (o, &w) in out.iter_mut().zip(row) {
            *o += vk * w;
        }
    }
    out
}
