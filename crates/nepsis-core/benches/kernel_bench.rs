// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Nepsis Kernel Benchmarks
// ─────────────────────────────────────────────────────────────────────
//! Criterion benchmarks for the per-signal step and full sequential runs.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use nepsis_core::exclusivity::{from_rules, infer_from_expectations, GroupRule};
use nepsis_core::{contradiction_density, ExpectationLikelihood, ReasoningKernel};
use nepsis_types::{
    CollapsePolicy, ExclusivityMatrix, Hypothesis, InterpretantConfig, Signal, StrategyConfig,
};

fn hypotheses(n: usize) -> Vec<Hypothesis> {
    (0..n)
        .map(|i| {
            Hypothesis::new(format!("h{i}"), format!("H{i}"), 1.0)
                .expecting("troponin", i as f64 * 0.5)
                .expecting("hr", 60.0 + i as f64 * 10.0)
        })
        .collect()
}

fn exclusivity(n: usize) -> ExclusivityMatrix {
    let ids: Vec<String> = (0..n).map(|i| format!("h{i}")).collect();
    let evens: Vec<String> = ids.iter().step_by(2).cloned().collect();
    from_rules(
        &ids,
        &[],
        &[GroupRule {
            members: evens,
            exclusivity: 0.8,
        }],
        0.0,
    )
    .unwrap()
}

fn kernel(policy: CollapsePolicy) -> ReasoningKernel {
    let strategy = StrategyConfig {
        collapse_policy: policy,
        ..StrategyConfig::default()
    };
    ReasoningKernel::new(
        strategy,
        InterpretantConfig::uniform(16),
        Arc::new(ExpectationLikelihood::default()),
    )
    .unwrap()
}

fn signals(n: usize) -> Vec<Signal> {
    (0..n)
        .map(|i| {
            if i % 2 == 0 {
                Signal::new("lab", "troponin", 1.0 + (i % 5) as f64 * 0.1)
            } else {
                Signal::new("vital", "hr", 80.0 + (i % 7) as f64)
            }
        })
        .collect()
}

// ── ReasoningKernel.step() ──────────────────────────────────────────

fn bench_step_8_hypotheses(c: &mut Criterion) {
    let k = kernel(CollapsePolicy::Occam);
    let state = k.initial_state(hypotheses(8), Some(exclusivity(8))).unwrap();
    let signal = Signal::new("lab", "troponin", 1.2);
    c.bench_function("step_8hyp", |b| {
        b.iter(|| k.step(black_box(&state), black_box(&signal)))
    });
}

fn bench_step_64_hypotheses_hickam(c: &mut Criterion) {
    let k = kernel(CollapsePolicy::Hickam);
    let state = k.initial_state(hypotheses(64), Some(exclusivity(64))).unwrap();
    let signal = Signal::new("lab", "troponin", 1.2);
    c.bench_function("step_64hyp_hickam", |b| {
        b.iter(|| k.step(black_box(&state), black_box(&signal)))
    });
}

// ── ReasoningKernel.reason() ────────────────────────────────────────

fn bench_reason_100_signals(c: &mut Criterion) {
    let k = kernel(CollapsePolicy::Auto);
    let sigs = signals(100);
    let xi = exclusivity(8);
    c.bench_function("reason_8hyp_100sig", |b| {
        b.iter(|| k.reason(black_box(&sigs), hypotheses(8), Some(xi.clone()), None))
    });
}

// ── Contradiction density ───────────────────────────────────────────

fn bench_contradiction_density(c: &mut Criterion) {
    let n = 128;
    let xi = infer_from_expectations(&hypotheses(n), &Default::default(), 0.0).unwrap();
    let p = vec![1.0 / n as f64; n];
    c.bench_function("contradiction_density_128", |b| {
        b.iter(|| contradiction_density(black_box(&p), black_box(&xi)))
    });
}

criterion_group!(
    benches,
    bench_step_8_hypotheses,
    bench_step_64_hypotheses_hickam,
    bench_reason_100_signals,
    bench_contradiction_density,
);
criterion_main!(benches);
