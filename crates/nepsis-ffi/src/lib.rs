// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Nepsis Kernel PyO3 FFI Bindings
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
// Note: #[deny(unsafe_code)] not applied: PyO3 proc macros generate
// unsafe blocks internally. All hand-written code in this crate is safe.
//! Python-callable wrappers around the Rust Nepsis Kernel.
//!
//! Exposes `Strategy`, `Kernel`, `BeliefState` and `Decision` to Python
//! via PyO3. Hypotheses, signals and exclusivity matrices cross the
//! boundary as JSON strings.
//!
//! # FFI Safety
//!
//! - GIL acquired via `Python::with_gil` before every Python callback.
//! - Python exceptions in a likelihood callback → neutral likelihoods.
//! - All config validated before storage (`StrategyConfig::validate()`).
//!
//! Install: `pip install -e crates/nepsis-ffi` (requires maturin).
//!
//! Usage from Python:
//! ```python
//! from nepsis_kernel import Kernel, Strategy
//!
//! kernel = Kernel(Strategy.preset("emergency_medicine"))
//! result = kernel.reason(signals_json, hypotheses_json)
//! print(result["decision"]["mode"], result["decision"]["selected"])
//! ```

use std::sync::Arc;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

use nepsis_core::{
    AuditSink, ExpectationLikelihood, ExternalLikelihood, LikelihoodModel, ReasoningKernel,
    SharedAuditTrail, StepRecord, TableLikelihood,
};
use nepsis_types::{
    BeliefState, CollapsePolicy, Decision, ExclusivityMatrix, Hypothesis, InterpretantConfig,
    NepsisError, Signal, StrategyConfig,
};

fn value_err(e: NepsisError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn parse_policy(name: &str) -> PyResult<CollapsePolicy> {
    match name {
        "occam" => Ok(CollapsePolicy::Occam),
        "hickam" => Ok(CollapsePolicy::Hickam),
        "auto" => Ok(CollapsePolicy::Auto),
        other => Err(PyValueError::new_err(format!(
            "unknown collapse policy '{other}' (expected occam, hickam or auto)"
        ))),
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(json: &str) -> PyResult<T> {
    serde_json::from_str(json).map_err(|e| value_err(NepsisError::from(e)))
}

// ─── PyStrategy ─────────────────────────────────────────────────────

/// Python-visible domain strategy.
#[pyclass(name = "Strategy")]
#[derive(Clone)]
struct PyStrategy {
    inner: StrategyConfig,
}

#[pymethods]
impl PyStrategy {
    #[new]
    #[pyo3(signature = (
        name = "default".to_string(),
        collapse_policy = "occam",
        red_channel_threshold = 0.5,
        rho_occam_threshold = 0.25,
        rho_reset_threshold = 0.7,
        stability_threshold = 0.5,
        hysteresis_k = 3,
        max_steps = None,
        stop_on_convergence = false,
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        name: String,
        collapse_policy: &str,
        red_channel_threshold: f64,
        rho_occam_threshold: f64,
        rho_reset_threshold: f64,
        stability_threshold: f64,
        hysteresis_k: usize,
        max_steps: Option<usize>,
        stop_on_convergence: bool,
    ) -> PyResult<Self> {
        let config = StrategyConfig {
            name,
            collapse_policy: parse_policy(collapse_policy)?,
            red_channel_threshold,
            rho_occam_threshold,
            rho_reset_threshold,
            stability_threshold,
            hysteresis_k,
            max_steps,
            stop_on_convergence,
            ..StrategyConfig::default()
        };
        config.validate().map_err(value_err)?;
        Ok(Self { inner: config })
    }

    /// Construct from JSON string. Missing fields take their defaults.
    #[staticmethod]
    fn from_json(json: &str) -> PyResult<Self> {
        let config = StrategyConfig::from_json(json).map_err(value_err)?;
        Ok(Self { inner: config })
    }

    /// Named preset: "default", "emergency_medicine" or "research".
    #[staticmethod]
    fn preset(name: &str) -> PyResult<Self> {
        let config = StrategyConfig::preset(name).map_err(value_err)?;
        Ok(Self { inner: config })
    }

    fn to_json(&self) -> PyResult<String> {
        serde_json::to_string(&self.inner).map_err(|e| value_err(NepsisError::from(e)))
    }

    #[getter]
    fn name(&self) -> String {
        self.inner.name.clone()
    }

    #[getter]
    fn red_channel_threshold(&self) -> f64 {
        self.inner.red_channel_threshold
    }

    fn __repr__(&self) -> String {
        format!(
            "Strategy(name={}, policy={:?}, red_threshold={}, rho_reset={})",
            self.inner.name,
            self.inner.collapse_policy,
            self.inner.red_channel_threshold,
            self.inner.rho_reset_threshold
        )
    }
}

// ─── PyDecision ─────────────────────────────────────────────────────

/// Python-visible collapse decision.
#[pyclass(name = "Decision")]
#[derive(Clone)]
struct PyDecision {
    inner: Decision,
}

#[pymethods]
impl PyDecision {
    #[getter]
    fn mode(&self) -> &'static str {
        self.inner.mode.as_str()
    }

    #[getter]
    fn selected(&self) -> Vec<String> {
        self.inner.selected.clone()
    }

    #[getter]
    fn posterior(&self) -> Vec<f64> {
        self.inner.posterior.clone()
    }

    #[getter]
    fn rho(&self) -> f64 {
        self.inner.rho
    }

    #[getter]
    fn lyapunov(&self) -> f64 {
        self.inner.lyapunov
    }

    #[getter]
    fn converged(&self) -> bool {
        self.inner.converged
    }

    #[getter]
    fn unstable(&self) -> bool {
        self.inner.unstable
    }

    #[getter]
    fn ruin_prob(&self) -> f64 {
        self.inner.ruin_prob
    }

    #[getter]
    fn preempted(&self) -> bool {
        self.inner.preempted
    }

    #[getter]
    fn escalated(&self) -> bool {
        self.inner.escalated
    }

    #[getter]
    fn step(&self) -> u64 {
        self.inner.step
    }

    fn is_actionable(&self) -> bool {
        self.inner.is_actionable()
    }

    fn to_dict<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        decision_dict(py, &self.inner)
    }

    fn __repr__(&self) -> String {
        format!(
            "Decision(mode={}, selected={:?}, rho={:.4}, ruin_prob={:.4}, preempted={})",
            self.inner.mode,
            self.inner.selected,
            self.inner.rho,
            self.inner.ruin_prob,
            self.inner.preempted
        )
    }
}

fn decision_dict<'py>(py: Python<'py>, d: &Decision) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("mode", d.mode.as_str())?;
    dict.set_item("selected", d.selected.clone())?;
    dict.set_item("posterior", d.posterior.clone())?;
    dict.set_item("rho", d.rho)?;
    dict.set_item("lyapunov", d.lyapunov)?;
    dict.set_item("converged", d.converged)?;
    dict.set_item("unstable", d.unstable)?;
    dict.set_item("ruin_prob", d.ruin_prob)?;
    dict.set_item("preempted", d.preempted)?;
    dict.set_item("escalated", d.escalated)?;
    dict.set_item("step", d.step)?;
    Ok(dict)
}

// ─── PyBeliefState ──────────────────────────────────────────────────

/// Python-visible belief state. Opaque apart from read-only views;
/// advance it with `Kernel.step`.
#[pyclass(name = "BeliefState")]
#[derive(Clone)]
struct PyBeliefState {
    inner: BeliefState,
}

#[pymethods]
impl PyBeliefState {
    #[getter]
    fn ids(&self) -> Vec<String> {
        self.inner.context().ids().to_vec()
    }

    #[getter]
    fn posterior(&self) -> Vec<f64> {
        self.inner.posterior().to_vec()
    }

    #[getter]
    fn ruin_prob(&self) -> f64 {
        self.inner.ruin_prob()
    }

    #[getter]
    fn contradiction_density(&self) -> f64 {
        self.inner.contradiction_density()
    }

    #[getter]
    fn lyapunov_value(&self) -> f64 {
        self.inner.lyapunov_value()
    }

    #[getter]
    fn converged(&self) -> bool {
        self.inner.converged()
    }

    #[getter]
    fn step(&self) -> u64 {
        self.inner.step
    }

    fn posterior_of(&self, id: &str) -> Option<f64> {
        self.inner.posterior_of(id)
    }

    /// Top `n` hypothesis ids, highest posterior first.
    #[pyo3(signature = (n = 3))]
    fn top(&self, n: usize) -> Vec<String> {
        self.inner
            .top_hypotheses(n)
            .into_iter()
            .map(|h| h.id.clone())
            .collect()
    }

    fn __repr__(&self) -> String {
        let top = self
            .inner
            .top_hypothesis()
            .map(|(h, p)| format!("{}={:.3}", h.id, p))
            .unwrap_or_else(|| "-".into());
        format!(
            "BeliefState(step={}, top={}, rho={:.4}, ruin_prob={:.4})",
            self.inner.step,
            top,
            self.inner.contradiction_density(),
            self.inner.ruin_prob()
        )
    }
}

// ─── PyKernel ───────────────────────────────────────────────────────

/// Python-visible reasoning kernel.
///
/// Every `step` and `reason` call appends to the kernel's audit trail.
#[pyclass(name = "Kernel")]
struct PyKernel {
    inner: ReasoningKernel,
    audit: SharedAuditTrail,
}

#[pymethods]
impl PyKernel {
    /// Create a new kernel.
    ///
    /// Args:
    ///     strategy: Optional Strategy (uses defaults if None).
    ///     interpretant_json: Optional InterpretantConfig JSON.
    ///                        If None, a uniform 4-dimensional interpretant.
    ///     likelihood_table_json: Optional {signal: {hypothesis: likelihood}}.
    ///     likelihood_callback: Optional Callable[[str, str, float, list[str]], list[float]]
    ///                          called with (type, name, value, hypothesis ids).
    ///     sigma: Gaussian width for the default expectation likelihood.
    #[new]
    #[pyo3(signature = (
        strategy = None,
        interpretant_json = None,
        likelihood_table_json = None,
        likelihood_callback = None,
        sigma = 1.0,
    ))]
    fn new(
        strategy: Option<PyStrategy>,
        interpretant_json: Option<&str>,
        likelihood_table_json: Option<&str>,
        likelihood_callback: Option<PyObject>,
        sigma: f64,
    ) -> PyResult<Self> {
        let strategy = strategy.map(|s| s.inner).unwrap_or_default();
        let interpretant = match interpretant_json {
            Some(json) => InterpretantConfig::from_json(json).map_err(value_err)?,
            None => InterpretantConfig::uniform(4),
        };

        let likelihood: Arc<dyn LikelihoodModel> = match (likelihood_callback, likelihood_table_json)
        {
            (Some(cb), _) => Arc::new(ExternalLikelihood::new(
                move |signal: &Signal, hypotheses: &[Hypothesis]| {
                    let ids: Vec<String> = hypotheses.iter().map(|h| h.id.clone()).collect();
                    let neutral = vec![1.0; hypotheses.len()];
                    Python::with_gil(|py| {
                        match cb.call1(
                            py,
                            (signal.signal_type.as_str(), signal.name.as_str(), signal.value, ids),
                        ) {
                            Ok(result) => result.extract::<Vec<f64>>(py).unwrap_or(neutral),
                            Err(_) => neutral,
                        }
                    })
                },
            )),
            (None, Some(json)) => Arc::new(TableLikelihood::from_json(json).map_err(value_err)?),
            (None, None) => Arc::new(ExpectationLikelihood::new(sigma).map_err(value_err)?),
        };

        let kernel = ReasoningKernel::new(strategy, interpretant, likelihood).map_err(value_err)?;
        Ok(Self {
            inner: kernel,
            audit: SharedAuditTrail::new(),
        })
    }

    /// Fresh belief state from a JSON list of hypotheses.
    #[pyo3(signature = (hypotheses_json, exclusivity_json = None))]
    fn initial_state(
        &self,
        hypotheses_json: &str,
        exclusivity_json: Option<&str>,
    ) -> PyResult<PyBeliefState> {
        let hypotheses: Vec<Hypothesis> = parse_json(hypotheses_json)?;
        let exclusivity: Option<ExclusivityMatrix> =
            exclusivity_json.map(parse_json).transpose()?;
        let state = self
            .inner
            .initial_state(hypotheses, exclusivity)
            .map_err(value_err)?;
        Ok(PyBeliefState { inner: state })
    }

    /// Process one JSON signal.
    ///
    /// Returns: tuple(state: BeliefState, decision: Decision)
    fn step(&self, state: &PyBeliefState, signal_json: &str) -> PyResult<(PyBeliefState, PyDecision)> {
        let signal: Signal = parse_json(signal_json)?;
        let (next, decision) = self
            .inner
            .step(&state.inner, &signal)
            .map_err(value_err)?;
        let mut sink = self.audit.clone();
        sink.record(StepRecord::new(&next, &signal, &decision));
        Ok((PyBeliefState { inner: next }, PyDecision { inner: decision }))
    }

    /// Decision for a state without new evidence.
    fn assess(&self, state: &PyBeliefState) -> PyDecision {
        PyDecision {
            inner: self.inner.assess(&state.inner),
        }
    }

    /// Run a full signal sequence from fresh hypotheses.
    ///
    /// Returns dict with decision, final posterior, rho/lyapunov histories,
    /// steps, any_preempted, converged and top.
    #[pyo3(signature = (signals_json, hypotheses_json, exclusivity_json = None))]
    fn reason<'py>(
        &self,
        py: Python<'py>,
        signals_json: &str,
        hypotheses_json: &str,
        exclusivity_json: Option<&str>,
    ) -> PyResult<Bound<'py, PyDict>> {
        let signals: Vec<Signal> = parse_json(signals_json)?;
        let hypotheses: Vec<Hypothesis> = parse_json(hypotheses_json)?;
        let exclusivity: Option<ExclusivityMatrix> =
            exclusivity_json.map(parse_json).transpose()?;

        let mut sink = self.audit.clone();
        let result = self
            .inner
            .reason(&signals, hypotheses, exclusivity, Some(&mut sink))
            .map_err(value_err)?;

        let dict = PyDict::new(py);
        dict.set_item("decision", decision_dict(py, &result.decision)?)?;
        dict.set_item("ids", result.final_state.context().ids().to_vec())?;
        dict.set_item("posterior", result.final_state.posterior().to_vec())?;
        dict.set_item("ruin_prob", result.final_state.ruin_prob())?;
        dict.set_item("rho_history", result.rho_history.clone())?;
        dict.set_item("lyapunov_history", result.lyapunov_history.clone())?;
        dict.set_item("steps", result.steps)?;
        dict.set_item("any_preempted", result.any_preempted)?;
        dict.set_item("converged", result.converged)?;
        match result.top_hypothesis() {
            Some((h, p)) => dict.set_item("top", (h.id.clone(), p))?,
            None => dict.set_item("top", py.None())?,
        }
        Ok(dict)
    }

    /// Human-readable audit trail of every step this kernel has run.
    fn audit_summary(&self) -> String {
        self.audit.summary()
    }

    fn audit_json(&self) -> PyResult<String> {
        self.audit.snapshot().to_json().map_err(value_err)
    }

    #[getter]
    fn audit_len(&self) -> usize {
        self.audit.len()
    }

    #[getter]
    fn strategy(&self) -> PyStrategy {
        PyStrategy {
            inner: self.inner.strategy().clone(),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "Kernel(strategy={}, audit_steps={})",
            self.inner.strategy().name,
            self.audit.len()
        )
    }
}

// ─── Module ─────────────────────────────────────────────────────────

/// Python module `nepsis_kernel`.
///
/// Classes:
/// - `Strategy`: domain thresholds and collapse policy
/// - `Kernel`: belief revision with red-channel pre-emption
/// - `BeliefState`: posterior, contradiction and ruin snapshot
/// - `Decision`: per-step collapse outcome
#[pymodule]
fn nepsis_kernel(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyStrategy>()?;
    m.add_class::<PyKernel>()?;
    m.add_class::<PyBeliefState>()?;
    m.add_class::<PyDecision>()?;
    Ok(())
}
