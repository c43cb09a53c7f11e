// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Nepsis Reasoning Kernel
// ─────────────────────────────────────────────────────────────────────
//! One step: red channel → interpretant → updater → contradiction meter
//! → Lyapunov monitor → collapse governor.
//!
//! `step` never mutates its input: it returns a successor `BeliefState`
//! that shares the hypothesis context through `Arc`, so any state can
//! seed independent branches. `reason` folds `step` over a signal
//! sequence.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use nepsis_control::{
    Collapse, CollapseGovernor, CollapseInputs, CollapseVerdict, LyapunovMonitor,
};
use nepsis_types::belief::BeliefState;
use nepsis_types::config::{InterpretantConfig, StrategyConfig};
use nepsis_types::decision::{CollapseMode, Decision};
use nepsis_types::error::{NepsisError, NepsisResult};
use nepsis_types::exclusivity::ExclusivityMatrix;
use nepsis_types::hypothesis::Hypothesis;
use nepsis_types::signal::Signal;

use crate::audit::{AuditSink, StepRecord};
use crate::bayes;
use crate::contradiction::contradiction_density;
use crate::interpretant::{triadic_consistency, Interpretant};
use crate::likelihood::{sanitize, LikelihoodModel};
use crate::red::{RedAlert, RedChannel};

/// Blue-channel diagnostics for one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueTrace {
    pub likelihoods: Vec<f64>,
    pub activation: Vec<f64>,
    pub modulated_evidence: Vec<f64>,
    pub coherence: Vec<f64>,
    pub triadic_consistency: f64,
    /// The update fell back to the prior.
    pub degenerate: bool,
    /// ρ of the updated posterior, before any ZeroBack reset. Same as
    /// `Decision::rho`.
    pub rho_measured: f64,
}

/// Which channel handled the step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "snake_case")]
pub enum StepTrace {
    Red(RedAlert),
    Blue(BlueTrace),
}

/// Full result of one step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub state: BeliefState,
    pub decision: Decision,
    pub trace: StepTrace,
}

/// Result of a sequential run.
#[derive(Debug, Clone)]
pub struct ReasoningResult {
    pub final_state: BeliefState,
    pub decision: Decision,
    /// One entry per processed signal.
    pub rho_history: Vec<f64>,
    pub lyapunov_history: Vec<f64>,
    pub steps: usize,
    pub any_preempted: bool,
    pub converged: bool,
}

impl ReasoningResult {
    pub fn top_hypothesis(&self) -> Option<(&Hypothesis, f64)> {
        self.final_state.top_hypothesis()
    }
}

/// Sequential belief-revision kernel.
///
/// Immutable after construction; `Send + Sync`, so one kernel can drive
/// many lineages.
pub struct ReasoningKernel {
    strategy: StrategyConfig,
    interpretant: Interpretant,
    likelihood: Arc<dyn LikelihoodModel>,
    monitor: LyapunovMonitor,
    governor: CollapseGovernor,
    red: RedChannel,
}

impl ReasoningKernel {
    /// Validate `strategy` and assemble the pipeline.
    pub fn new(
        strategy: StrategyConfig,
        interpretant: InterpretantConfig,
        likelihood: Arc<dyn LikelihoodModel>,
    ) -> NepsisResult<Self> {
        strategy.validate()?;
        let monitor = LyapunovMonitor::from_strategy(&strategy);
        let governor = CollapseGovernor::from_strategy(&strategy);
        let red = RedChannel::from_strategy(&strategy);
        let interpretant = Interpretant::new(interpretant, strategy.softmax_temperature);
        log::info!(
            "nepsis kernel ready: strategy '{}', policy {:?}",
            strategy.name,
            governor.policy()
        );
        Ok(Self {
            strategy,
            interpretant,
            likelihood,
            monitor,
            governor,
            red,
        })
    }

    pub fn strategy(&self) -> &StrategyConfig {
        &self.strategy
    }

    pub fn interpretant(&self) -> &Interpretant {
        &self.interpretant
    }

    /// Initial state for a hypothesis set. Validates the hypotheses, Ξ,
    /// and the interpretant dimensions against them.
    ///
    /// Rejects a set whose ZeroBack target already sits at or above
    /// `rho_reset_threshold`: every reset would fire again on the next step.
    pub fn initial_state(
        &self,
        hypotheses: Vec<Hypothesis>,
        exclusivity: Option<ExclusivityMatrix>,
    ) -> NepsisResult<BeliefState> {
        self.interpretant.check_hypotheses(hypotheses.len())?;
        let mut state = BeliefState::new(hypotheses, exclusivity)?;
        let context = Arc::clone(state.context());
        let target = self.governor.reset_posterior(context.prior());
        let target_rho = contradiction_density(&target, context.exclusivity());
        if target_rho >= self.strategy.rho_reset_threshold {
            return Err(NepsisError::Configuration(format!(
                "reset target has rho {target_rho:.4} >= rho_reset_threshold {:.4}; \
                 ZeroBack would retrigger on every step",
                self.strategy.rho_reset_threshold
            )));
        }
        state.belief.contradiction_density =
            contradiction_density(state.posterior(), context.exclusivity());
        Ok(state)
    }

    /// One step, returning the successor and its decision.
    pub fn step(&self, state: &BeliefState, signal: &Signal) -> NepsisResult<(BeliefState, Decision)> {
        let outcome = self.step_traced(state, signal)?;
        Ok((outcome.state, outcome.decision))
    }

    /// One step with full diagnostics.
    pub fn step_traced(&self, state: &BeliefState, signal: &Signal) -> NepsisResult<StepOutcome> {
        if let Err(e) = signal.validate() {
            log::warn!("{e}; evidence treated as uninformative");
        }

        if let Some(alert) = self.red.check(signal) {
            return Ok(self.preempt(state, signal, alert));
        }

        let context = Arc::clone(state.context());
        self.interpretant.check_hypotheses(context.len())?;

        let raw = sanitize(
            self.likelihood.likelihoods(signal, context.hypotheses()),
            context.len(),
        );
        let modulation = self.interpretant.apply(signal, &raw);

        let previous = state.posterior();
        let (posterior, degenerate) = match bayes::update(
            previous,
            &modulation.evidence,
            &modulation.coherence,
            self.strategy.coherence_exponent,
        ) {
            Ok(p) => (p, false),
            Err(e) if e.is_recoverable() => {
                log::warn!("signal '{}': {e}; keeping prior", signal.name);
                (previous.to_vec(), true)
            }
            Err(e) => return Err(e),
        };

        let rho = contradiction_density(&posterior, context.exclusivity());
        let consistency = triadic_consistency(signal.value, &modulation.activation, &posterior);

        let mut next = state.clone();
        next.step += 1;
        let belief = &mut next.belief;
        let lyap = self.monitor.measure(
            &mut belief.track,
            rho,
            &posterior,
            &modulation.coherence,
            Some(previous),
        );
        belief.posterior = posterior;
        belief.coherence = modulation.coherence.clone();
        belief.contradiction_density = rho;
        belief.lyapunov_value = lyap.v;

        let verdict = self.governor.decide(&CollapseInputs {
            posterior: &belief.posterior,
            rho,
            track: &belief.track,
            exclusivity: context.exclusivity(),
            prior: context.prior(),
            ruin_prob: next.safety.ruin_prob(),
        });

        if let Collapse::ZeroBack { target, reason } = &verdict.collapse {
            log::warn!(
                "step {}: ZeroBack ({reason:?}), rho={rho:.4}, unstable_streak={}",
                next.step,
                belief.track.unstable_streak
            );
            belief.reset_to(target.clone());
            belief.contradiction_density =
                contradiction_density(&belief.posterior, context.exclusivity());
        }
        belief.collapse_mode = verdict.collapse.mode();

        // ρ that drove the verdict, paired with V. The state keeps the
        // post-reset value.
        let decision = Decision {
            rho,
            ..self.decision_for(&next, &verdict, lyap.unstable)
        };
        log::debug!(
            "step {}: mode={} rho={:.4} V={:.4} dV={:.4} selected={:?}",
            next.step,
            decision.mode,
            decision.rho,
            decision.lyapunov,
            lyap.dv,
            decision.selected
        );
        next.check_invariants();

        Ok(StepOutcome {
            state: next,
            decision,
            trace: StepTrace::Blue(BlueTrace {
                likelihoods: raw,
                activation: modulation.activation,
                modulated_evidence: modulation.evidence,
                coherence: modulation.coherence,
                triadic_consistency: consistency,
                degenerate,
                rho_measured: rho,
            }),
        })
    }

    fn preempt(&self, state: &BeliefState, signal: &Signal, alert: RedAlert) -> StepOutcome {
        let mut next = state.clone();
        next.step += 1;
        let before = next.safety.ruin_prob();
        let ruin = next.safety.raise(alert.severity);
        next.safety.record_preemption();
        next.belief.collapse_mode = CollapseMode::Preempt;
        log::error!(
            ">>> RED CHANNEL PREEMPT: signal '{}'={} ({:?}), severity {:.4}, ruin {before:.4} -> {ruin:.4} <<<",
            signal.name,
            signal.value,
            alert.trigger,
            alert.severity
        );
        next.check_invariants();

        let decision = Decision {
            mode: CollapseMode::Preempt,
            selected: Vec::new(),
            posterior: next.belief.posterior.clone(),
            rho: state.contradiction_density(),
            lyapunov: state.lyapunov_value(),
            converged: false,
            unstable: state.belief.track.unstable,
            ruin_prob: ruin,
            preempted: true,
            escalated: false,
            step: next.step,
        };
        StepOutcome {
            state: next,
            decision,
            trace: StepTrace::Red(alert),
        }
    }

    fn decision_for(&self, state: &BeliefState, verdict: &CollapseVerdict, unstable: bool) -> Decision {
        let ids = state.context().ids();
        let selected = verdict
            .committed()
            .into_iter()
            .map(|i| ids[i].clone())
            .collect();
        Decision {
            mode: verdict.collapse.mode(),
            selected,
            posterior: state.belief.posterior.clone(),
            rho: state.belief.contradiction_density,
            lyapunov: state.belief.lyapunov_value,
            converged: state.belief.track.converged,
            unstable,
            ruin_prob: state.safety.ruin_prob(),
            preempted: false,
            escalated: verdict.escalated,
            step: state.step,
        }
    }

    /// Governor verdict on a state without advancing it. A ZeroBack
    /// verdict is reported, not applied.
    pub fn assess(&self, state: &BeliefState) -> Decision {
        let context = state.context();
        let rho = contradiction_density(state.posterior(), context.exclusivity());
        let verdict = self.governor.decide(&CollapseInputs {
            posterior: state.posterior(),
            rho,
            track: &state.belief.track,
            exclusivity: context.exclusivity(),
            prior: context.prior(),
            ruin_prob: state.ruin_prob(),
        });
        Decision {
            rho,
            ..self.decision_for(state, &verdict, state.belief.track.unstable)
        }
    }

    /// Fold `step` over `signals` from a fresh state.
    pub fn reason(
        &self,
        signals: &[Signal],
        hypotheses: Vec<Hypothesis>,
        exclusivity: Option<ExclusivityMatrix>,
        audit: Option<&mut dyn AuditSink>,
    ) -> NepsisResult<ReasoningResult> {
        let state = self.initial_state(hypotheses, exclusivity)?;
        self.reason_from(state, signals, audit)
    }

    /// Fold `step` over `signals` starting at an existing state.
    pub fn reason_from(
        &self,
        initial: BeliefState,
        signals: &[Signal],
        mut audit: Option<&mut dyn AuditSink>,
    ) -> NepsisResult<ReasoningResult> {
        let limit = self.strategy.max_steps.unwrap_or(usize::MAX);
        let mut state = initial;
        let mut decision = None;
        let mut rho_history = Vec::with_capacity(signals.len().min(limit));
        let mut lyapunov_history = Vec::with_capacity(signals.len().min(limit));
        let mut any_preempted = false;

        for signal in signals.iter().take(limit) {
            let (next, d) = self.step(&state, signal)?;
            rho_history.push(d.rho);
            lyapunov_history.push(d.lyapunov);
            any_preempted |= d.preempted;
            if let Some(sink) = audit.as_deref_mut() {
                sink.record(StepRecord::new(&next, signal, &d));
            }
            state = next;
            let stop = self.strategy.stop_on_convergence && d.converged;
            decision = Some(d);
            if stop {
                log::info!("converged at step {}, stopping", state.step);
                break;
            }
        }

        if signals.len() > limit {
            log::info!(
                "max_steps {limit} reached, {} signals not processed",
                signals.len() - limit
            );
        }

        let decision = decision.unwrap_or_else(|| self.assess(&state));
        let converged = decision.converged;
        Ok(ReasoningResult {
            steps: rho_history.len(),
            final_state: state,
            decision,
            rho_history,
            lyapunov_history,
            any_preempted,
            converged,
        })
    }
}
