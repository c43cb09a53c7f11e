// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Nepsis Kernel Core Engine
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Sequential belief revision over a fixed hypothesis set: interpretant
//! modulation, Bayesian update, contradiction density, Lyapunov
//! monitoring, collapse decisions, and red-channel pre-emption.
//!
//! # Safety Invariants
//!
//! 1. **Ruin never decreases**: `ruin_prob` lives in the non-resettable
//!    safety portion of `BeliefState`, whose only mutation takes the max.
//!    ZeroBack resets the belief portion and never touches it.
//!
//! 2. **Red pre-empts blue**: a red-channel trigger skips the whole blue
//!    pipeline. The posterior is carried over unchanged.
//!
//! 3. **Posterior stays normalized**: every successor state sums to 1
//!    within 1e-9. A degenerate update falls back to the previous
//!    posterior; a violation is a panic, never recovered.
//!
//! 4. **Escalation withholds commitments**: once `ruin_prob` reaches the
//!    red-channel threshold, Occam/Hickam selections are not emitted.

pub mod audit;
pub mod bayes;
pub mod contradiction;
pub mod exclusivity;
pub mod interpretant;
pub mod kernel;
pub mod likelihood;
pub mod red;

pub use audit::{AuditSink, AuditTrail, SharedAuditTrail, StepRecord};
pub use contradiction::{contradiction_density, identify_contradictions, Contradiction};
pub use interpretant::{triadic_consistency, Interpretant, Modulation};
pub use kernel::{BlueTrace, ReasoningKernel, ReasoningResult, StepOutcome, StepTrace};
pub use likelihood::{ExpectationLikelihood, ExternalLikelihood, LikelihoodModel, TableLikelihood};
pub use red::{RedAlert, RedChannel, RedTrigger};
