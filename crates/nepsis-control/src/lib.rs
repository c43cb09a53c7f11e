// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Nepsis Control Layer
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Control layer over the belief trajectory: the Lyapunov stability
//! monitor and the Occam / Hickam / ZeroBack collapse governor.

pub mod collapse;
pub mod lyapunov;

pub use collapse::{Collapse, CollapseGovernor, CollapseInputs, CollapseVerdict, ResetReason};
pub use lyapunov::{LyapunovMonitor, LyapunovResult};
