//! ---
//! flt_section: "03-state-reconciliation"
//! flt_subsection: "module"
//! flt_type: "source"
//! flt_scope: "code"
//! flt_description: "Program-state reconciliation engine."
//! flt_version: "v0.0.0-prealpha"
//! flt_owner: "tbd"
//! ---
//! The reconciliation engine at the heart of the Flotilla agent.
//!
//! Given a newly received desired configuration (a [`Request`] listing
//! programs with their settings) and the agent's record of what is currently
//! running (a [`FleetState`]), [`converge`] computes the minimal,
//! deterministic, idempotent sequence of lifecycle [`Step`]s needed to bring
//! reality in line with the desired state. [`Resolver`] wraps that pure
//! function with the single mutual-exclusion guard that owns the
//! authoritative state for an agent instance, committing new state only when
//! the caller acknowledges that all emitted steps were applied.
//!
//! [`Request`]: flotilla_program::Request

#![warn(missing_docs)]

mod converge;
mod error;
mod resolver;
mod state;
mod step;

pub use converge::converge;
pub use error::ResolveError;
pub use resolver::{CommitHandle, Resolution, Resolver};
pub use state::{ActiveEntry, FleetState, LastChange};
pub use step::{Step, StepKind, StepMeta};
