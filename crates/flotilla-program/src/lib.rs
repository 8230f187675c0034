//! ---
//! flt_section: "02-program-model"
//! flt_subsection: "module"
//! flt_type: "source"
//! flt_scope: "code"
//! flt_description: "Managed program value types and desired-state snapshots."
//! flt_version: "v0.0.0-prealpha"
//! flt_owner: "tbd"
//! ---
//! Value types describing the units managed by the Flotilla agent: the
//! [`ManagedProgram`] capability interface, the shipped [`ProgramSpec`]
//! implementation with its content checksum, and the [`Request`]
//! desired-state snapshot received from the control plane.

#![warn(missing_docs)]

mod program;
mod request;

pub use program::{ManagedProgram, ProgramError, ProgramSpec};
pub use request::Request;
