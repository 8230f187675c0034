//! ---
//! flt_section: "03-state-reconciliation"
//! flt_subsection: "module"
//! flt_type: "source"
//! flt_scope: "code"
//! flt_description: "Program-state reconciliation engine."
//! flt_version: "v0.0.0-prealpha"
//! flt_owner: "tbd"
//! ---
use thiserror::Error;

/// Errors surfaced by the reconciliation engine.
///
/// The first two variants are invalid-request conditions: the caller handed
/// the engine input that can never converge, so retrying the identical call
/// cannot succeed. [`ResolveError::StaleCommit`] is resolver misuse under
/// concurrent commits and belongs to the programming-bug class.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The request carried an empty generation identifier.
    #[error("request generation id cannot be empty")]
    EmptyRequestId,

    /// The request listed the same program identifier more than once.
    #[error("request '{request_id}' lists program '{identifier}' more than once")]
    DuplicateProgram {
        /// Generation id of the offending request.
        request_id: String,
        /// Identifier that appeared twice.
        identifier: String,
    },

    /// The commit handle was computed against state that has since advanced.
    #[error("stale commit: state advanced from epoch {expected} to {found}")]
    StaleCommit {
        /// Epoch the resolution was computed against.
        expected: u64,
        /// Epoch found at commit time.
        found: u64,
    },
}
