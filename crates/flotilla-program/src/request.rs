//! ---
//! flt_section: "02-program-model"
//! flt_subsection: "module"
//! flt_type: "source"
//! flt_scope: "code"
//! flt_description: "Managed program value types and desired-state snapshots."
//! flt_version: "v0.0.0-prealpha"
//! flt_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::program::ManagedProgram;

/// One full desired-state snapshot received from the control plane.
///
/// Requests are immutable once constructed. Program order is significant:
/// the resolver emits `Run` steps in the order programs appear here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request<P> {
    id: String,
    created_at: DateTime<Utc>,
    programs: Vec<P>,
}

impl<P: ManagedProgram> Request<P> {
    /// Construct a desired-state snapshot for one configuration generation.
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>, programs: Vec<P>) -> Self {
        Self {
            id: id.into(),
            created_at,
            programs,
        }
    }

    /// Opaque generation identifier assigned by the control plane.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Timestamp the control plane attached to this generation.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Desired programs, in the order the control plane listed them.
    pub fn programs(&self) -> &[P] {
        &self.programs
    }
}
