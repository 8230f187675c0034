//! ---
//! flt_section: "03-state-reconciliation"
//! flt_subsection: "module"
//! flt_type: "source"
//! flt_scope: "code"
//! flt_description: "Program-state reconciliation engine."
//! flt_version: "v0.0.0-prealpha"
//! flt_owner: "tbd"
//! ---
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use flotilla_program::ManagedProgram;
use serde::{Deserialize, Serialize};

/// Classification applied to a program by the last convergence pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LastChange {
    /// The program was not present before and was started.
    Start,
    /// The program was present with a different configuration checksum.
    Update,
    /// The program was present with an identical checksum; nothing emitted.
    Unchanged,
}

/// The resolver's record of one program believed to be running.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveEntry<P> {
    /// Classification from the convergence pass that produced this entry.
    pub last_change: LastChange,
    /// When this entry last changed. Non-decreasing across commits for the
    /// same identifier.
    pub last_modified: DateTime<Utc>,
    /// Stable program identifier; always equals the map key.
    pub identifier: String,
    /// The program snapshot currently believed to be applied.
    pub program: P,
}

/// What the agent currently believes is running.
///
/// The active map is a `BTreeMap` so the removal pass iterates identifiers
/// in sorted order, keeping emitted step sequences reproducible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetState<P> {
    /// Generation identifier of the request this state was computed from.
    pub id: String,
    /// Timestamp of the request this state was computed from.
    pub last_modified: DateTime<Utc>,
    /// Per-identifier records of applied programs.
    pub active: BTreeMap<String, ActiveEntry<P>>,
}

impl<P: ManagedProgram> FleetState<P> {
    /// The pristine state of an agent that has never resolved a request.
    pub fn empty() -> Self {
        Self {
            id: String::new(),
            last_modified: DateTime::<Utc>::UNIX_EPOCH,
            active: BTreeMap::new(),
        }
    }

    /// Look up the record for an identifier.
    pub fn entry(&self, identifier: &str) -> Option<&ActiveEntry<P>> {
        self.active.get(identifier)
    }
}

impl<P: ManagedProgram> Default for FleetState<P> {
    fn default() -> Self {
        Self::empty()
    }
}
