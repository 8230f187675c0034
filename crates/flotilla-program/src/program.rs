//! ---
//! flt_section: "02-program-model"
//! flt_subsection: "module"
//! flt_type: "source"
//! flt_scope: "code"
//! flt_description: "Managed program value types and desired-state snapshots."
//! flt_version: "v0.0.0-prealpha"
//! flt_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors raised while constructing program descriptions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgramError {
    /// The program identifier was empty or whitespace.
    #[error("program identifier cannot be empty")]
    EmptyIdentifier,
    /// The process kind name was empty or whitespace.
    #[error("program '{identifier}' must name a process kind")]
    EmptyCmd {
        /// Identifier of the offending program.
        identifier: String,
    },
}

/// Capability interface implemented by every managed program kind.
///
/// The resolver is polymorphic over this trait rather than over concrete
/// shipper kinds; a filebeat-like module and a metricbeat-like module are
/// two implementations, not two subclasses.
pub trait ManagedProgram: Clone {
    /// Stable name used as the map key across all resolver state.
    fn identifier(&self) -> &str;

    /// Deterministic digest of the configuration content.
    ///
    /// Must be identical for semantically identical configuration regardless
    /// of request framing or JSON key ordering, and independent of the
    /// request id or timestamp the program arrived under.
    fn checksum(&self) -> &str;

    /// Opaque settings payload forwarded verbatim into `Run` step metadata.
    fn configuration(&self) -> &Value;

    /// Name of the executable/process kind this program maps to.
    fn cmd(&self) -> &str;
}

/// Immutable description of one desired managed unit.
///
/// The checksum is computed once at construction from the canonical
/// (key-sorted) JSON encoding of the configuration payload and carried with
/// the value from then on, so serde round-trips preserve it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgramSpec {
    identifier: String,
    cmd: String,
    configuration: Value,
    checksum: String,
}

impl ProgramSpec {
    /// Construct a program description, computing its content checksum.
    pub fn new(
        identifier: impl Into<String>,
        cmd: impl Into<String>,
        configuration: Value,
    ) -> Result<Self, ProgramError> {
        let identifier = identifier.into().trim().to_owned();
        if identifier.is_empty() {
            return Err(ProgramError::EmptyIdentifier);
        }
        let cmd = cmd.into().trim().to_owned();
        if cmd.is_empty() {
            return Err(ProgramError::EmptyCmd { identifier });
        }
        let checksum = content_checksum(&configuration);
        Ok(Self {
            identifier,
            cmd,
            configuration,
            checksum,
        })
    }
}

impl ManagedProgram for ProgramSpec {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn checksum(&self) -> &str {
        &self.checksum
    }

    fn configuration(&self) -> &Value {
        &self.configuration
    }

    fn cmd(&self) -> &str {
        &self.cmd
    }
}

/// Compute the SHA-256 digest of a configuration payload's canonical form.
pub fn content_checksum(configuration: &Value) -> String {
    let canonical = canonicalize(configuration);
    let serialized =
        serde_json::to_vec(&canonical).expect("canonical JSON value serializes infallibly");
    let mut hasher = Sha256::new();
    hasher.update(serialized);
    hex::encode(hasher.finalize())
}

// Rewrites every object with its keys in sorted order so the digest does not
// depend on the key ordering the control plane happened to emit.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = serde_json::Map::with_capacity(map.len());
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
