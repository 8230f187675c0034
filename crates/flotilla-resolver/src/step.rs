//! ---
//! flt_section: "03-state-reconciliation"
//! flt_subsection: "module"
//! flt_type: "source"
//! flt_scope: "code"
//! flt_description: "Program-state reconciliation engine."
//! flt_version: "v0.0.0-prealpha"
//! flt_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of lifecycle action the external supervisor must execute.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    /// Spawn a fresh process or hot-reload an existing one.
    Run,
    /// Locate and terminate a managed process.
    Remove,
}

/// Metadata attached to `Run` steps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepMeta {
    /// Rendered configuration payload for the target process.
    pub config: Value,
}

/// One atomic lifecycle action handed to the external process supervisor.
///
/// The supervisor must honour step order within a slice: removals precede
/// runs, since a removal may free a resource (port, lock file, pid) a
/// subsequent start requires.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Step {
    /// Action to perform.
    pub kind: StepKind,
    /// Name of the process kind the action targets.
    pub process: String,
    /// Agent build version that computed the step.
    pub version: String,
    /// Present on `Run` steps only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<StepMeta>,
}

impl Step {
    /// Build a `Run` step carrying the configuration the process must apply.
    pub fn run(process: impl Into<String>, version: impl Into<String>, config: Value) -> Self {
        Self {
            kind: StepKind::Run,
            process: process.into(),
            version: version.into(),
            meta: Some(StepMeta { config }),
        }
    }

    /// Build a `Remove` step. Carries no metadata.
    pub fn remove(process: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            kind: StepKind::Remove,
            process: process.into(),
            version: version.into(),
            meta: None,
        }
    }

    /// Whether this step starts or reloads a process.
    pub fn is_run(&self) -> bool {
        self.kind == StepKind::Run
    }
}
