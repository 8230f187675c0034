//! ---
//! flt_section: "03-state-reconciliation"
//! flt_subsection: "module"
//! flt_type: "source"
//! flt_scope: "code"
//! flt_description: "Program-state reconciliation engine."
//! flt_version: "v0.0.0-prealpha"
//! flt_owner: "tbd"
//! ---
use std::collections::{BTreeMap, BTreeSet};

use flotilla_program::{ManagedProgram, Request};
use tracing::trace;

use crate::error::ResolveError;
use crate::state::{ActiveEntry, FleetState, LastChange};
use crate::step::Step;

/// Compute the lifecycle steps that converge `old` onto `request`.
///
/// Pure and total over well-formed input: no I/O, no clock reads, no
/// randomness. Calling it twice with the same arguments yields the same
/// state and the same step sequence.
///
/// Step ordering contract: all `Remove` steps for vanished identifiers come
/// first, in sorted identifier order, followed by `Run` steps in the order
/// programs appear in the request. Unchanged programs emit nothing, so
/// re-resolving the same logical configuration under a fresh generation id
/// is a true no-op.
///
/// Change detection is by configuration checksum, never by generation id, so
/// a control-plane re-fetch that alters nothing produces zero steps.
pub fn converge<P: ManagedProgram>(
    old: &FleetState<P>,
    request: &Request<P>,
    version: &str,
) -> Result<(FleetState<P>, Vec<Step>), ResolveError> {
    if request.id().trim().is_empty() {
        return Err(ResolveError::EmptyRequestId);
    }

    let mut desired: BTreeSet<&str> = BTreeSet::new();
    for program in request.programs() {
        if !desired.insert(program.identifier()) {
            return Err(ResolveError::DuplicateProgram {
                request_id: request.id().to_owned(),
                identifier: program.identifier().to_owned(),
            });
        }
    }

    let mut next = FleetState {
        id: request.id().to_owned(),
        last_modified: request.created_at(),
        active: BTreeMap::new(),
    };
    let mut steps = Vec::new();

    // Removal pass. BTreeMap iteration order keeps the emitted sequence
    // reproducible regardless of how the old state was built up.
    for (identifier, entry) in &old.active {
        if !desired.contains(identifier.as_str()) {
            trace!(identifier = %identifier, process = %entry.program.cmd(), "program vanished from desired state");
            steps.push(Step::remove(entry.program.cmd(), version));
        }
    }

    // Start/update pass in request order.
    for program in request.programs() {
        let identifier = program.identifier();
        match old.active.get(identifier) {
            None => {
                trace!(identifier = %identifier, "program not active; starting");
                steps.push(Step::run(
                    program.cmd(),
                    version,
                    program.configuration().clone(),
                ));
                next.active.insert(
                    identifier.to_owned(),
                    ActiveEntry {
                        last_change: LastChange::Start,
                        last_modified: request.created_at(),
                        identifier: identifier.to_owned(),
                        program: program.clone(),
                    },
                );
            }
            Some(previous) if previous.program.checksum() != program.checksum() => {
                trace!(identifier = %identifier, "program checksum changed; updating");
                steps.push(Step::run(
                    program.cmd(),
                    version,
                    program.configuration().clone(),
                ));
                // Clamp keeps last_modified non-decreasing when the control
                // plane stamps a request with a skewed, older timestamp.
                let last_modified = request.created_at().max(previous.last_modified);
                next.active.insert(
                    identifier.to_owned(),
                    ActiveEntry {
                        last_change: LastChange::Update,
                        last_modified,
                        identifier: identifier.to_owned(),
                        program: program.clone(),
                    },
                );
            }
            Some(previous) => {
                let mut entry = previous.clone();
                entry.last_change = LastChange::Unchanged;
                next.active.insert(identifier.to_owned(), entry);
            }
        }
    }

    Ok((next, steps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::StepKind;
    use chrono::{Duration, TimeZone, Utc};
    use flotilla_program::ProgramSpec;
    use serde_json::json;

    fn program(identifier: &str, content: &str) -> ProgramSpec {
        ProgramSpec::new(identifier, identifier, json!({ "content": content })).unwrap()
    }

    fn request(id: &str, programs: Vec<ProgramSpec>) -> Request<ProgramSpec> {
        Request::new(id, Utc.with_ymd_and_hms(2026, 8, 25, 12, 0, 0).unwrap(), programs)
    }

    fn resolved(programs: Vec<ProgramSpec>) -> FleetState<ProgramSpec> {
        let (state, _) = converge(&FleetState::empty(), &request("seed", programs), "0.1.0").unwrap();
        state
    }

    #[test]
    fn fresh_state_starts_every_program() {
        let req = request(
            "gen-1",
            vec![program("filebeat", "a"), program("metricbeat", "a")],
        );
        let (state, steps) = converge(&FleetState::empty(), &req, "0.1.0").unwrap();

        assert_eq!(steps.len(), 2);
        assert!(steps.iter().all(Step::is_run));
        assert_eq!(state.active.len(), 2);
        assert!(state
            .active
            .values()
            .all(|entry| entry.last_change == LastChange::Start));
        assert_eq!(state.id, "gen-1");
    }

    #[test]
    fn known_program_is_unchanged_and_new_program_starts() {
        let old = resolved(vec![program("filebeat", "a")]);
        let req = request(
            "gen-2",
            vec![program("filebeat", "a"), program("metricbeat", "a")],
        );
        let (state, steps) = converge(&old, &req, "0.1.0").unwrap();

        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].process, "metricbeat");
        assert_eq!(steps[0].kind, StepKind::Run);
        assert_eq!(
            state.entry("filebeat").unwrap().last_change,
            LastChange::Unchanged
        );
        assert_eq!(
            state.entry("metricbeat").unwrap().last_change,
            LastChange::Start
        );
    }

    #[test]
    fn checksum_change_emits_single_update_run() {
        let old = resolved(vec![program("filebeat", "a")]);
        let req = request("gen-2", vec![program("filebeat", "b")]);
        let (state, steps) = converge(&old, &req, "0.1.0").unwrap();

        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].kind, StepKind::Run);
        assert_eq!(
            steps[0].meta.as_ref().map(|m| &m.config),
            Some(&json!({ "content": "b" }))
        );
        assert_eq!(
            state.entry("filebeat").unwrap().last_change,
            LastChange::Update
        );
    }

    #[test]
    fn vanished_program_is_removed_and_survivor_unchanged() {
        let old = resolved(vec![program("filebeat", "a"), program("metricbeat", "a")]);
        let req = request("gen-2", vec![program("metricbeat", "a")]);
        let (state, steps) = converge(&old, &req, "0.1.0").unwrap();

        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].kind, StepKind::Remove);
        assert_eq!(steps[0].process, "filebeat");
        assert!(steps[0].meta.is_none());
        assert!(state.entry("filebeat").is_none());
        assert_eq!(
            state.entry("metricbeat").unwrap().last_change,
            LastChange::Unchanged
        );
    }

    #[test]
    fn empty_request_removes_everything() {
        let old = resolved(vec![program("filebeat", "a"), program("metricbeat", "a")]);
        let req = request("gen-2", Vec::new());
        let (state, steps) = converge(&old, &req, "0.1.0").unwrap();

        assert_eq!(steps.len(), 2);
        assert!(steps.iter().all(|step| step.kind == StepKind::Remove));
        assert!(state.active.is_empty());
    }

    #[test]
    fn removals_sorted_then_runs_in_request_order() {
        let old = resolved(vec![
            program("winlogbeat", "a"),
            program("auditbeat", "a"),
            program("heartbeat", "a"),
        ]);
        // Two removals (auditbeat, winlogbeat) and two starts in the order
        // the request lists them (packetbeat before filebeat).
        let req = request(
            "gen-2",
            vec![
                program("packetbeat", "a"),
                program("filebeat", "a"),
                program("heartbeat", "a"),
            ],
        );
        let (_, steps) = converge(&old, &req, "0.1.0").unwrap();

        let sequence: Vec<(StepKind, &str)> = steps
            .iter()
            .map(|step| (step.kind, step.process.as_str()))
            .collect();
        assert_eq!(
            sequence,
            vec![
                (StepKind::Remove, "auditbeat"),
                (StepKind::Remove, "winlogbeat"),
                (StepKind::Run, "packetbeat"),
                (StepKind::Run, "filebeat"),
            ]
        );
    }

    #[test]
    fn repeated_invocation_is_deterministic() {
        let old = resolved(vec![program("filebeat", "a"), program("metricbeat", "a")]);
        let req = request(
            "gen-2",
            vec![program("heartbeat", "a"), program("filebeat", "b")],
        );
        let (state_a, steps_a) = converge(&old, &req, "0.1.0").unwrap();
        let (state_b, steps_b) = converge(&old, &req, "0.1.0").unwrap();

        assert_eq!(steps_a, steps_b);
        assert_eq!(
            serde_json::to_value(&state_a).unwrap(),
            serde_json::to_value(&state_b).unwrap()
        );
    }

    #[test]
    fn fresh_generation_id_with_identical_content_is_noop() {
        let old = resolved(vec![program("filebeat", "a")]);
        let req = Request::new(
            "gen-9",
            Utc.with_ymd_and_hms(2026, 8, 25, 13, 0, 0).unwrap(),
            vec![program("filebeat", "a")],
        );
        let (state, steps) = converge(&old, &req, "0.1.0").unwrap();

        assert!(steps.is_empty());
        assert_eq!(state.id, "gen-9");
        assert_eq!(
            state.entry("filebeat").unwrap().last_change,
            LastChange::Unchanged
        );
    }

    #[test]
    fn duplicate_identifiers_rejected() {
        let req = request(
            "gen-1",
            vec![program("filebeat", "a"), program("filebeat", "b")],
        );
        let err = converge(&FleetState::empty(), &req, "0.1.0").unwrap_err();
        assert_eq!(
            err,
            ResolveError::DuplicateProgram {
                request_id: "gen-1".to_owned(),
                identifier: "filebeat".to_owned(),
            }
        );
    }

    #[test]
    fn empty_request_id_rejected() {
        let req = request("   ", vec![program("filebeat", "a")]);
        let err = converge(&FleetState::empty(), &req, "0.1.0").unwrap_err();
        assert_eq!(err, ResolveError::EmptyRequestId);
    }

    #[test]
    fn unchanged_entry_keeps_original_timestamp() {
        let old = resolved(vec![program("filebeat", "a")]);
        let original = old.entry("filebeat").unwrap().last_modified;
        let later = Request::new(
            "gen-2",
            original + Duration::hours(1),
            vec![program("filebeat", "a")],
        );
        let (state, _) = converge(&old, &later, "0.1.0").unwrap();
        assert_eq!(state.entry("filebeat").unwrap().last_modified, original);
    }

    #[test]
    fn update_clamps_skewed_older_timestamp() {
        let old = resolved(vec![program("filebeat", "a")]);
        let original = old.entry("filebeat").unwrap().last_modified;
        let skewed = Request::new(
            "gen-2",
            original - Duration::hours(2),
            vec![program("filebeat", "b")],
        );
        let (state, steps) = converge(&old, &skewed, "0.1.0").unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(state.entry("filebeat").unwrap().last_modified, original);
    }

    #[test]
    fn map_keys_match_entry_identifiers() {
        let old = resolved(vec![program("filebeat", "a")]);
        let req = request(
            "gen-2",
            vec![program("filebeat", "b"), program("metricbeat", "a")],
        );
        let (state, _) = converge(&old, &req, "0.1.0").unwrap();
        for (key, entry) in &state.active {
            assert_eq!(key, &entry.identifier);
        }
    }

    #[test]
    fn steps_carry_supplied_version() {
        let req = request("gen-1", vec![program("filebeat", "a")]);
        let (_, steps) = converge(&FleetState::empty(), &req, "7.4.2").unwrap();
        assert_eq!(steps[0].version, "7.4.2");
    }
}
