//! ---
//! flt_section: "03-state-reconciliation"
//! flt_subsection: "module"
//! flt_type: "source"
//! flt_scope: "code"
//! flt_description: "Program-state reconciliation engine."
//! flt_version: "v0.0.0-prealpha"
//! flt_owner: "tbd"
//! ---
use flotilla_common::VersionInfo;
use flotilla_program::{ManagedProgram, Request};
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::converge::converge;
use crate::error::ResolveError;
use crate::state::FleetState;
use crate::step::Step;

#[derive(Debug)]
struct ResolverInner<P> {
    /// Bumped on every commit; commit handles check it to detect staleness.
    epoch: u64,
    current: FleetState<P>,
}

/// Owner of the single authoritative [`FleetState`] for an agent instance.
///
/// All reads and writes of the held state happen under one mutex, so at most
/// one convergence computation runs against a given state snapshot at a
/// time and callers observe a linear history of state transitions.
///
/// The commit discipline is ack-gated: [`Resolver::resolve`] computes the
/// new state and step list without mutating anything and hands back a
/// [`Resolution`]; the held state only advances when the caller commits it
/// after successfully applying every step. An uncommitted resolution can be
/// recomputed at will, which gives at-least-once step delivery with safe
/// retries.
#[derive(Debug)]
pub struct Resolver<P> {
    version: String,
    inner: Mutex<ResolverInner<P>>,
}

impl<P: ManagedProgram> Resolver<P> {
    /// Create a resolver with a pristine state, stamping `version` onto
    /// every emitted step.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            inner: Mutex::new(ResolverInner {
                epoch: 0,
                current: FleetState::empty(),
            }),
        }
    }

    /// Create a resolver stamped with this build's version metadata.
    pub fn from_build_metadata() -> Self {
        Self::new(VersionInfo::current().semver)
    }

    /// Version string stamped onto emitted steps.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Compute the steps that converge the held state onto `request`.
    ///
    /// The held state is not mutated. The returned [`Resolution`] carries a
    /// fresh generation id for correlation, the ordered step list, and the
    /// one-shot commit handle that installs the computed state.
    pub fn resolve(&self, request: &Request<P>) -> Result<Resolution<'_, P>, ResolveError> {
        let generation = Uuid::new_v4();
        let inner = self.inner.lock();
        debug!(
            %generation,
            request_id = request.id(),
            programs = request.programs().len(),
            active = inner.current.active.len(),
            "resolving desired state"
        );
        let (state, steps) = converge(&inner.current, request, &self.version)?;
        debug!(%generation, steps = steps.len(), "convergence computed");
        Ok(Resolution {
            generation,
            steps,
            handle: CommitHandle {
                resolver: self,
                observed_epoch: inner.epoch,
                generation,
                state,
            },
        })
    }

    /// Resolve and immediately commit, for callers that apply steps
    /// synchronously and do not need retry safety.
    pub fn resolve_and_commit(
        &self,
        request: &Request<P>,
    ) -> Result<(Uuid, Vec<Step>), ResolveError> {
        let generation = Uuid::new_v4();
        let mut inner = self.inner.lock();
        let (state, steps) = converge(&inner.current, request, &self.version)?;
        inner.epoch += 1;
        info!(
            %generation,
            state_id = %state.id,
            active = state.active.len(),
            steps = steps.len(),
            "fleet state committed"
        );
        inner.current = state;
        Ok((generation, steps))
    }

    /// Snapshot of the currently held state, for diagnostics.
    pub fn current_state(&self) -> FleetState<P> {
        self.inner.lock().current.clone()
    }
}

/// Outcome of one resolve call under the ack-gated discipline.
#[must_use = "dropping a resolution without committing leaves the held state unchanged"]
#[derive(Debug)]
pub struct Resolution<'a, P: ManagedProgram> {
    generation: Uuid,
    steps: Vec<Step>,
    handle: CommitHandle<'a, P>,
}

impl<'a, P: ManagedProgram> Resolution<'a, P> {
    /// Generation id for correlating this resolution in logs.
    pub fn generation(&self) -> Uuid {
        self.generation
    }

    /// Lifecycle steps to hand to the process supervisor, in order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Split into steps and the commit handle, for callers that apply steps
    /// asynchronously before acknowledging.
    pub fn into_parts(self) -> (Uuid, Vec<Step>, CommitHandle<'a, P>) {
        (self.generation, self.steps, self.handle)
    }

    /// Acknowledge that every step was applied and install the new state.
    pub fn commit(self) -> Result<(), ResolveError> {
        self.handle.commit()
    }
}

/// One-shot handle that installs the state computed by a resolve call.
///
/// Consumed by value, so committing twice or committing a handle paired
/// with a different request does not compile. The only runtime misuse left
/// is committing after another resolution already advanced the state, which
/// fails with [`ResolveError::StaleCommit`].
#[derive(Debug)]
pub struct CommitHandle<'a, P: ManagedProgram> {
    resolver: &'a Resolver<P>,
    observed_epoch: u64,
    generation: Uuid,
    state: FleetState<P>,
}

impl<P: ManagedProgram> CommitHandle<'_, P> {
    /// Install the computed state, unless the held state has moved on.
    pub fn commit(self) -> Result<(), ResolveError> {
        let mut inner = self.resolver.inner.lock();
        if inner.epoch != self.observed_epoch {
            warn!(
                generation = %self.generation,
                expected = self.observed_epoch,
                found = inner.epoch,
                "discarding stale commit"
            );
            return Err(ResolveError::StaleCommit {
                expected: self.observed_epoch,
                found: inner.epoch,
            });
        }
        inner.epoch += 1;
        info!(
            generation = %self.generation,
            state_id = %self.state.id,
            active = self.state.active.len(),
            "fleet state committed"
        );
        inner.current = self.state;
        Ok(())
    }
}
