use std::time::Instant;

use thiserror::Error;
use uuid::Uuid;

/// Phases a scoring session can be in.
///
/// A save in flight is represented by a pending [`Plan`] targeting
/// [`SessionPhase::Saved`] rather than by a phase of its own, so an aborted
/// save lands back exactly where it started with the draft intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Judges, roster, and any persisted scores are being fetched.
    Loading,
    /// Draft is live: score updates and manual edits mutate it freely.
    Ready,
    /// The draft has been persisted at least once and is still editable.
    Saved,
    /// The persisted record is locked; every mutation entry point is disabled.
    Locked,
}

/// Events that can be applied to the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Judges, players, and persisted scores finished loading.
    RosterLoaded,
    /// An explicit save was requested.
    Save,
    /// A fetch reported the persisted record as locked.
    LockObserved,
    /// An admin lifted the lock.
    Unlock,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: SessionPhase,
    /// The event that cannot be applied from this phase.
    pub event: SessionEvent,
}

/// Errors that can occur when planning a state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A transition is already pending and must be applied or aborted.
    AlreadyPending,
    /// The requested transition is not valid from the current phase.
    InvalidTransition(InvalidTransition),
}

/// Errors that can occur when applying a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
    /// State machine phase changed since the plan was created.
    PhaseMismatch {
        /// Phase when plan was created.
        expected: SessionPhase,
        /// Current phase.
        actual: SessionPhase,
    },
    /// State machine version changed since the plan was created.
    VersionMismatch {
        /// Version when plan was created.
        expected: usize,
        /// Current version.
        actual: usize,
    },
}

/// Errors that can occur when aborting a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Unique identifier for a planned state transition.
pub type PlanId = Uuid;

/// A planned state machine transition that has been validated but not yet applied.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// Phase the state machine is currently in.
    pub from: SessionPhase,
    /// Phase the state machine will transition to.
    pub to: SessionPhase,
    /// Event that triggered this transition.
    pub event: SessionEvent,
    /// Version number after applying this transition.
    pub version_next: usize,
    /// Timestamp when this plan was created.
    pub pending_since: Instant,
}

/// Snapshot of the current state machine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Current phase of the state machine.
    pub phase: SessionPhase,
    /// Version number of the state machine (increments on each transition).
    pub version: usize,
    /// Pending transition phase, if a transition is planned but not yet applied.
    pub pending: Option<SessionPhase>,
}

/// State machine implementing the scoring session flow.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    phase: SessionPhase,
    version: usize,
    pending: Option<Plan>,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Loading,
            version: 0,
            pending: None,
        }
    }
}

impl SessionStateMachine {
    /// Create a new state machine initialised in the loading state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Whether the session accepts draft mutations in its current phase.
    pub fn accepts_mutations(&self) -> bool {
        !matches!(self.phase, SessionPhase::Locked)
    }

    /// Create a snapshot of the current state machine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            version: self.version,
            pending: self.pending.as_ref().map(|plan| plan.to),
        }
    }

    /// Plan a transition by validating that the event can be applied from the current phase.
    /// Returns a Plan that can later be applied or aborted.
    pub fn plan(&mut self, event: SessionEvent) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let next = self
            .compute_transition(event)
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.phase,
            to: next,
            event,
            version_next: self.version + 1,
            pending_since: Instant::now(),
        };

        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Apply a planned transition, moving the state machine to the next phase.
    /// Returns the new phase after the transition.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<SessionPhase, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected_plan_id = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected: expected_plan_id,
                got: plan_id,
            });
        }

        if self.phase != plan.from {
            return Err(ApplyError::PhaseMismatch {
                expected: plan.from,
                actual: self.phase,
            });
        }

        if self.version + 1 != plan.version_next {
            return Err(ApplyError::VersionMismatch {
                expected: plan.version_next,
                actual: self.version + 1,
            });
        }

        self.phase = plan.to;
        self.version = plan.version_next;
        self.pending = None;

        Ok(self.phase)
    }

    /// Abort a planned transition without applying it, returning the state machine to its previous state.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    /// Plan and immediately apply a transition that involves no async work.
    pub fn transition(&mut self, event: SessionEvent) -> Result<SessionPhase, PlanError> {
        let plan = self.plan(event)?;
        // Applying a freshly created plan cannot fail.
        Ok(self.apply(plan.id).unwrap_or(self.phase))
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (SessionPhase::Loading, SessionEvent::RosterLoaded) => SessionPhase::Ready,
            (SessionPhase::Ready | SessionPhase::Saved, SessionEvent::Save) => SessionPhase::Saved,
            (
                SessionPhase::Loading | SessionPhase::Ready | SessionPhase::Saved,
                SessionEvent::LockObserved,
            ) => SessionPhase::Locked,
            // Re-observing the lock is a harmless refresh.
            (SessionPhase::Locked, SessionEvent::LockObserved) => SessionPhase::Locked,
            (SessionPhase::Locked, SessionEvent::Unlock) => SessionPhase::Ready,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut SessionStateMachine, event: SessionEvent) -> SessionPhase {
        let plan = sm.plan(event).unwrap();
        sm.apply(plan.id).unwrap()
    }

    #[test]
    fn initial_state_is_loading() {
        let sm = SessionStateMachine::new();
        assert_eq!(sm.phase(), SessionPhase::Loading);
    }

    #[test]
    fn full_happy_path_through_a_session() {
        let mut sm = SessionStateMachine::new();

        assert_eq!(apply(&mut sm, SessionEvent::RosterLoaded), SessionPhase::Ready);
        assert_eq!(apply(&mut sm, SessionEvent::Save), SessionPhase::Saved);
        // Scores keep flowing after a save; a re-save is always possible.
        assert_eq!(apply(&mut sm, SessionEvent::Save), SessionPhase::Saved);
        assert_eq!(apply(&mut sm, SessionEvent::LockObserved), SessionPhase::Locked);
        assert_eq!(apply(&mut sm, SessionEvent::Unlock), SessionPhase::Ready);
    }

    #[test]
    fn loading_session_can_observe_a_lock_directly() {
        let mut sm = SessionStateMachine::new();
        assert_eq!(apply(&mut sm, SessionEvent::LockObserved), SessionPhase::Locked);
        assert!(!sm.accepts_mutations());
    }

    #[test]
    fn save_is_not_valid_before_loading_completes() {
        let mut sm = SessionStateMachine::new();
        let err = sm.plan(SessionEvent::Save).unwrap_err();
        match err {
            PlanError::InvalidTransition(invalid) => {
                assert_eq!(invalid.from, SessionPhase::Loading);
                assert_eq!(invalid.event, SessionEvent::Save);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn locked_sessions_reject_saves_until_unlocked() {
        let mut sm = SessionStateMachine::new();
        apply(&mut sm, SessionEvent::RosterLoaded);
        apply(&mut sm, SessionEvent::LockObserved);

        assert!(sm.plan(SessionEvent::Save).is_err());

        apply(&mut sm, SessionEvent::Unlock);
        assert_eq!(apply(&mut sm, SessionEvent::Save), SessionPhase::Saved);
    }

    #[test]
    fn aborted_save_leaves_the_phase_untouched() {
        let mut sm = SessionStateMachine::new();
        apply(&mut sm, SessionEvent::RosterLoaded);

        let plan = sm.plan(SessionEvent::Save).unwrap();
        assert_eq!(sm.snapshot().pending, Some(SessionPhase::Saved));

        sm.abort(plan.id).unwrap();
        assert_eq!(sm.phase(), SessionPhase::Ready);
        assert_eq!(sm.snapshot().pending, None);
    }

    #[test]
    fn pending_plans_are_exclusive() {
        let mut sm = SessionStateMachine::new();
        let _plan = sm.plan(SessionEvent::RosterLoaded).unwrap();
        assert_eq!(
            sm.plan(SessionEvent::RosterLoaded).unwrap_err(),
            PlanError::AlreadyPending
        );
    }
}
