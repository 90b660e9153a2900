//! Run state machine
//!
//! `idle --[trigger, engine ready]--> busy --[settled | watchdog]--> idle`
//!
//! Transitions are pure functions of the current [`Controller`] and a
//! [`RunEvent`], so they can be exercised without an engine or a surface.

use crate::types::{RejectReason, RunId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Execution status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    #[default]
    Idle,
    Busy { run: RunId },
}

impl RunState {
    pub fn is_busy(&self) -> bool {
        matches!(self, RunState::Busy { .. })
    }
}

/// Run state plus engine readiness.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controller {
    pub ready: bool,
    pub run: RunState,
}

/// Inputs to the state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunEvent {
    EngineReady,
    EngineFailed,
    /// User asked for a run; `run` is the id the cycle will carry.
    Trigger { run: RunId },
    /// The cycle's own future completed, successfully or not.
    Settled { run: RunId },
    /// The watchdog fired before the cycle settled.
    WatchdogExpired { run: RunId },
}

/// Error types for invalid transitions
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransitionError {
    #[error("a run is already in progress ({0})")]
    Busy(RunId),

    #[error("runtime has not signaled readiness")]
    EngineNotReady,

    #[error("event for run {got} does not match active run {active}")]
    StaleRun { active: RunId, got: RunId },

    #[error("no run is in progress")]
    NotRunning,
}

impl TransitionError {
    /// Rejection reported to the caller of a trigger, if this error is one.
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            TransitionError::Busy(_) => Some(RejectReason::Busy),
            TransitionError::EngineNotReady => Some(RejectReason::EngineNotReady),
            TransitionError::StaleRun { .. } | TransitionError::NotRunning => None,
        }
    }
}

/// Result type for state transitions
pub type TransitionResult<T> = Result<T, TransitionError>;

/// Compute the next state for `event`.
pub fn transition(current: &Controller, event: RunEvent) -> TransitionResult<Controller> {
    match event {
        RunEvent::EngineReady => Ok(Controller {
            ready: true,
            ..*current
        }),
        RunEvent::EngineFailed => Ok(Controller {
            ready: false,
            ..*current
        }),
        RunEvent::Trigger { run } => match current.run {
            RunState::Busy { run: active } => Err(TransitionError::Busy(active)),
            RunState::Idle if !current.ready => Err(TransitionError::EngineNotReady),
            RunState::Idle => Ok(Controller {
                run: RunState::Busy { run },
                ..*current
            }),
        },
        RunEvent::Settled { run } | RunEvent::WatchdogExpired { run } => match current.run {
            RunState::Busy { run: active } if active == run => Ok(Controller {
                run: RunState::Idle,
                ..*current
            }),
            RunState::Busy { run: active } => Err(TransitionError::StaleRun { active, got: run }),
            RunState::Idle => Err(TransitionError::NotRunning),
        },
    }
}
