use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of one accepted run cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Qualified name of the class whose `main` is launched after compilation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPointName {
    /// Dotted package name, if the source declared one.
    pub package: Option<String>,
    pub class: String,
}

impl EntryPointName {
    pub fn new(package: Option<String>, class: impl Into<String>) -> Self {
        Self {
            package,
            class: class.into(),
        }
    }

    /// The name handed to the engine's launch call.
    pub fn qualified(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for EntryPointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.package {
            Some(package) => write!(f, "{package}.{}", self.class),
            None => f.write_str(&self.class),
        }
    }
}

/// Why a run trigger was turned away without starting a cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Another cycle is in flight.
    Busy,
    /// The engine has not signaled readiness.
    EngineNotReady,
}

/// How a cycle that actually ran came to rest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleResult {
    /// Compilation succeeded and the program was launched.
    Ran {
        entry_point: EntryPointName,
        exit_code: i32,
    },
    /// The compiler returned a non-zero exit code; nothing was launched.
    CompileFailed { exit_code: i32 },
    /// The engine raised an error during write, compile or launch.
    Errored { message: String },
}

/// Result of one call to [`crate::Orchestrator::run`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    Rejected(RejectReason),
    Settled { run: RunId, result: CycleResult },
    /// The watchdog released the run state before the cycle settled.
    TimedOut { run: RunId },
}

impl RunOutcome {
    pub fn run_id(&self) -> Option<RunId> {
        match self {
            RunOutcome::Rejected(_) => None,
            RunOutcome::Settled { run, .. } | RunOutcome::TimedOut { run } => Some(*run),
        }
    }
}
