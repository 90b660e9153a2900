//! Playground core: entry-point resolution and run orchestration.
//!
//! The editor writes into a [`SourceBuffer`]; a run trigger asks the
//! [`Orchestrator`] to write the source into the external engine, compile it,
//! and launch the resolved entry point. All substantive work happens behind
//! the [`Engine`] trait.

pub mod config;
pub mod console;
pub mod engine;
pub mod orchestrator;
pub mod resolver;
pub mod source;
pub mod state;
pub mod types;

pub use config::{ConfigError, PlaygroundConfig};
pub use console::{ConsoleSink, DisplaySurface, HeadlessDisplay, MemoryConsole};
pub use engine::{Engine, EngineError};
pub use orchestrator::Orchestrator;
pub use resolver::{resolve_entry_point, EntryPointResolver};
pub use source::{SourceBuffer, DEFAULT_SOURCE};
pub use state::{transition, Controller, RunEvent, RunState, TransitionError};
pub use types::{CycleResult, EntryPointName, RejectReason, RunId, RunOutcome};
