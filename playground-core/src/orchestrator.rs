//! Run orchestration
//!
//! One run cycle writes the current source into the engine, compiles it,
//! and launches the resolved entry point when compilation succeeds. Cycles
//! never overlap: the busy check-and-set happens under a lock with no await
//! in between.
//!
//! The cycle runs on its own task and is supervised by a watchdog. If the
//! watchdog fires first the run state is forced idle and the cycle is left
//! to finish on its own; the engine offers no way to abort in-flight work.
//! The watchdog is a heuristic bound, not a completion signal.
//!
//! An abandoned cycle keeps its console handle. Whatever it writes after the
//! watchdog fired (program output, the compile failure line, an error
//! message) lands in the console of whichever run is current, after that
//! run has cleared it.
//!
//! The entry point is resolved from the source snapshot taken when the run
//! was accepted, so edits made while compiling take effect on the next run.

use crate::config::PlaygroundConfig;
use crate::console::{ConsoleSink, DisplaySurface};
use crate::engine::{Engine, EngineError};
use crate::resolver::EntryPointResolver;
use crate::source::SourceBuffer;
use crate::state::{transition, Controller, RunEvent, RunState, TransitionResult};
use crate::types::{CycleResult, RejectReason, RunId, RunOutcome};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info, warn};

pub struct Orchestrator {
    engine: Arc<dyn Engine>,
    console: Arc<dyn ConsoleSink>,
    display: Arc<dyn DisplaySurface>,
    source: SourceBuffer,
    config: Arc<PlaygroundConfig>,
    resolver: EntryPointResolver,
    controller: Arc<Mutex<Controller>>,
}

impl Orchestrator {
    pub fn new(
        engine: Arc<dyn Engine>,
        console: Arc<dyn ConsoleSink>,
        display: Arc<dyn DisplaySurface>,
        source: SourceBuffer,
        config: PlaygroundConfig,
    ) -> Self {
        let resolver = EntryPointResolver::new(config.fallback_entry.clone());
        Self {
            engine,
            console,
            display,
            source,
            config: Arc::new(config),
            resolver,
            controller: Arc::new(Mutex::new(Controller::default())),
        }
    }

    pub fn source(&self) -> &SourceBuffer {
        &self.source
    }

    pub fn config(&self) -> &PlaygroundConfig {
        &self.config
    }

    pub fn state(&self) -> Controller {
        *lock(&self.controller)
    }

    pub fn is_busy(&self) -> bool {
        self.state().run.is_busy()
    }

    pub fn is_ready(&self) -> bool {
        self.state().ready
    }

    /// Bring the engine up and attach the display.
    ///
    /// On failure the error is written to the console and run stays
    /// disabled; calling again after the cause is fixed enables it.
    pub async fn initialize(&self) -> Result<(), EngineError> {
        let result = match self.engine.initialize().await {
            Ok(()) => self.engine.attach_display(self.display.mount_point()).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                apply(&self.controller, RunEvent::EngineReady).ok();
                info!(mount = self.display.mount_point(), "Runtime ready");
                Ok(())
            }
            Err(e) => {
                apply(&self.controller, RunEvent::EngineFailed).ok();
                error!(error = %e, "Runtime initialization failed");
                self.console
                    .append_line(&format!("Failed to initialize runtime: {e}"));
                Err(e)
            }
        }
    }

    /// Run one compile-and-launch cycle on the current source.
    ///
    /// Returns immediately with [`RunOutcome::Rejected`] if a cycle is in
    /// flight or the engine is not ready. Otherwise resolves once the cycle
    /// settles or the watchdog fires, whichever comes first. Dropping the
    /// returned future does not leave the state busy.
    pub async fn run(&self) -> RunOutcome {
        let run = RunId::new();
        if let Err(e) = apply(&self.controller, RunEvent::Trigger { run }) {
            warn!(reason = %e, "Run rejected");
            return RunOutcome::Rejected(e.reject_reason().unwrap_or(RejectReason::Busy));
        }
        info!(run = %run, "Run started");

        self.console.clear();
        self.display.clear();

        let cycle = Cycle {
            run,
            engine: Arc::clone(&self.engine),
            console: Arc::clone(&self.console),
            config: Arc::clone(&self.config),
            resolver: self.resolver.clone(),
            source: self.source.current(),
        };
        let controller = Arc::clone(&self.controller);
        let console = Arc::clone(&self.console);
        let watchdog = self.config.watchdog();

        let supervisor = tokio::spawn(async move {
            let mut task = tokio::spawn(cycle.execute());
            let outcome = tokio::select! {
                joined = &mut task => {
                    let result = joined.unwrap_or_else(|e| {
                        error!(run = %run, error = %e, "Run cycle aborted");
                        console.append_line(&e.to_string());
                        CycleResult::Errored { message: e.to_string() }
                    });
                    RunOutcome::Settled { run, result }
                }
                _ = tokio::time::sleep(watchdog) => {
                    warn!(run = %run, ?watchdog, "Watchdog expired, releasing run state");
                    RunOutcome::TimedOut { run }
                }
            };
            finish(&controller, &outcome, run);
            outcome
        });

        match supervisor.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(run = %run, error = %e, "Run supervisor failed");
                apply(&self.controller, RunEvent::Settled { run }).ok();
                RunOutcome::Settled {
                    run,
                    result: CycleResult::Errored {
                        message: e.to_string(),
                    },
                }
            }
        }
    }
}

/// Everything one cycle needs, detached from the orchestrator.
struct Cycle {
    run: RunId,
    engine: Arc<dyn Engine>,
    console: Arc<dyn ConsoleSink>,
    config: Arc<PlaygroundConfig>,
    resolver: EntryPointResolver,
    source: String,
}

impl Cycle {
    async fn execute(self) -> CycleResult {
        match self.compile_and_launch().await {
            Ok(result) => result,
            Err(e) => {
                error!(run = %self.run, error = %e, "Run cycle failed");
                let message = e.to_string();
                self.console.append_line(&message);
                CycleResult::Errored { message }
            }
        }
    }

    async fn compile_and_launch(&self) -> Result<CycleResult, EngineError> {
        let config = &self.config;

        debug!(run = %self.run, path = %config.source_path, "Writing source");
        self.engine
            .write_file(&config.source_path, self.source.as_bytes())
            .await?;

        debug!(run = %self.run, entry = %config.compiler_entry, "Compiling");
        let exit_code = self
            .engine
            .run_main(
                &config.compiler_entry,
                &config.classpath,
                &config.compiler_args(),
            )
            .await?;

        if exit_code != 0 {
            warn!(run = %self.run, exit_code, "Compilation failed");
            self.console.append_line(&config.compile_failure_message);
            return Ok(CycleResult::CompileFailed { exit_code });
        }

        // Resolved from the same snapshot that was compiled.
        let entry_point = self.resolver.resolve(&self.source);
        debug!(run = %self.run, entry = %entry_point, "Launching");
        let exit_code = self
            .engine
            .run_main(&entry_point.qualified(), &config.classpath, &[])
            .await?;

        info!(run = %self.run, entry = %entry_point, exit_code, "Program finished");
        Ok(CycleResult::Ran {
            entry_point,
            exit_code,
        })
    }
}

fn lock(controller: &Mutex<Controller>) -> std::sync::MutexGuard<'_, Controller> {
    controller.lock().unwrap_or_else(PoisonError::into_inner)
}

fn apply(controller: &Mutex<Controller>, event: RunEvent) -> TransitionResult<Controller> {
    let mut guard = lock(controller);
    let next = transition(&guard, event)?;
    debug!(?event, from = ?guard.run, to = ?next.run, "Run state transition");
    *guard = next;
    Ok(next)
}

fn finish(controller: &Mutex<Controller>, outcome: &RunOutcome, run: RunId) {
    let event = match outcome {
        RunOutcome::TimedOut { .. } => RunEvent::WatchdogExpired { run },
        _ => RunEvent::Settled { run },
    };
    if let Err(e) = apply(controller, event) {
        debug!(run = %run, reason = %e, "Ignoring stale completion");
    }
    debug_assert!(!matches!(lock(controller).run, RunState::Busy { run: active } if active == run));
}
