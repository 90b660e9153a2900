//! Run orchestration against a scripted engine.

use async_trait::async_trait;
use playground_core::{
    ConsoleSink, CycleResult, Engine, EngineError, HeadlessDisplay, MemoryConsole, Orchestrator,
    PlaygroundConfig, RejectReason, RunOutcome, SourceBuffer,
};
use pretty_assertions::assert_eq;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Initialize,
    AttachDisplay(String),
    WriteFile {
        path: String,
        text: String,
    },
    RunMain {
        entry: String,
        classpath: String,
        args: Vec<String>,
    },
}

/// Engine that records every call and answers from a script.
#[derive(Default)]
struct ScriptedEngine {
    calls: Mutex<Vec<Call>>,
    init_failures: Mutex<VecDeque<String>>,
    write_failure: Option<String>,
    compile_exit: i32,
    compile_error: Option<String>,
    launch_error: Option<String>,
    hang_launch: bool,
    compile_gates: Mutex<VecDeque<Arc<Notify>>>,
    program_output: Option<Arc<MemoryConsole>>,
}

impl ScriptedEngine {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn compile_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::RunMain { entry, .. } if entry == "com.sun.tools.javac.Main"))
            .count()
    }

    fn launch_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::RunMain { entry, .. } if entry != "com.sun.tools.javac.Main" => Some(entry),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Engine for ScriptedEngine {
    async fn initialize(&self) -> Result<(), EngineError> {
        self.record(Call::Initialize);
        match self.init_failures.lock().unwrap().pop_front() {
            Some(message) => Err(EngineError::Initialization(message)),
            None => Ok(()),
        }
    }

    async fn write_file(&self, path: &str, bytes: &[u8]) -> Result<(), EngineError> {
        self.record(Call::WriteFile {
            path: path.to_string(),
            text: String::from_utf8_lossy(bytes).into_owned(),
        });
        match &self.write_failure {
            Some(message) => Err(EngineError::Other(anyhow::anyhow!(message.clone()))),
            None => Ok(()),
        }
    }

    async fn run_main(
        &self,
        entry: &str,
        classpath: &str,
        args: &[String],
    ) -> Result<i32, EngineError> {
        self.record(Call::RunMain {
            entry: entry.to_string(),
            classpath: classpath.to_string(),
            args: args.to_vec(),
        });

        if entry == "com.sun.tools.javac.Main" {
            let gate = self.compile_gates.lock().unwrap().pop_front();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            if let Some(message) = &self.compile_error {
                return Err(EngineError::Other(anyhow::anyhow!(message.clone())));
            }
            return Ok(self.compile_exit);
        }

        if let Some(message) = &self.launch_error {
            return Err(EngineError::Other(anyhow::anyhow!(message.clone())));
        }
        if self.hang_launch {
            std::future::pending::<()>().await;
        }
        if let Some(console) = &self.program_output {
            console.append_line("Hello, World!");
        }
        Ok(0)
    }

    async fn attach_display(&self, mount_point: &str) -> Result<(), EngineError> {
        self.record(Call::AttachDisplay(mount_point.to_string()));
        Ok(())
    }
}

struct Harness {
    engine: Arc<ScriptedEngine>,
    console: Arc<MemoryConsole>,
    display: Arc<HeadlessDisplay>,
    orch: Arc<Orchestrator>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn harness(engine: ScriptedEngine) -> Harness {
    harness_with(engine, PlaygroundConfig::default())
}

fn harness_with(mut engine: ScriptedEngine, config: PlaygroundConfig) -> Harness {
    init_tracing();
    let console = Arc::new(MemoryConsole::new());
    if engine.program_output.is_none() {
        engine.program_output = Some(Arc::clone(&console));
    }
    let engine = Arc::new(engine);
    let display = Arc::new(HeadlessDisplay::new("output"));
    let orch = Arc::new(Orchestrator::new(
        engine.clone(),
        console.clone(),
        display.clone(),
        SourceBuffer::default(),
        config,
    ));
    Harness {
        engine,
        console,
        display,
        orch,
    }
}

async fn ready(engine: ScriptedEngine) -> Harness {
    let h = harness(engine);
    h.orch.initialize().await.unwrap();
    h
}

#[tokio::test]
async fn test_hello_world_compiles_then_launches_main() {
    let h = ready(ScriptedEngine::default()).await;

    let outcome = h.orch.run().await;
    let run = outcome.run_id().unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Settled {
            run,
            result: CycleResult::Ran {
                entry_point: playground_core::EntryPointName::new(None, "Main"),
                exit_code: 0,
            },
        }
    );

    assert_eq!(
        h.engine.calls(),
        vec![
            Call::Initialize,
            Call::AttachDisplay("output".to_string()),
            Call::WriteFile {
                path: "/str/Main.java".to_string(),
                text: playground_core::DEFAULT_SOURCE.to_string(),
            },
            Call::RunMain {
                entry: "com.sun.tools.javac.Main".to_string(),
                classpath: "/app/tools.jar:/files/".to_string(),
                args: vec![
                    "/str/Main.java".to_string(),
                    "-d".to_string(),
                    "/files/".to_string()
                ],
            },
            Call::RunMain {
                entry: "Main".to_string(),
                classpath: "/app/tools.jar:/files/".to_string(),
                args: vec![],
            },
        ]
    );
    assert_eq!(h.console.contents(), "Hello, World!\n");
    assert!(!h.orch.is_busy());
}

#[tokio::test]
async fn test_packaged_class_is_launched_by_qualified_name() {
    let h = ready(ScriptedEngine::default()).await;
    h.orch
        .source()
        .set("package app.util; public class Launcher { public static void main(String[] a) {} }");

    h.orch.run().await;
    assert_eq!(h.engine.launch_calls(), vec!["app.util.Launcher"]);
}

#[tokio::test]
async fn test_entry_point_follows_latest_edit() {
    let h = ready(ScriptedEngine::default()).await;
    h.orch.run().await;

    h.orch
        .source()
        .set("package com.example;\npublic class Foo {}");
    h.orch.run().await;

    assert_eq!(h.engine.launch_calls(), vec!["Main", "com.example.Foo"]);
}

#[tokio::test]
async fn test_compile_failure_skips_launch() {
    let h = ready(ScriptedEngine {
        compile_exit: 1,
        ..Default::default()
    })
    .await;

    let outcome = h.orch.run().await;
    assert!(matches!(
        outcome,
        RunOutcome::Settled {
            result: CycleResult::CompileFailed { exit_code: 1 },
            ..
        }
    ));
    assert!(h.engine.launch_calls().is_empty());
    assert!(h.console.contents().contains("Compilation failed."));
    assert!(!h.orch.is_busy());
}

#[tokio::test]
async fn test_custom_failure_message() {
    let config = PlaygroundConfig {
        compile_failure_message: "Build broke.".to_string(),
        ..Default::default()
    };
    let h = harness_with(
        ScriptedEngine {
            compile_exit: 2,
            ..Default::default()
        },
        config,
    );
    h.orch.initialize().await.unwrap();
    h.orch.run().await;
    assert_eq!(h.console.contents(), "Build broke.\n");
}

#[tokio::test]
async fn test_write_error_is_reported_and_state_released() {
    let h = ready(ScriptedEngine {
        write_failure: Some("virtual fs full".to_string()),
        ..Default::default()
    })
    .await;

    let outcome = h.orch.run().await;
    assert!(matches!(
        outcome,
        RunOutcome::Settled {
            result: CycleResult::Errored { ref message },
            ..
        } if message == "virtual fs full"
    ));
    assert!(h.console.contents().contains("virtual fs full"));
    assert_eq!(h.engine.compile_calls(), 0);
    assert!(!h.orch.is_busy());
}

#[tokio::test]
async fn test_compiler_error_aborts_before_launch() {
    let h = ready(ScriptedEngine {
        compile_error: Some("compiler crashed".to_string()),
        ..Default::default()
    })
    .await;

    let outcome = h.orch.run().await;
    assert!(matches!(
        outcome,
        RunOutcome::Settled {
            result: CycleResult::Errored { ref message },
            ..
        } if message == "compiler crashed"
    ));
    assert_eq!(h.engine.compile_calls(), 1);
    assert!(h.engine.launch_calls().is_empty());
    assert_eq!(h.console.contents(), "compiler crashed\n");
    assert!(!h.orch.is_busy());
}

#[tokio::test]
async fn test_launch_error_is_reported_and_state_released() {
    let h = ready(ScriptedEngine {
        launch_error: Some("class not found: Main".to_string()),
        ..Default::default()
    })
    .await;

    let outcome = h.orch.run().await;
    assert!(matches!(
        outcome,
        RunOutcome::Settled {
            result: CycleResult::Errored { ref message },
            ..
        } if message == "class not found: Main"
    ));
    assert_eq!(h.engine.launch_calls(), vec!["Main"]);
    assert!(h.console.contents().contains("class not found: Main"));
    assert!(!h.orch.is_busy());

    // The next trigger is accepted again.
    assert!(matches!(h.orch.run().await, RunOutcome::Settled { .. }));
}

#[tokio::test]
async fn test_edit_during_compile_does_not_change_launched_class() {
    let gate = Arc::new(Notify::new());
    let engine = ScriptedEngine::default();
    engine.compile_gates.lock().unwrap().push_back(gate.clone());
    let h = ready(engine).await;

    let orch = Arc::clone(&h.orch);
    let run = tokio::spawn(async move { orch.run().await });
    while h.engine.compile_calls() == 0 {
        tokio::task::yield_now().await;
    }

    h.orch
        .source()
        .set("package app.util;\npublic class Launcher {}");
    gate.notify_one();

    assert!(matches!(
        run.await.unwrap(),
        RunOutcome::Settled {
            result: CycleResult::Ran { ref entry_point, .. },
            ..
        } if entry_point.qualified() == "Main"
    ));
    assert_eq!(h.engine.launch_calls(), vec!["Main"]);

    // The edit is picked up by the next run.
    h.orch.run().await;
    assert_eq!(h.engine.launch_calls(), vec!["Main", "app.util.Launcher"]);
}

#[tokio::test]
async fn test_rapid_double_trigger_runs_once() {
    let h = ready(ScriptedEngine::default()).await;

    let (first, second) = tokio::join!(h.orch.run(), h.orch.run());

    assert!(matches!(first, RunOutcome::Settled { .. }));
    assert_eq!(second, RunOutcome::Rejected(RejectReason::Busy));
    assert_eq!(h.engine.compile_calls(), 1);
    assert_eq!(h.engine.launch_calls().len(), 1);
    assert!(!h.orch.is_busy());
}

#[tokio::test]
async fn test_busy_while_compile_in_flight() {
    let gate = Arc::new(Notify::new());
    let engine = ScriptedEngine::default();
    engine.compile_gates.lock().unwrap().push_back(gate.clone());
    let h = ready(engine).await;

    let orch = Arc::clone(&h.orch);
    let first = tokio::spawn(async move { orch.run().await });
    while !h.orch.is_busy() {
        tokio::task::yield_now().await;
    }

    assert_eq!(h.orch.run().await, RunOutcome::Rejected(RejectReason::Busy));

    gate.notify_one();
    assert!(matches!(first.await.unwrap(), RunOutcome::Settled { .. }));
    assert_eq!(h.engine.compile_calls(), 1);
    assert!(!h.orch.is_busy());
}

#[tokio::test(start_paused = true)]
async fn test_watchdog_releases_hung_run() {
    let h = ready(ScriptedEngine {
        hang_launch: true,
        ..Default::default()
    })
    .await;

    let started = tokio::time::Instant::now();
    let outcome = h.orch.run().await;

    assert!(matches!(outcome, RunOutcome::TimedOut { .. }));
    assert!(started.elapsed() >= h.orch.config().watchdog());
    assert!(!h.orch.is_busy());
    assert_eq!(h.engine.launch_calls(), vec!["Main"]);
}

#[tokio::test(start_paused = true)]
async fn test_late_completion_does_not_release_newer_run() {
    let stuck = Arc::new(Notify::new());
    let held = Arc::new(Notify::new());
    let engine = ScriptedEngine::default();
    engine
        .compile_gates
        .lock()
        .unwrap()
        .extend([stuck.clone(), held.clone()]);
    let h = ready(engine).await;

    assert!(matches!(h.orch.run().await, RunOutcome::TimedOut { .. }));
    assert!(!h.orch.is_busy());

    let orch = Arc::clone(&h.orch);
    let second = tokio::spawn(async move { orch.run().await });
    while !h.orch.is_busy() {
        tokio::task::yield_now().await;
    }

    // The abandoned cycle finishes while the second run is in flight.
    stuck.notify_one();
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(h.engine.launch_calls(), vec!["Main"]);
    assert!(h.orch.is_busy());
    // Its output lands in the console the second run already cleared.
    assert_eq!(h.console.contents(), "Hello, World!\n");

    held.notify_one();
    assert!(matches!(
        second.await.unwrap(),
        RunOutcome::Settled {
            result: CycleResult::Ran { .. },
            ..
        }
    ));
    assert!(!h.orch.is_busy());
}

#[tokio::test]
async fn test_run_clears_previous_output() {
    let h = ready(ScriptedEngine::default()).await;
    h.console.append_line("left over from last run");

    h.orch.run().await;

    assert_eq!(h.console.contents(), "Hello, World!\n");
    assert_eq!(h.display.clear_count(), 1);
}

#[tokio::test]
async fn test_failed_initialize_keeps_run_disabled_until_retry() {
    let engine = ScriptedEngine::default();
    engine
        .init_failures
        .lock()
        .unwrap()
        .push_back("engine unavailable".to_string());
    let h = harness(engine);

    let err = h.orch.initialize().await.unwrap_err();
    assert!(matches!(err, EngineError::Initialization(_)));
    assert!(h
        .console
        .contents()
        .contains("Failed to initialize runtime: runtime failed to initialize: engine unavailable"));
    assert_eq!(
        h.orch.run().await,
        RunOutcome::Rejected(RejectReason::EngineNotReady)
    );
    assert_eq!(h.engine.compile_calls(), 0);

    h.orch.initialize().await.unwrap();
    assert!(h.orch.is_ready());
    assert!(matches!(h.orch.run().await, RunOutcome::Settled { .. }));
}
