use async_trait::async_trait;
use thiserror::Error;

/// Failures raised by an engine implementation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("runtime is not ready")]
    NotReady,

    #[error("runtime failed to initialize: {0}")]
    Initialization(String),

    #[error("invalid virtual path: {0}")]
    InvalidPath(String),

    #[error("failed to write {path}: {source}")]
    FileWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to launch {entry}: {source}")]
    Launch {
        entry: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Capability surface of the external compiler/runtime.
///
/// The orchestrator drives the engine exclusively through this trait, so a
/// scripted engine can stand in for the real one in tests.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Bring the runtime up. Returning `Ok` signals readiness.
    async fn initialize(&self) -> Result<(), EngineError>;

    /// Store `bytes` at `path` in the engine's virtual file store.
    async fn write_file(&self, path: &str, bytes: &[u8]) -> Result<(), EngineError>;

    /// Invoke `main` of `entry` with the given classpath and arguments.
    ///
    /// Used both for the compiler and for the compiled program. The returned
    /// future settles when the invoked `main` has finished.
    async fn run_main(&self, entry: &str, classpath: &str, args: &[String])
        -> Result<i32, EngineError>;

    /// Tell the engine where to paint graphical output.
    async fn attach_display(&self, _mount_point: &str) -> Result<(), EngineError> {
        Ok(())
    }
}
