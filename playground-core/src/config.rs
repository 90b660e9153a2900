//! Playground configuration
//!
//! Every field has a default matching the fixed paths the bundled compiler
//! archive expects, so an empty YAML document is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding [`PlaygroundConfig::watchdog_ms`].
pub const WATCHDOG_ENV: &str = "PLAYGROUND_WATCHDOG_MS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaygroundConfig {
    /// Virtual path the current source is written to before compiling.
    pub source_path: String,
    /// Main class of the compiler inside the bundled archive.
    pub compiler_entry: String,
    /// Classpath shared by the compile and launch calls.
    pub classpath: String,
    /// Directory the compiler writes class files into.
    pub output_dir: String,
    /// Launched when the source declares no public class.
    pub fallback_entry: String,
    /// Console line written when the compiler exits non-zero.
    pub compile_failure_message: String,
    /// Upper bound on one run cycle before the run state is forced idle.
    pub watchdog_ms: u64,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            source_path: "/str/Main.java".to_string(),
            compiler_entry: "com.sun.tools.javac.Main".to_string(),
            classpath: "/app/tools.jar:/files/".to_string(),
            output_dir: "/files/".to_string(),
            fallback_entry: crate::resolver::FALLBACK_ENTRY.to_string(),
            compile_failure_message: "Compilation failed.".to_string(),
            watchdog_ms: 10_000,
        }
    }
}

impl PlaygroundConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to an empty map.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: PlaygroundConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `PLAYGROUND_WATCHDOG_MS` if set.
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(raw) = std::env::var(WATCHDOG_ENV) {
            self.watchdog_ms = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("{WATCHDOG_ENV}={raw:?}")))?;
            self.validate()?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("source_path", &self.source_path),
            ("compiler_entry", &self.compiler_entry),
            ("classpath", &self.classpath),
            ("output_dir", &self.output_dir),
            ("fallback_entry", &self.fallback_entry),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{name} must not be empty")));
            }
        }
        if self.watchdog_ms == 0 {
            return Err(ConfigError::Invalid(
                "watchdog_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn watchdog(&self) -> Duration {
        Duration::from_millis(self.watchdog_ms)
    }

    /// Arguments handed to the compiler entry point.
    pub fn compiler_args(&self) -> Vec<String> {
        vec![
            self.source_path.clone(),
            "-d".to_string(),
            self.output_dir.clone(),
        ]
    }
}
