use serde::Deserialize;
use std::path::PathBuf;

/// Local JDK engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct JdkConfig {
    /// `java` launcher. Falls back to `$JAVA_HOME/bin/java`, then `java` on PATH.
    pub java_bin: Option<PathBuf>,
    /// Directory backing the virtual filesystem. A temp dir when unset.
    pub scratch_root: Option<PathBuf>,
    /// Virtual directories created on initialize (compiler output).
    pub output_dirs: Vec<String>,
}

impl Default for JdkConfig {
    fn default() -> Self {
        Self {
            java_bin: None,
            scratch_root: None,
            output_dirs: vec!["/files/".to_string()],
        }
    }
}

impl JdkConfig {
    pub fn java_bin(&self) -> PathBuf {
        if let Some(bin) = &self.java_bin {
            return bin.clone();
        }
        match std::env::var_os("JAVA_HOME") {
            Some(home) if !home.is_empty() => PathBuf::from(home).join("bin").join("java"),
            _ => PathBuf::from("java"),
        }
    }
}
