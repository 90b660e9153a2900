use crate::config::JdkConfig;
use crate::paths::VirtualRoot;
use async_trait::async_trait;
use playground_core::{ConsoleSink, Engine, EngineError};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Engine that compiles and runs programs with a local `java` launcher.
///
/// Program and compiler output is streamed line by line into the console
/// sink as it is produced. There is no graphical display.
pub struct JdkEngine {
    java: PathBuf,
    root: VirtualRoot,
    output_dirs: Vec<String>,
    console: Arc<dyn ConsoleSink>,
    // Keeps the temp scratch root alive for the engine's lifetime.
    _scratch: Option<TempDir>,
}

impl JdkEngine {
    pub fn new(config: JdkConfig, console: Arc<dyn ConsoleSink>) -> Result<Self, EngineError> {
        let java = config.java_bin();
        let (root, scratch) = match config.scratch_root {
            Some(path) => (VirtualRoot::new(path), None),
            None => {
                let dir = tempfile::Builder::new().prefix("playground-").tempdir()?;
                (VirtualRoot::new(dir.path()), Some(dir))
            }
        };

        Ok(Self {
            java,
            root,
            output_dirs: config.output_dirs,
            console,
            _scratch: scratch,
        })
    }

    pub fn root(&self) -> &VirtualRoot {
        &self.root
    }
}

#[async_trait]
impl Engine for JdkEngine {
    async fn initialize(&self) -> Result<(), EngineError> {
        tokio::fs::create_dir_all(self.root.path()).await?;
        for dir in &self.output_dirs {
            tokio::fs::create_dir_all(self.root.map(dir)?).await?;
        }

        let output = Command::new(&self.java)
            .arg("-version")
            .output()
            .await
            .map_err(|e| {
                EngineError::Initialization(format!("cannot start {}: {e}", self.java.display()))
            })?;

        // `java -version` reports on stderr.
        let banner = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(EngineError::Initialization(format!(
                "{} -version exited with {}: {}",
                self.java.display(),
                output.status.code().unwrap_or(-1),
                banner.lines().last().unwrap_or("no output")
            )));
        }

        info!(
            java = %self.java.display(),
            root = %self.root.path().display(),
            version = banner.lines().next().unwrap_or("unknown"),
            "JDK engine ready"
        );
        Ok(())
    }

    async fn write_file(&self, path: &str, bytes: &[u8]) -> Result<(), EngineError> {
        let target = self.root.map(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| EngineError::FileWrite {
                    path: path.to_string(),
                    source,
                })?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|source| EngineError::FileWrite {
                path: path.to_string(),
                source,
            })?;
        debug!(path, host = %target.display(), len = bytes.len(), "Wrote virtual file");
        Ok(())
    }

    async fn run_main(
        &self,
        entry: &str,
        classpath: &str,
        args: &[String],
    ) -> Result<i32, EngineError> {
        let classpath = self.root.map_classpath(classpath)?;
        let args = self.root.map_args(args)?;

        debug!(entry, ?args, "Spawning java");
        let mut child = Command::new(&self.java)
            .arg("-cp")
            .arg(&classpath)
            .arg(entry)
            .args(&args)
            .current_dir(self.root.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| EngineError::Launch {
                entry: entry.to_string(),
                source,
            })?;

        let stdout = pump(child.stdout.take(), Arc::clone(&self.console));
        let stderr = pump(child.stderr.take(), Arc::clone(&self.console));
        let (status, _, _) = tokio::join!(child.wait(), stdout, stderr);
        let status = status?;

        // Killed by a signal: no exit code.
        let code = status.code().unwrap_or(-1);
        debug!(entry, code, "java exited");
        Ok(code)
    }

    async fn attach_display(&self, mount_point: &str) -> Result<(), EngineError> {
        debug!(mount_point, "Headless engine, display not attached");
        Ok(())
    }
}

/// Stream `reader` into the console line by line. Bytes that are not valid
/// UTF-8 are replaced rather than ending the stream.
async fn pump<R>(reader: Option<R>, console: Arc<dyn ConsoleSink>)
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return;
    };
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
                let line = line.strip_suffix(b"\r").unwrap_or(line);
                console.append_line(&String::from_utf8_lossy(line));
            }
            Err(e) => {
                warn!(error = %e, "Failed to read program output");
                break;
            }
        }
    }
}
