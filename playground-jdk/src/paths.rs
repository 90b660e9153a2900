//! Mapping of the engine's virtual file store onto a scratch directory.

use playground_core::EngineError;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

/// Classpath separator used in virtual classpaths.
pub const VIRTUAL_SEPARATOR: char = ':';

/// Scratch directory standing in for the virtual filesystem root.
#[derive(Debug, Clone)]
pub struct VirtualRoot {
    root: PathBuf,
}

impl VirtualRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Map an absolute virtual path under the root. Parent components are
    /// refused so nothing escapes the scratch directory.
    pub fn map(&self, virtual_path: &str) -> Result<PathBuf, EngineError> {
        if !virtual_path.starts_with('/') {
            return Err(EngineError::InvalidPath(virtual_path.to_string()));
        }

        let mut mapped = self.root.clone();
        for component in Path::new(virtual_path).components() {
            match component {
                Component::RootDir | Component::CurDir => {}
                Component::Normal(part) => mapped.push(part),
                Component::ParentDir | Component::Prefix(_) => {
                    return Err(EngineError::InvalidPath(virtual_path.to_string()))
                }
            }
        }
        Ok(mapped)
    }

    /// Map a `:`-separated virtual classpath to a host classpath.
    pub fn map_classpath(&self, classpath: &str) -> Result<OsString, EngineError> {
        let entries = classpath
            .split(VIRTUAL_SEPARATOR)
            .filter(|entry| !entry.is_empty())
            .map(|entry| self.map(entry))
            .collect::<Result<Vec<_>, _>>()?;

        std::env::join_paths(entries)
            .map_err(|e| EngineError::InvalidPath(format!("{classpath}: {e}")))
    }

    /// Arguments that look like absolute virtual paths are mapped; the rest
    /// pass through untouched.
    pub fn map_args(&self, args: &[String]) -> Result<Vec<OsString>, EngineError> {
        args.iter()
            .map(|arg| {
                if arg.starts_with('/') {
                    self.map(arg).map(PathBuf::into_os_string)
                } else {
                    Ok(OsString::from(arg))
                }
            })
            .collect()
    }
}
