//! Output sinks the orchestrator writes to.
//!
//! Both regions are owned by the presentation surface. The core only clears
//! them at the start of a run and appends status lines to the console; the
//! engine writes program output and paints graphics through its own channel.

use std::sync::Mutex;

/// Append-only text region shown to the user.
pub trait ConsoleSink: Send + Sync {
    fn append(&self, text: &str);
    fn clear(&self);

    fn append_line(&self, line: &str) {
        self.append(line);
        self.append("\n");
    }
}

/// Graphical output region the engine paints into.
pub trait DisplaySurface: Send + Sync {
    /// Identifier the engine mounts its display on.
    fn mount_point(&self) -> &str;
    fn clear(&self);
}

/// Console backed by an in-memory string.
#[derive(Debug, Default)]
pub struct MemoryConsole {
    text: Mutex<String>,
}

impl MemoryConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.text.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

impl ConsoleSink for MemoryConsole {
    fn append(&self, text: &str) {
        if let Ok(mut t) = self.text.lock() {
            t.push_str(text);
        }
    }

    fn clear(&self) {
        if let Ok(mut t) = self.text.lock() {
            t.clear();
        }
    }
}

/// Display for hosts without a graphical region. Counts clears.
#[derive(Debug)]
pub struct HeadlessDisplay {
    mount_point: String,
    clears: Mutex<usize>,
}

impl HeadlessDisplay {
    pub fn new(mount_point: impl Into<String>) -> Self {
        Self {
            mount_point: mount_point.into(),
            clears: Mutex::new(0),
        }
    }

    pub fn clear_count(&self) -> usize {
        self.clears.lock().map(|c| *c).unwrap_or_default()
    }
}

impl Default for HeadlessDisplay {
    fn default() -> Self {
        Self::new("display")
    }
}

impl DisplaySurface for HeadlessDisplay {
    fn mount_point(&self) -> &str {
        &self.mount_point
    }

    fn clear(&self) {
        if let Ok(mut c) = self.clears.lock() {
            *c += 1;
        }
    }
}
