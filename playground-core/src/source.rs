//! Editable program text shared between the editor and the orchestrator.

use tokio::sync::watch;

/// Program shown on startup.
pub const DEFAULT_SOURCE: &str = r#"public class Main {
    public static void main(String[] args) {
        System.out.println("Hello, World!");
    }
}
"#;

/// Current program text.
///
/// Cloning yields another handle onto the same buffer. Every [`set`] replaces
/// the text wholesale and wakes subscribers.
///
/// [`set`]: SourceBuffer::set
#[derive(Debug, Clone)]
pub struct SourceBuffer {
    tx: watch::Sender<String>,
}

impl Default for SourceBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE)
    }
}

impl SourceBuffer {
    pub fn new(initial: impl Into<String>) -> Self {
        let (tx, _rx) = watch::channel(initial.into());
        Self { tx }
    }

    /// Snapshot of the text as it is right now.
    pub fn current(&self) -> String {
        self.tx.borrow().clone()
    }

    /// Replace the text. Called by the editor on every change.
    pub fn set(&self, text: impl Into<String>) {
        self.tx.send_replace(text.into());
    }

    /// Receiver notified on each edit.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.tx.subscribe()
    }
}
