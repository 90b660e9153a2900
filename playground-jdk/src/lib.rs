//! Local JDK backend for the playground engine capability.
//!
//! The virtual paths used by the playground (`/str/Main.java`, `/files/`)
//! are mapped under a scratch directory and `java` is run as a subprocess.

pub mod config;
pub mod engine;
pub mod paths;

pub use config::JdkConfig;
pub use engine::JdkEngine;
pub use paths::VirtualRoot;
