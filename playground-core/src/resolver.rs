//! Entry-point class name resolution
//!
//! Derives the name passed to the engine's launch call from program text.
//! Only the first `package` declaration and the first `public class`
//! declaration are honored. Sources with several of either resolve to the
//! first occurrence; that outcome is not a supported contract, and such
//! files are left for the compiler to accept or reject.

use crate::types::EntryPointName;
use regex::Regex;
use std::sync::LazyLock;

/// Class name launched when the source declares no public class.
pub const FALLBACK_ENTRY: &str = "Main";

/// `package <dotted-name>;`
static PACKAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"package\s+([\w$.]+)\s*;").unwrap());

/// `public class <identifier>`
static PUBLIC_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"public\s+class\s+([\w$]+)").unwrap());

/// Resolves entry points with a configurable fallback class name.
#[derive(Debug, Clone)]
pub struct EntryPointResolver {
    fallback: String,
}

impl Default for EntryPointResolver {
    fn default() -> Self {
        Self::new(FALLBACK_ENTRY)
    }
}

impl EntryPointResolver {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            fallback: fallback.into(),
        }
    }

    /// Resolve the entry point of `source`.
    ///
    /// With no public class the fallback is returned bare, even if a package
    /// was declared.
    pub fn resolve(&self, source: &str) -> EntryPointName {
        let Some(class) = PUBLIC_CLASS_RE
            .captures(source)
            .and_then(|caps| caps.get(1))
        else {
            return EntryPointName::new(None, self.fallback.clone());
        };

        let package = PACKAGE_RE
            .captures(source)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());

        EntryPointName::new(package, class.as_str())
    }
}

/// Qualified entry-point name of `source`, falling back to `"Main"`.
pub fn resolve_entry_point(source: &str) -> String {
    EntryPointResolver::default().resolve(source).qualified()
}
