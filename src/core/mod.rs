//! Core classification logic shared by the orchestrator and CLI.

pub mod intent;

pub use intent::{Intent, IntentClassifier};

/// Compiles a pattern literal for a `LazyLock<Regex>` static.
///
/// Only called with string literals that are exercised by unit tests.
#[allow(clippy::expect_used)]
pub(crate) fn literal_regex(pattern: &'static str) -> regex::Regex {
    regex::Regex::new(pattern).expect("pattern literal must compile")
}
