//! CLI layer for BIOLINK-RS.
//!
//! A thin harness around the orchestrator: registry setup, one-shot
//! questions and inspection commands for the classifier, the SQL policy and
//! the tool catalogue.

pub mod commands;
pub mod parser;

pub use commands::execute;
pub use parser::{Cli, Commands};
