//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// BIOLINK-RS: conversational assistant for a clinical patient registry.
///
/// Routes questions to specialist agents, runs read-only registry tools and
/// has every answer reviewed by the medical agent.
#[derive(Parser, Debug)]
#[command(name = "biolink-rs")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the registry database file.
    ///
    /// Defaults to `.biolink/registry.db` in the current directory.
    #[arg(long = "db", env = "BIOLINK_DB_PATH", global = true)]
    pub db_path: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the registry database.
    #[command(after_help = r#"Examples:
  biolink-rs init                     # Empty registry schema
  biolink-rs init --sample            # Schema plus a synthetic cohort
  biolink-rs --db ./cohort.db init    # Custom path
"#)]
    Init {
        /// Load the synthetic sample cohort.
        #[arg(short, long)]
        sample: bool,

        /// Recreate the database if it exists (destroys existing data).
        #[arg(short, long)]
        force: bool,
    },

    /// Answer one question through the orchestrator.
    ///
    /// Prints the final result as JSON. Without model credentials the
    /// agents run in degraded mode.
    #[command(after_help = r#"Examples:
  biolink-rs ask "How many patients are there?"
  biolink-rs ask "females with diabetes" --no-llm-router
  biolink-rs ask "and their average age?" --history-file turns.json
"#)]
    Ask {
        /// The user message.
        message: String,

        /// JSON file with prior turns: `[{"role": "user", "content": "..."}]`.
        #[arg(long)]
        history_file: Option<PathBuf>,

        /// Use only the keyword classifier for routing.
        #[arg(long)]
        no_llm_router: bool,
    },

    /// Print the keyword-classified intent of a message.
    Classify {
        /// The user message.
        message: String,
    },

    /// Check SQL against the read-only policy and print the statement
    /// that would run.
    Sanitize {
        /// The SQL statement.
        sql: String,

        /// Row limit to apply when the statement has none.
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// List the registry tool catalogue.
    Tools,

    /// Write the default agent prompts for customization.
    ///
    /// Existing files are left untouched.
    InitPrompts {
        /// Target directory (defaults to `~/.config/biolink-rs/prompts`).
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

impl Cli {
    /// Returns the database path, using the default if not specified.
    #[must_use]
    pub fn get_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(crate::storage::DEFAULT_DB_PATH))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_ask_flags() {
        let cli = Cli::try_parse_from([
            "biolink-rs",
            "--db",
            "x.db",
            "ask",
            "How many patients?",
            "--no-llm-router",
        ])
        .unwrap_or_else(|_| unreachable!());
        assert_eq!(cli.get_db_path(), PathBuf::from("x.db"));
        assert!(matches!(
            cli.command,
            Commands::Ask { ref message, no_llm_router: true, history_file: None }
                if message == "How many patients?"
        ));
    }

    #[test]
    fn test_default_db_path() {
        let cli = Cli::try_parse_from(["biolink-rs", "tools"]).unwrap_or_else(|_| unreachable!());
        if std::env::var_os("BIOLINK_DB_PATH").is_none() {
            assert_eq!(cli.get_db_path(), PathBuf::from(".biolink/registry.db"));
        }
    }

    #[test]
    fn test_sanitize_limit() {
        let cli = Cli::try_parse_from(["biolink-rs", "sanitize", "SELECT 1", "-l", "5"])
            .unwrap_or_else(|_| unreachable!());
        assert!(matches!(cli.command, Commands::Sanitize { limit: Some(5), .. }));
    }
}
