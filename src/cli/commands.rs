//! CLI command implementations.
//!
//! Each command returns its output as a string; `main` writes it to stdout.

use std::fmt::Write as FmtWrite;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::agent::client::create_provider;
use crate::agent::config::AgentConfig;
use crate::agent::message::ChatMessage;
use crate::agent::orchestrator::Orchestrator;
use crate::agent::prompt::PromptSet;
use crate::agent::tool::registry_tool_definitions;
use crate::cli::parser::{Cli, Commands};
use crate::core::IntentClassifier;
use crate::error::{AgentError, CommandError, Result, ToolError};
use crate::registry::{SqlPolicy, ToolRegistry};
use crate::storage::SqliteStore;

/// Executes the parsed command.
///
/// # Errors
///
/// Returns an error if the command fails to execute. Rejected SQL surfaces
/// as [`Error::Tool`](crate::error::Error::Tool).
pub fn execute(cli: &Cli) -> Result<String> {
    let db_path = cli.get_db_path();

    match &cli.command {
        Commands::Init { sample, force } => cmd_init(&db_path, *sample, *force),
        Commands::Ask {
            message,
            history_file,
            no_llm_router,
        } => cmd_ask(&db_path, message, history_file.as_deref(), *no_llm_router),
        Commands::Classify { message } => Ok(cmd_classify(message)),
        Commands::Sanitize { sql, limit } => cmd_sanitize(sql, *limit),
        Commands::Tools => Ok(cmd_tools()),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref()),
    }
}

/// Opens the registry and checks that the schema exists.
fn open_store(db_path: &Path) -> Result<SqliteStore> {
    let not_initialized = || CommandError::NotInitialized {
        path: db_path.display().to_string(),
    };
    if !db_path.exists() {
        return Err(not_initialized().into());
    }
    let store = SqliteStore::open(db_path)?;
    if !store.is_initialized()? {
        return Err(not_initialized().into());
    }
    Ok(store)
}

fn cmd_init(db_path: &Path, sample: bool, force: bool) -> Result<String> {
    if db_path.exists() && !force {
        return Err(CommandError::ExecutionFailed(
            "Database already exists. Use --force to reinitialize.".to_string(),
        )
        .into());
    }

    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            CommandError::ExecutionFailed(format!("Failed to create directory: {e}"))
        })?;
    }

    if force && db_path.exists() {
        std::fs::remove_file(db_path).map_err(|e| {
            CommandError::ExecutionFailed(format!("Failed to remove existing database: {e}"))
        })?;
    }

    let store = SqliteStore::open(db_path)?;
    store.init()?;
    if sample {
        store.seed_sample()?;
    }
    info!(path = %db_path.display(), sample, "registry initialized");

    let mut output = format!("Initialized registry at: {}\n", db_path.display());
    if sample {
        output.push_str("Loaded the synthetic sample cohort.\n");
    }
    Ok(output)
}

fn cmd_ask(
    db_path: &Path,
    message: &str,
    history_file: Option<&Path>,
    no_llm_router: bool,
) -> Result<String> {
    let mut config = AgentConfig::from_env()?;
    if no_llm_router {
        config.use_llm_router = false;
    }

    let history = match history_file {
        Some(path) => read_history(path)?,
        None => Vec::new(),
    };
    let store = open_store(db_path)?;

    let provider = match create_provider(&config) {
        Ok(provider) => Some(provider),
        Err(AgentError::ApiKeyMissing) => {
            warn!("no model backend configured; agents run in degraded mode");
            None
        }
        Err(e) => return Err(e.into()),
    };

    let tools = ToolRegistry::with_limits(Arc::new(store), config.registry_limits());
    let orchestrator = Orchestrator::new(config, provider, tools);
    let request_id = Uuid::new_v4().to_string();
    info!(%request_id, "answering question");

    let rt = tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}"))
    })?;
    let result = rt.block_on(orchestrator.orchestrate(message, &history, &request_id))?;

    let json = serde_json::to_string_pretty(&result).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to serialize result: {e}"))
    })?;
    Ok(format!("{json}\n"))
}

fn read_history(path: &Path) -> Result<Vec<ChatMessage>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to read {}: {e}", path.display()))
    })?;
    let history = serde_json::from_str(&raw).map_err(|e| {
        CommandError::ExecutionFailed(format!("Invalid history file {}: {e}", path.display()))
    })?;
    Ok(history)
}

fn cmd_classify(message: &str) -> String {
    format!("{}\n", IntentClassifier::new().classify(message))
}

fn cmd_sanitize(sql: &str, limit: Option<u32>) -> Result<String> {
    let limits = AgentConfig::from_env()?.registry_limits();
    let query = SqlPolicy::registry(limits.max_limit)
        .sanitize(sql, limit.unwrap_or(limits.default_limit))
        .map_err(ToolError::from)?;
    Ok(format!("{}\n", query.as_str()))
}

fn cmd_tools() -> String {
    let definitions = registry_tool_definitions();
    let width = definitions.iter().map(|d| d.name.len()).max().unwrap_or(0);
    let mut output = String::new();
    for def in &definitions {
        let _ = writeln!(output, "{:<width$}  {}", def.name, def.description);
    }
    output
}

fn cmd_init_prompts(dir: Option<&Path>) -> Result<String> {
    let target_dir = dir
        .map(Path::to_path_buf)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    if written.is_empty() {
        return Ok(format!(
            "All prompt templates already exist in: {}\n",
            target_dir.display()
        ));
    }
    let mut output = format!(
        "Wrote {} prompt template(s) to: {}\n",
        written.len(),
        target_dir.display()
    );
    for path in &written {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("unknown");
        let _ = writeln!(output, "  {name}");
    }
    output.push_str("\nEdit these files to customize agent system prompts.\n");
    Ok(output)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::error::{Error, SqlPolicyError};
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_registry() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let db = dir.path().join("nested").join("registry.db");

        let out = cmd_init(&db, true, false).unwrap_or_else(|e| panic!("init: {e}"));
        assert!(out.contains("Initialized registry"));
        assert!(out.contains("sample cohort"));
        assert!(open_store(&db).is_ok());
    }

    #[test]
    fn test_init_refuses_existing_without_force() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let db = dir.path().join("registry.db");
        cmd_init(&db, true, false).unwrap_or_else(|e| panic!("init: {e}"));

        assert!(matches!(
            cmd_init(&db, true, false),
            Err(Error::Command(CommandError::ExecutionFailed(_)))
        ));
        assert!(cmd_init(&db, true, true).is_ok());
    }

    #[test]
    fn test_open_store_requires_init() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let db = dir.path().join("missing.db");
        assert!(matches!(
            open_store(&db),
            Err(Error::Command(CommandError::NotInitialized { .. }))
        ));
    }

    #[test]
    fn test_classify_output() {
        assert_eq!(cmd_classify("How many patients are there?"), "data\n");
        assert_eq!(cmd_classify("hello"), "general\n");
    }

    #[test]
    fn test_sanitize_appends_limit() {
        let out = cmd_sanitize("SELECT * FROM patients", Some(5)).unwrap_or_default();
        assert_eq!(out, "SELECT * FROM patients LIMIT 5\n");
    }

    #[test]
    fn test_sanitize_rejects_writes() {
        let err = cmd_sanitize("DELETE FROM patients", None);
        assert!(matches!(
            err,
            Err(Error::Tool(ToolError::UnsafeSql(SqlPolicyError::NotReadOnly)))
        ));
    }

    #[test]
    fn test_tools_lists_catalogue() {
        let out = cmd_tools();
        for name in crate::registry::TOOL_NAMES {
            assert!(out.contains(name), "missing {name}");
        }
    }

    #[test]
    fn test_read_history() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let path = dir.path().join("turns.json");
        std::fs::write(
            &path,
            r#"[{"role": "user", "content": "How many patients?"}, {"role": "assistant", "content": "6"}]"#,
        )
        .unwrap_or_else(|e| panic!("write: {e}"));

        let history = read_history(&path).unwrap_or_default();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content, "6");

        std::fs::write(&path, "not json").unwrap_or_else(|e| panic!("write: {e}"));
        assert!(read_history(&path).is_err());
    }

    #[test]
    fn test_init_prompts_skips_existing() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let out = cmd_init_prompts(Some(dir.path())).unwrap_or_default();
        assert!(out.contains("Wrote 4 prompt template(s)"));
        let again = cmd_init_prompts(Some(dir.path())).unwrap_or_default();
        assert!(again.contains("already exist"));
    }
}
