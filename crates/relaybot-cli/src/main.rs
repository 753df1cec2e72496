//! Relaybot CLI — entry point.
//!
//! # Commands
//!
//! - `relaybot agent [-m MESSAGE] [-s SESSION]` — chat (single-shot or REPL)
//! - `relaybot sse [--port PORT]` — run the SSE gateway (HTTP + bus + cron)
//! - `relaybot cron {list,add,remove,enable,run}` — manage scheduled jobs
//!
//! Exit codes: 0 on success, 1 on configuration errors.

mod cron_cmd;
mod helpers;
mod repl;
mod serve;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use relaybot_agent::agent_loop::AgentLoopConfig;
use relaybot_agent::tools::registry::ToolDeps;
use relaybot_agent::tools::storage::StorageService;
use relaybot_agent::AgentLoop;
use relaybot_core::bus::queue::MessageBus;
use relaybot_core::config::{load_config, Config};
use relaybot_core::session::SessionManager;
use relaybot_providers::http_provider::create_provider;
use relaybot_providers::LlmRequestConfig;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Relaybot — multi-channel conversational agent gateway
#[derive(Parser)]
#[command(name = "relaybot", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the agent (single-shot or interactive REPL)
    Agent {
        /// Single message (non-interactive). Omit for REPL mode.
        #[arg(short, long)]
        message: Option<String>,

        /// Session identifier (format: "channel:chat_id")
        #[arg(short, long, default_value = "cli:default")]
        session: String,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Run the SSE gateway: HTTP surface + bus loop + cron service
    Sse {
        /// Listen port (overrides config)
        #[arg(long)]
        port: Option<u16>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Manage scheduled jobs
    Cron {
        #[command(subcommand)]
        action: cron_cmd::CronCommands,
    },
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Agent {
            message,
            session,
            logs,
        } => {
            init_logging(logs);
            run_agent(message, session).await
        }
        Commands::Sse { port, logs } => {
            init_logging(logs);
            serve::run(port).await
        }
        Commands::Cron { action } => {
            init_logging(false);
            cron_cmd::dispatch(action).await
        }
    }
}

// ─────────────────────────────────────────────
// Agent command
// ─────────────────────────────────────────────

async fn run_agent(message: Option<String>, session: String) -> Result<()> {
    let config = load_config(None);
    let agent_loop = build_agent_loop(&config)?;

    let (channel, chat_id) = split_session(&session)?;

    match message {
        Some(msg) => {
            info!(session = %session, "processing single message");
            let response = agent_loop
                .process_direct(&msg, &channel, &chat_id)
                .await
                .context("agent processing failed")?;
            helpers::print_response(&response);
        }
        None => {
            repl::run(agent_loop, &channel, &chat_id).await?;
        }
    }

    Ok(())
}

/// Split a `"channel:chat_id"` session identifier.
fn split_session(session: &str) -> Result<(String, String)> {
    match session.split_once(':') {
        Some((channel, chat_id)) if !channel.is_empty() && !chat_id.is_empty() => {
            Ok((channel.to_string(), chat_id.to_string()))
        }
        _ => anyhow::bail!("Invalid session '{session}': expected \"channel:chat_id\""),
    }
}

/// Build an `AgentLoop` from the loaded configuration.
pub fn build_agent_loop(config: &Config) -> Result<AgentLoop> {
    let defaults = &config.agents.defaults;

    let workspace = helpers::expand_tilde(&defaults.workspace);
    std::fs::create_dir_all(&workspace)
        .with_context(|| format!("failed to create workspace: {}", workspace.display()))?;

    let model = &defaults.model;
    let providers_map = config.providers.to_map();
    let provider = create_provider(model, &providers_map).map_err(|e| anyhow::anyhow!(e))?;

    let brave_key = if config.tools.web.search.api_key.is_empty() {
        None
    } else {
        Some(config.tools.web.search.api_key.clone())
    };

    let storage = if config.storage.is_configured() {
        Some(Arc::new(StorageService::new(config.storage.clone())))
    } else {
        None
    };

    let bus = Arc::new(MessageBus::new(100));
    let session_manager =
        SessionManager::new(None).context("failed to create session manager")?;

    Ok(AgentLoop::new(
        bus,
        Arc::new(provider),
        workspace,
        AgentLoopConfig {
            model: Some(model.to_string()),
            max_iterations: Some(defaults.max_tool_iterations as usize),
            request_config: Some(LlmRequestConfig {
                max_tokens: defaults.max_tokens,
                temperature: defaults.temperature,
            }),
            brave_api_key: brave_key,
            exec_timeout_secs: Some(config.tools.exec.timeout),
            restrict_to_workspace: config.tools.restrict_to_workspace,
            agent_name: None,
            session_manager: Some(session_manager),
            deps: ToolDeps {
                storage,
                cron: None,
            },
        },
    ))
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("relaybot=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_session_valid() {
        let (channel, chat_id) = split_session("cli:default").unwrap();
        assert_eq!(channel, "cli");
        assert_eq!(chat_id, "default");
    }

    #[test]
    fn test_split_session_keeps_extra_colons() {
        let (channel, chat_id) = split_session("websocket:conn:42").unwrap();
        assert_eq!(channel, "websocket");
        assert_eq!(chat_id, "conn:42");
    }

    #[test]
    fn test_split_session_invalid() {
        assert!(split_session("nodcolon").is_err());
        assert!(split_session(":empty").is_err());
        assert!(split_session("empty:").is_err());
    }
}
