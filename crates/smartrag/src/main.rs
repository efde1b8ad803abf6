// SPDX-FileCopyrightText: 2026 SmartRAG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SmartRAG - streaming chat client for a SmartRAG backend.
//!
//! This is the binary entry point. Answer text goes to stdout; logs and
//! status lines go to stderr.

mod chat;
mod shell;
mod shutdown;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use smartrag_config::model::SmartRagConfig;
use smartrag_core::SmartRagError;

/// SmartRAG - streaming chat client for a SmartRAG backend.
#[derive(Parser, Debug)]
#[command(name = "smartrag", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Stream one chat turn to stdout.
    Chat(TurnArgs),
    /// Send one turn to the non-streaming endpoint and print the reply.
    Ask(TurnArgs),
    /// Launch an interactive REPL session.
    Shell(SessionArgs),
    /// Check the backend chat service health.
    Health,
}

/// Per-turn request options.
#[derive(Args, Debug, Clone, Default)]
struct TurnArgs {
    /// The message to send.
    message: String,

    #[command(flatten)]
    session: SessionArgs,
}

/// Options shared by every turn of a session.
#[derive(Args, Debug, Clone, Default)]
struct SessionArgs {
    /// Continue an existing backend conversation.
    #[arg(long)]
    conversation_id: Option<String>,

    /// Override `client.user_id`.
    #[arg(long)]
    user_id: Option<i64>,

    /// Enable knowledge retrieval against this knowledge source.
    #[arg(long, value_name = "NAME")]
    knowledge: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => smartrag_config::load_and_validate_path(path),
        None => smartrag_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            smartrag_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.client.log_level);

    if let Err(e) = run(cli.command, config).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: SmartRagConfig) -> Result<(), SmartRagError> {
    match command {
        Commands::Chat(args) => chat::run_chat(&config, &args).await,
        Commands::Ask(args) => chat::run_ask(&config, &args).await,
        Commands::Shell(args) => shell::run_shell(&config, &args).await,
        Commands::Health => chat::run_health(&config).await,
    }
}

/// Initialize the tracing subscriber with an env filter.
///
/// `RUST_LOG` wins over the configured level. Output goes to stderr so that
/// piping the answer text stays clean.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("smartrag={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chat_with_options() {
        let cli = Cli::try_parse_from([
            "smartrag",
            "chat",
            "what is rag?",
            "--conversation-id",
            "conv_1",
            "--user-id",
            "7",
            "--knowledge",
            "handbook",
        ])
        .unwrap();

        match cli.command {
            Commands::Chat(args) => {
                assert_eq!(args.message, "what is rag?");
                assert_eq!(args.session.conversation_id.as_deref(), Some("conv_1"));
                assert_eq!(args.session.user_id, Some(7));
                assert_eq!(args.session.knowledge.as_deref(), Some("handbook"));
            }
            other => panic!("expected chat command, got {other:?}"),
        }
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["smartrag", "health", "--config", "custom.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert!(matches!(cli.command, Commands::Health));
    }

    #[test]
    fn chat_requires_message() {
        assert!(Cli::try_parse_from(["smartrag", "chat"]).is_err());
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = smartrag_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert_eq!(config.client.user_role, "admin");
    }
}
