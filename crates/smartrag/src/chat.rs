// SPDX-FileCopyrightText: 2026 SmartRAG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `smartrag chat`, `smartrag ask` and `smartrag health` command implementations.

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use colored::Colorize;
use smartrag_config::model::{ClientConfig, SmartRagConfig};
use smartrag_core::{
    ChatTurnRequest, ConversationId, FinishedMessage, HealthStatus, SmartRagError, TurnObserver,
};
use smartrag_stream::{ChatClient, SessionController};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::shutdown::install_signal_handler;
use crate::{SessionArgs, TurnArgs};

/// How a turn driven from the terminal ended.
#[derive(Debug)]
pub(crate) enum TurnOutcome {
    Completed(FinishedMessage),
    Failed(String),
    Stopped,
}

/// Prints chunks to stdout as they arrive and reports the terminal callback.
pub(crate) struct TerminalObserver {
    streamed: Mutex<String>,
    outcome: mpsc::UnboundedSender<TurnOutcome>,
}

impl TerminalObserver {
    pub(crate) fn new(outcome: mpsc::UnboundedSender<TurnOutcome>) -> Self {
        Self {
            streamed: Mutex::new(String::new()),
            outcome,
        }
    }
}

impl TurnObserver for TerminalObserver {
    fn on_chunk(&self, text: &str) {
        print!("{text}");
        let _ = std::io::stdout().flush();
        self.streamed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_str(text);
    }

    fn on_complete(&self, message: FinishedMessage) {
        println!();
        let streamed = self.streamed.lock().unwrap_or_else(PoisonError::into_inner);
        // Links were substituted after streaming; show the resolved text too.
        if *streamed != message.text {
            println!("{}", "with links:".dimmed());
            println!("{}", message.text);
        }
        let _ = self.outcome.send(TurnOutcome::Completed(message));
    }

    fn on_error(&self, error: &SmartRagError) {
        if !self
            .streamed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
        {
            println!();
        }
        let _ = self.outcome.send(TurnOutcome::Failed(error.to_string()));
    }
}

/// Builds a request from client defaults and command-line overrides.
pub(crate) fn build_request(
    client: &ClientConfig,
    session: &SessionArgs,
    message: &str,
) -> ChatTurnRequest {
    let mut request = ChatTurnRequest::new(message)
        .with_user(client.user_role.clone(), session.user_id.or(client.user_id));

    if let Some(id) = &session.conversation_id {
        request = request.with_conversation(ConversationId(id.clone()));
    }
    if let Some(name) = session.knowledge.as_ref().or(client.knowledge_name.as_ref()) {
        request = request.with_knowledge(name.clone());
    }
    request
}

/// Runs one turn and waits for its outcome or for `stop` to fire.
pub(crate) async fn stream_turn(
    controller: &SessionController,
    request: ChatTurnRequest,
    stop: &CancellationToken,
) -> TurnOutcome {
    let (tx, mut rx) = mpsc::unbounded_channel();
    controller.start(request, Arc::new(TerminalObserver::new(tx)));

    tokio::select! {
        outcome = rx.recv() => outcome.unwrap_or(TurnOutcome::Stopped),
        _ = stop.cancelled() => {
            controller.stop();
            TurnOutcome::Stopped
        }
    }
}

/// Runs `smartrag chat`: streams one turn to stdout.
pub async fn run_chat(config: &SmartRagConfig, args: &TurnArgs) -> Result<(), SmartRagError> {
    let controller = SessionController::from_config(config)?;
    let request = build_request(&config.client, &args.session, &args.message);
    let stop = install_signal_handler();

    let outcome = stream_turn(&controller, request, &stop).await;
    stop.cancel();

    match outcome {
        TurnOutcome::Completed(_) => Ok(()),
        TurnOutcome::Stopped => {
            eprintln!("{}", "stopped".yellow());
            Ok(())
        }
        TurnOutcome::Failed(message) => {
            eprintln!("{}: {message}", "error".red());
            std::process::exit(1);
        }
    }
}

/// Runs `smartrag ask`: one non-streaming turn.
pub async fn run_ask(config: &SmartRagConfig, args: &TurnArgs) -> Result<(), SmartRagError> {
    let client = ChatClient::from_config(config)?;
    let request = build_request(&config.client, &args.session, &args.message);
    let reply = client.ask(&request).await?;
    println!("{reply}");
    Ok(())
}

/// Runs `smartrag health`: prints the backend status, exiting 1 unless healthy.
pub async fn run_health(config: &SmartRagConfig) -> Result<(), SmartRagError> {
    let client = ChatClient::from_config(config)?;
    match client.health().await? {
        HealthStatus::Healthy => {
            println!("{} {}", "healthy".green(), config.server.base_url.dimmed());
            Ok(())
        }
        HealthStatus::Degraded(status) => {
            println!("{}: {status}", "degraded".yellow());
            std::process::exit(1);
        }
        HealthStatus::Unhealthy(reason) => {
            println!("{}: {reason}", "unhealthy".red());
            std::process::exit(1);
        }
    }
}
