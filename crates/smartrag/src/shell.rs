// SPDX-FileCopyrightText: 2026 SmartRAG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `smartrag shell` command implementation.
//!
//! Launches an interactive REPL with colored prompt, streaming output, and
//! readline history. Prior turns of the session are sent as `history`.

use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use smartrag_config::model::SmartRagConfig;
use smartrag_core::{HistoryTurn, SmartRagError};
use smartrag_stream::SessionController;
use tracing::debug;

use crate::SessionArgs;
use crate::chat::{TurnOutcome, build_request, stream_turn};
use crate::shutdown::interrupt_token;

/// A line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum ShellInput<'a> {
    Quit,
    Reset,
    Empty,
    Message(&'a str),
}

fn parse_input(line: &str) -> ShellInput<'_> {
    match line.trim() {
        "/quit" | "/exit" => ShellInput::Quit,
        "/reset" => ShellInput::Reset,
        "" => ShellInput::Empty,
        message => ShellInput::Message(message),
    }
}

/// Conversation turns kept locally and replayed to the backend.
#[derive(Debug, Default)]
struct Transcript {
    turns: Vec<HistoryTurn>,
}

impl Transcript {
    fn record(&mut self, question: &str, answer: &str) {
        self.turns.push(HistoryTurn::user(question));
        self.turns.push(HistoryTurn::model(answer));
    }

    fn clear(&mut self) {
        self.turns.clear();
    }

    fn history(&self) -> Vec<HistoryTurn> {
        self.turns.clone()
    }
}

/// Runs the `smartrag shell` interactive REPL.
///
/// Each line is one streamed turn. Ctrl+C while a turn streams stops it; at
/// the prompt it exits.
pub async fn run_shell(config: &SmartRagConfig, args: &SessionArgs) -> Result<(), SmartRagError> {
    let controller = SessionController::from_config(config)?;
    let mut transcript = Transcript::default();

    let mut rl = DefaultEditor::new()
        .map_err(|e| SmartRagError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", "smartrag shell".bold().green());
    println!(
        "Type {} to start over, {} to exit.\n",
        "/reset".yellow(),
        "/quit".yellow()
    );

    let prompt = format!("{}> ", "smartrag".green());
    loop {
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        };

        let message = match parse_input(&line) {
            ShellInput::Quit => break,
            ShellInput::Empty => continue,
            ShellInput::Reset => {
                transcript.clear();
                controller.reset();
                println!("{}", "conversation cleared".dimmed());
                continue;
            }
            ShellInput::Message(message) => message,
        };

        let _ = rl.add_history_entry(&line);

        let request = build_request(&config.client, args, message)
            .with_history(transcript.history());
        let stop = interrupt_token();
        let outcome = stream_turn(&controller, request, &stop).await;
        stop.cancel();

        match outcome {
            TurnOutcome::Completed(reply) => transcript.record(message, &reply.text),
            TurnOutcome::Failed(error) => eprintln!("{}: {error}", "error".red()),
            TurnOutcome::Stopped => eprintln!("\n{}", "stopped".yellow()),
        }
    }

    debug!(turns = transcript.turns.len() / 2, "shell session ended");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartrag_core::Role;

    #[test]
    fn parses_commands() {
        assert_eq!(parse_input("/quit"), ShellInput::Quit);
        assert_eq!(parse_input(" /exit "), ShellInput::Quit);
        assert_eq!(parse_input("/reset"), ShellInput::Reset);
        assert_eq!(parse_input("   "), ShellInput::Empty);
        assert_eq!(parse_input(" hello "), ShellInput::Message("hello"));
    }

    #[test]
    fn transcript_replays_turns_oldest_first() {
        let mut transcript = Transcript::default();
        transcript.record("q1", "a1");
        transcript.record("q2", "a2");

        let history = transcript.history();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].text(), "q1");
        assert_eq!(history[3].role, Role::Model);
        assert_eq!(history[3].text(), "a2");
    }

    #[test]
    fn reset_clears_transcript() {
        let mut transcript = Transcript::default();
        transcript.record("q", "a");
        transcript.clear();
        assert!(transcript.history().is_empty());
    }
}
