// SPDX-FileCopyrightText: 2026 SmartRAG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signal handling for stopping an in-flight turn.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Installs handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is
/// received. The handler task ends once the token is cancelled by anyone.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let guard = token.clone();

    tokio::spawn(async move {
        tokio::select! {
            _ = wait_for_signal() => guard.cancel(),
            _ = guard.cancelled() => {}
        }
        debug!("signal handler completed");
    });

    token
}

/// Returns a token cancelled by the next Ctrl+C only.
///
/// Used around a single turn in the shell; cancel the token afterwards to
/// release the handler task.
pub fn interrupt_token() -> CancellationToken {
    let token = CancellationToken::new();
    let guard = token.clone();

    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => {
                    info!("received Ctrl+C, stopping turn");
                    guard.cancel();
                }
                Err(e) => warn!(error = %e, "failed to listen for Ctrl+C"),
            },
            _ = guard.cancelled() => {}
        }
    });

    token
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("received SIGINT (Ctrl+C), stopping"),
                    _ = sigterm.recv() => info!("received SIGTERM, stopping"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl+C, stopping"),
        Err(e) => {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
