// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process signals to gateway shutdown.
//!
//! SIGINT or SIGTERM cancels the token handed to the HTTP server. The server
//! stops accepting connections, in-flight turns run to completion (and are
//! persisted), and `serve` then closes backends and the conversation store.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Spawn the signal listener and return the token it cancels.
///
/// The listener also exits quietly if the token is cancelled by someone
/// else first, e.g. when the server fails to bind.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let watched = token.clone();

    tokio::spawn(async move {
        tokio::select! {
            signal = wait_for_signal() => {
                info!(signal, "stopping gateway, draining in-flight turns");
                watched.cancel();
            }
            _ = watched.cancelled() => {
                debug!("gateway stopped before any signal arrived");
            }
        }
    });

    token
}

/// Resolve with the name of the first shutdown signal received.
async fn wait_for_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => tokio::select! {
                _ = tokio::signal::ctrl_c() => "SIGINT",
                _ = sigterm.recv() => "SIGTERM",
            },
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable, only Ctrl+C stops the gateway");
                let _ = tokio::signal::ctrl_c().await;
                "SIGINT"
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        "Ctrl+C"
    }
}
