// SPDX-License-Identifier: AGPL-3.0-only
// Copyright Authors of metrics-agent

use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Returns a token that is cancelled once the process receives SIGTERM or SIGINT.
///
/// Fails if either handler cannot be installed. Must be called from within a tokio runtime.
pub fn shutdown_token() -> std::io::Result<CancellationToken> {
    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;

    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        let name = tokio::select! {
            _ = terminate.recv() => "SIGTERM",
            _ = interrupt.recv() => "SIGINT",
        };
        info!(signal = name, "shutdown signal received");
        cancel.cancel();
    });
    Ok(token)
}
