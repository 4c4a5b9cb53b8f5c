//! Accept loop: one `tokio::task` spawned per accepted connection, exiting
//! promptly on a shutdown signal.
//!
//! Translates the original's 1-second `SO_RCVTIMEO` accept-loop poll
//! (`Proxy::start_accepting`) into an async-native race between `accept()`
//! and a cancellation watch — no polling interval needed, the select simply
//! wakes on whichever happens first.

use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::environment::Environment;
use crate::handler::handle_connection;

/// Runs the accept loop until `shutdown` reports `true`.
pub async fn serve(env: Environment, listener: TcpListener, mut shutdown: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        tracing::debug!(%peer, "accepted connection");
                        let env = env.clone();
                        tokio::spawn(async move {
                            handle_connection(env, stream).await;
                        });
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "failed to accept connection");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    tracing::info!("accept loop shutting down");
                    break;
                }
            }
        }
    }
}
