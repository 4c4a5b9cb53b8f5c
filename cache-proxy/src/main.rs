//! Entry point: parse configuration, initialize logging, bind the listen
//! socket, and run the accept loop until interrupted.

use cache_proxy::{config::ProxyConfig, environment::Environment};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let config = ProxyConfig::parse();

    let filter = EnvFilter::new(config.log_filter.clone());
    tracing_subscriber::registry().with(filter).with(tracing_subscriber::fmt::layer()).init();

    tracing::info!(
        listen_addr = %config.listen_addr,
        shard_count = config.shard_count,
        cache_bytes = config.cache_bytes,
        "starting cache-proxy"
    );

    let listen_addr = config.listen_addr.clone();
    let env = Environment::new(config);

    let tcp_listener = match TcpListener::bind(&listen_addr).await {
        Ok(tcp_listener) => tcp_listener,
        Err(err) => {
            tracing::error!(error = %err, listen_addr, "failed to bind listen socket");
            std::process::exit(1);
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let serve = tokio::spawn(cache_proxy::listener::serve(env, tcp_listener, shutdown_rx));

    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for ctrl-c");
    }

    tracing::info!("shutdown requested");
    let _ = shutdown_tx.send(true);
    let _ = serve.await;
}
