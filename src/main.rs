use anyhow::Context;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use resource_node::config::NodeConfig;
use resource_node::node;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = NodeConfig::from_env().context("Failed to load resource configuration")?;

    // Held until exit so buffered file logs are flushed.
    let _log_guard = init_tracing(&config);

    eprintln!("🛠  Resource node v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   RPC: http://{}/rpc", config.bind_addr);
    eprintln!("   Health: http://{}/health", config.bind_addr);

    let finals = node::run(config, shutdown_signal())
        .await
        .context("Resource node failed")?;
    eprintln!("   Terminated {} task(s) on shutdown", finals.len());
    Ok(())
}

fn init_tracing(config: &NodeConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "resource-node.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(stderr).init();
            None
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining tasks");
}
