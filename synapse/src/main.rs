use synapse::telemetry::tracing_telemetry;
use synapse::{Config, Core};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        namespace = %config.namespace,
        workers = config.workers.len(),
        deadline_ms = config.deadline.as_millis() as u64,
        "starting synapse core"
    );

    let core = Core::start(config, tracing_telemetry()).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    core.stop();
    Ok(())
}
