mod config_loader;
mod http_client;
mod wire;

use anyhow::Context;
use artifacts_bot_core::agent::Orchestrator;
use artifacts_bot_core::world::WorldCatalog;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config_loader::RunnerConfig;
use crate::http_client::HttpGameClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "artifacts_bot_core=info,artifacts_bot_runner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = RunnerConfig::load()?;
    let client = HttpGameClient::new(&cfg.api).context("build http client")?;

    let status = client.server_status().await.context("server status")?;
    tracing::info!(
        status = %status.status,
        version = %status.version,
        online = status.characters_online,
        next_wipe = status.next_wipe.as_deref().unwrap_or("unknown"),
        "server.status"
    );
    for announcement in &status.announcements {
        tracing::info!(
            created_at = ?announcement.created_at,
            message = %announcement.message,
            "server.announcement"
        );
    }
    let catalog = WorldCatalog::load(&client).await?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("runner.shutdown_requested");
                on_signal.cancel();
            }
            Err(err) => tracing::warn!(error = %err, "runner.signal_unavailable"),
        }
    });

    let mut orchestrator = Orchestrator::new(&client, &catalog, cfg.worker, cancel);
    let report = orchestrator.run().await?;

    let failed = report.values().filter(|r| r.is_err()).count();
    tracing::info!(workers = report.len(), failed, "runner.done");
    anyhow::ensure!(failed == 0, "{failed} worker(s) stopped on transport errors");
    Ok(())
}
