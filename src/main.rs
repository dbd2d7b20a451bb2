use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use pinpage::config::{Config, PinConfig};
use pinpage::gpio::{PinRegistry, SysfsPins};
use pinpage::network::{self, HostRadio};
use pinpage::server::Server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let cfg = Config::load(path.as_deref()).context("failed to load configuration")?;

    let mut radio = HostRadio::default();
    let status = network::bring_up(&mut radio, &cfg.network).await?;
    if status.is_offline() {
        tracing::warn!("Both radio roles disabled; serving on the existing IP stack");
    }

    let mut registry = PinRegistry::configure(cfg.pins.iter().map(PinConfig::to_pin))?;
    match &cfg.gpio.sysfs_root {
        Some(root) => {
            tracing::info!("Pins backed by {}", root.display());
            registry = registry.with_driver(Arc::new(SysfsPins::new(root)));
            if let Err(e) = registry.apply_outputs().await {
                tracing::warn!("Could not drive initial output levels: {}", e);
            }
            registry.refresh_inputs().await;
        }
        None => tracing::warn!("No GPIO driver configured; pin values stay as configured"),
    }

    let server = Server::bind(cfg.server.clone(), registry)
        .await?
        .with_title(cfg.page.title.clone());
    let handle = server.handle();

    let run = server.run();
    tokio::pin!(run);

    tokio::select! {
        _ = &mut run => {}

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
            handle.stop();
            run.await;
        }
    }

    Ok(())
}
