//! # svcwatchd: service status watcher
//!
//! Composition root that picks a service control backend and prints every
//! status change of the configured services.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Initialise logging
//! - Construct the backend (Windows SCM or the virtual simulator)
//! - Run the watch loop until Ctrl-C or the configured duration elapses
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer, no domain logic belongs here.

use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use svcwatch_adapter_virtual::VirtualServiceControl;
use svcwatchd::config::{BackendKind, Config};
use svcwatchd::watch::{preflight, watch};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    let filter = EnvFilter::try_new(&config.logging.filter).context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mask = config.notify_mask()?;
    let services = &config.watch.services;
    let format = config.output.format;
    let shutdown = shutdown_signal(config.duration());
    let mut stdout = std::io::stdout();

    tracing::info!(
        backend = ?config.backend.kind,
        services = services.len(),
        %mask,
        "svcwatchd starting"
    );

    let summary = match config.backend.kind {
        BackendKind::Virtual => {
            let control = VirtualServiceControl::from_config(&config.backend.virtual_backend);
            preflight(&control).context("virtual backend unavailable")?;
            let simulation = control.start_simulation();
            let summary = watch(control, services, mask, format, shutdown, &mut stdout).await;
            if let Some(handle) = simulation {
                handle.abort();
            }
            summary?
        }
        #[cfg(windows)]
        BackendKind::Scm => {
            let control = svcwatch_adapter_scm::ScmServiceControl::new();
            preflight(&control).context("service control manager unavailable, run elevated")?;
            watch(control, services, mask, format, shutdown, &mut stdout).await?
        }
        #[cfg(not(windows))]
        BackendKind::Scm => anyhow::bail!("the scm backend is only available on Windows"),
    };

    tracing::info!(
        active = summary.active,
        delivered = summary.delivered,
        dropped = summary.dropped,
        "svcwatchd stopped"
    );
    Ok(())
}

/// Resolve on Ctrl-C, or once `duration` has elapsed when set.
async fn shutdown_signal(duration: Option<Duration>) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    match duration {
        Some(duration) => tokio::select! {
            () = ctrl_c => {}
            () = tokio::time::sleep(duration) => {}
        },
        None => ctrl_c.await,
    }
}
