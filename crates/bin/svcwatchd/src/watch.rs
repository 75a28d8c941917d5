//! The watch loop: subscribe, print notifications, stop on shutdown.

use std::future::Future;
use std::io::Write;

use anyhow::Context;
use tokio_stream::StreamExt;

use svcwatch_app::notification_sink::NotificationSink;
use svcwatch_app::ports::ServiceControl;
use svcwatch_app::registry::StatusNotifier;
use svcwatch_domain::error::SvcWatchError;
use svcwatch_domain::notification::ServiceNotification;
use svcwatch_domain::notify::NotifyMask;

use crate::config::OutputFormat;
use crate::report;

/// Notifications buffered between the OS delivery thread and the printer.
const CHANNEL_CAPACITY: usize = 256;

/// Outcome of one [`watch`] run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WatchSummary {
    /// Services actually subscribed.
    pub active: usize,
    /// Notifications printed.
    pub delivered: u64,
    /// Notifications lost to a full channel.
    pub dropped: u64,
}

/// Check that `control` can open a manager session at all.
///
/// The notifier treats an unavailable manager as "nothing to watch"; the
/// daemon would rather refuse to start, e.g. when it is not elevated.
///
/// # Errors
///
/// Returns [`SvcWatchError::ServiceControl`] with the platform code.
pub fn preflight<C: ServiceControl>(control: &C) -> Result<(), SvcWatchError> {
    control.open_manager()?;
    Ok(())
}

/// Watch `services` through `control` until `shutdown` resolves.
///
/// Notifications already buffered when `shutdown` resolves are still
/// written to `out` after every subscription has been cancelled.
///
/// # Errors
///
/// Returns an error if a notification cannot be rendered or written.
pub async fn watch<C, F, W>(
    control: C,
    services: &[String],
    mask: NotifyMask,
    format: OutputFormat,
    shutdown: F,
    out: &mut W,
) -> anyhow::Result<WatchSummary>
where
    C: ServiceControl,
    F: Future<Output = ()>,
    W: Write,
{
    let (sink, mut stream) = NotificationSink::new(CHANNEL_CAPACITY);
    let mut notifier = StatusNotifier::new(control);
    notifier.start(services, mask, sink.action());

    let mut summary = WatchSummary {
        active: notifier.active_count(),
        ..WatchSummary::default()
    };
    if summary.active == 0 {
        tracing::warn!("no service could be subscribed, waiting for shutdown");
    }

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            biased;
            next = stream.next() => {
                let Some(notification) = next else { break };
                write(out, &notification, format)?;
                summary.delivered += 1;
            }
            () = &mut shutdown => break,
        }
    }

    notifier.stop();
    stream.close();
    while let Some(notification) = stream.next().await {
        write(out, &notification, format)?;
        summary.delivered += 1;
    }
    summary.dropped = sink.dropped();
    Ok(summary)
}

fn write<W: Write>(
    out: &mut W,
    notification: &ServiceNotification,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let line = report::render(notification, format).context("failed to render notification")?;
    out.write_all(line.as_bytes())
        .context("failed to write notification")?;
    out.flush().context("failed to flush output")
}
