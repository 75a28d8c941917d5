//! Rendering of delivered notifications for the console.

use serde::Serialize;

use svcwatch_domain::notification::ServiceNotification;
use svcwatch_domain::notify::StatusChange;
use svcwatch_domain::service::ServiceName;

use crate::config::OutputFormat;

#[derive(Serialize)]
struct JsonLine<'a> {
    service: &'a ServiceName,
    flags: u32,
    changes: Vec<&'static str>,
    received_at: String,
    action: bool,
}

/// Whether the notification calls for the follow-up action, i.e. the
/// service reported a stop.
#[must_use]
pub fn needs_action(notification: &ServiceNotification) -> bool {
    notification.has_stopped()
}

/// Render one notification, newline terminated.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render(
    notification: &ServiceNotification,
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Text => {
            let mut out = format!(
                "notification: {} current state: {}\n",
                notification.service, notification.flags
            );
            if needs_action(notification) {
                out.push_str("action\n");
            }
            Ok(out)
        }
        OutputFormat::Json => {
            let line = JsonLine {
                service: &notification.service,
                flags: notification.flags,
                changes: notification.changes().map(StatusChange::name).collect(),
                received_at: notification.received_at.to_rfc3339(),
                action: needs_action(notification),
            };
            let mut out = serde_json::to_string(&line)?;
            out.push('\n');
            Ok(out)
        }
    }
}
