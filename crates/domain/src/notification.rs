//! Notification: a timestamped record of one delivered status change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::notify::{NotifyMask, StatusChange};
use crate::service::ServiceName;

/// A status change reported for one service, as delivered to user code.
///
/// `flags` is the raw word received from the OS, kept unmodified; `0`
/// means "something changed, re-check the service".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceNotification {
    pub service: ServiceName,
    pub flags: u32,
    pub received_at: DateTime<Utc>,
}

impl ServiceNotification {
    #[must_use]
    pub fn new(service: ServiceName, flags: u32) -> Self {
        Self {
            service,
            flags,
            received_at: Utc::now(),
        }
    }

    /// Named kinds carried by the raw flags.
    pub fn changes(&self) -> impl Iterator<Item = StatusChange> {
        NotifyMask::from_bits(self.flags).kinds()
    }

    /// Whether the flags carry the stopped bit, alone or with others.
    #[must_use]
    pub fn has_stopped(&self) -> bool {
        NotifyMask::from_bits(self.flags).contains(StatusChange::Stopped)
    }
}
