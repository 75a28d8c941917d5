//! Notification dispatcher.
//!
//! The OS delivers status changes on a thread it owns, through a plain
//! function pointer and an opaque context word. The context word points at
//! a [`NotifyBuffer`]; the buffer points at the [`DispatchContext`] shared by
//! every entry of one `start` call, which holds the mask and the user action.
//!
//! Nothing on this path blocks, logs a failed resolution, or lets a panic
//! escape back into the OS.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use svcwatch_domain::notify::NotifyMask;
use svcwatch_domain::service::ServiceName;

/// User code invoked for every admitted notification.
///
/// Runs on the OS delivery thread: it must return quickly and must not block.
pub type ActionFn = Arc<dyn Fn(&ServiceName, u32) + Send + Sync>;

/// Mask and action shared by all entries of one `start` call.
pub struct DispatchContext {
    filter_mask: NotifyMask,
    action: Option<ActionFn>,
}

impl DispatchContext {
    #[must_use]
    pub fn new(filter_mask: NotifyMask, action: Option<ActionFn>) -> Self {
        Self {
            filter_mask,
            action,
        }
    }

    #[must_use]
    pub fn filter_mask(&self) -> NotifyMask {
        self.filter_mask
    }

    /// Whether a notification carrying `raw_flags` reaches the action.
    #[must_use]
    pub fn should_dispatch(&self, raw_flags: u32) -> bool {
        self.action.is_some() && self.filter_mask.admits(raw_flags)
    }

    fn dispatch(&self, service: &ServiceName, raw_flags: u32) {
        if !self.should_dispatch(raw_flags) {
            return;
        }
        let Some(action) = self.action.as_ref() else {
            return;
        };
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| action(service, raw_flags)));
        if outcome.is_err() {
            tracing::error!(%service, raw_flags, "notification action panicked");
        }
    }
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self::new(NotifyMask::EMPTY, None)
    }
}

impl fmt::Debug for DispatchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchContext")
            .field("filter_mask", &self.filter_mask)
            .field("has_action", &self.action.is_some())
            .finish()
    }
}

/// Per-entry buffer whose address is handed to the OS as callback context.
///
/// It lives behind an `Arc`, so its address never changes while any owner
/// (the registry entry, or an adapter holding a live registration) exists.
/// The [`Default`] value is unwired: notifications through it are dropped.
#[derive(Debug, Default)]
pub struct NotifyBuffer {
    context: Option<Arc<DispatchContext>>,
    service: Option<ServiceName>,
}

impl NotifyBuffer {
    /// A buffer wired to the shared `context` and to the watched service's name.
    #[must_use]
    pub fn wired(context: Arc<DispatchContext>, service: ServiceName) -> Self {
        Self {
            context: Some(context),
            service: Some(service),
        }
    }

    #[must_use]
    pub fn service(&self) -> Option<&ServiceName> {
        self.service.as_ref()
    }

    #[must_use]
    pub fn context(&self) -> Option<&Arc<DispatchContext>> {
        self.context.as_ref()
    }

    /// Entry point for one OS notification on this buffer.
    pub fn deliver(&self, raw_flags: u32) {
        let (Some(context), Some(service)) = (self.context.as_deref(), &self.service) else {
            return;
        };
        context.dispatch(service, raw_flags);
    }
}

/// Deliver a notification whose opaque context may not resolve to a buffer.
pub fn deliver(raw_flags: u32, buffer: Option<&NotifyBuffer>) {
    if let Some(buffer) = buffer {
        buffer.deliver(raw_flags);
    }
}
