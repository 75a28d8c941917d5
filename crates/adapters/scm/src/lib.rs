//! Windows service control manager adapter.
//!
//! Implements [`ServiceControl`] on top of the Win32 service APIs. Manager
//! and service handles are opened with full access, so the process must be
//! elevated. The change-notification primitives are resolved dynamically
//! from `SecHost.dll` on every call, see [`sechost`].
//!
//! Each registration passes its [`NotifyBuffer`] to the OS as a raw
//! `Arc` pointer; the strong count is reclaimed only once the registration
//! has been cancelled, so a callback never observes a freed buffer.

#![cfg(windows)]
#![allow(unsafe_code)]

mod handle;
mod sechost;

use std::ffi::c_void;
use std::sync::Arc;

use svcwatch_app::dispatch::{self, NotifyBuffer};
use svcwatch_app::ports::{ServiceControl, Subscription};
use svcwatch_domain::error::ScmError;
use svcwatch_domain::service::ServiceName;

pub use handle::{ScManager, ScService};

/// [`ServiceControl`] backed by the local service control manager.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScmServiceControl;

impl ScmServiceControl {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// A live `SubscribeServiceChangeNotifications` registration.
#[derive(Debug)]
pub struct ScmRegistration {
    raw: sechost::RawRegistration,
    buffer: *const NotifyBuffer,
}

// SAFETY: the registration pointer is an opaque OS token valid on any thread,
// and `buffer` is an `Arc<NotifyBuffer>` whose pointee is `Send + Sync`.
unsafe impl Send for ScmRegistration {}

impl ServiceControl for ScmServiceControl {
    type Manager = ScManager;
    type Service = ScService;
    type Registration = ScmRegistration;

    fn open_manager(&self) -> Result<ScManager, ScmError> {
        ScManager::open()
    }

    fn open_service(&self, manager: &ScManager, name: &ServiceName) -> Result<ScService, ScmError> {
        ScService::open(manager, name)
    }

    fn subscribe(
        &self,
        service: &ScService,
        buffer: Arc<NotifyBuffer>,
    ) -> Subscription<ScmRegistration> {
        let context = Arc::into_raw(buffer);
        let (raw, code) = sechost::subscribe(service.raw(), on_service_change, context.cast());
        if raw.is_null() {
            // SAFETY: `context` came from `Arc::into_raw` above and no
            // registration exists that could deliver to it.
            drop(unsafe { Arc::from_raw(context) });
            tracing::debug!(service = %service.name(), %code, "subscription refused");
            return Subscription::failed(code);
        }
        Subscription::active(
            ScmRegistration {
                raw,
                buffer: context,
            },
            code,
        )
    }

    fn unsubscribe(&self, registration: ScmRegistration) {
        if sechost::unsubscribe(registration.raw) {
            // SAFETY: the registration is cancelled, the OS holds no further
            // reference to the pointer produced in `subscribe`.
            drop(unsafe { Arc::from_raw(registration.buffer) });
        } else {
            tracing::warn!("cannot cancel service notification, leaking its buffer");
        }
    }
}

/// OS callback. `context` is null or the buffer pointer of a live registration.
unsafe extern "system" fn on_service_change(raw_flags: u32, context: *const c_void) {
    // SAFETY: non-null contexts are produced by `Arc::into_raw` in `subscribe`
    // and stay valid until the registration is cancelled.
    let buffer = unsafe { context.cast::<NotifyBuffer>().as_ref() };
    dispatch::deliver(raw_flags, buffer);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;
    use std::sync::Mutex;
    use svcwatch_app::dispatch::DispatchContext;
    use svcwatch_domain::notify::NotifyMask;

    fn recording_buffer(seen: &Arc<Mutex<Vec<(String, u32)>>>) -> Arc<NotifyBuffer> {
        let sink = Arc::clone(seen);
        let context = Arc::new(DispatchContext::new(
            NotifyMask::ALL,
            Some(Arc::new(move |name: &ServiceName, flags: u32| {
                sink.lock().unwrap().push((name.to_string(), flags));
            })),
        ));
        Arc::new(NotifyBuffer::wired(
            context,
            ServiceName::new("W32Time").unwrap(),
        ))
    }

    #[test]
    fn should_ignore_null_context() {
        // SAFETY: null is an accepted context.
        unsafe { on_service_change(0x1, ptr::null()) };
    }

    #[test]
    fn should_route_callback_to_buffer() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let buffer = recording_buffer(&seen);
        let context = Arc::into_raw(Arc::clone(&buffer));

        // SAFETY: `context` is a live `Arc<NotifyBuffer>` pointer.
        unsafe { on_service_change(0x1, context.cast()) };
        // SAFETY: balances the `into_raw` above.
        drop(unsafe { Arc::from_raw(context) });

        assert_eq!(*seen.lock().unwrap(), vec![("W32Time".to_string(), 0x1)]);
        assert_eq!(Arc::strong_count(&buffer), 1);
    }
}
