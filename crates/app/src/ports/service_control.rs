//! Service control port: the OS binding the registry subscribes through.
//!
//! An implementation wraps the host's service control manager: it opens a
//! management session and per-service handles, and registers/cancels
//! status-change subscriptions. Handles are closed when the associated
//! values are dropped.

use std::sync::Arc;

use svcwatch_domain::error::{ScmError, SystemErrorCode};
use svcwatch_domain::service::ServiceName;

use crate::dispatch::NotifyBuffer;

/// Binding to the host's service control manager.
///
/// The registry calls the methods in this order for one `start`:
///
/// 1. [`open_manager`](Self::open_manager) once
/// 2. [`open_service`](Self::open_service) per requested name
/// 3. [`subscribe`](Self::subscribe) per opened service
///
/// and [`unsubscribe`](Self::unsubscribe) once per live registration on `stop`.
pub trait ServiceControl {
    /// Open management session. Closed on drop.
    type Manager;
    /// Open service handle. Closed on drop.
    type Service;
    /// A live subscription. Must be handed back to [`unsubscribe`](Self::unsubscribe).
    type Registration: Send;

    /// Open a session on the service control manager.
    ///
    /// # Errors
    ///
    /// Returns [`ScmError::ManagerUnavailable`] with the platform code.
    fn open_manager(&self) -> Result<Self::Manager, ScmError>;

    /// Open a handle on one named service.
    ///
    /// # Errors
    ///
    /// Returns [`ScmError::ServiceUnavailable`] with the platform code.
    fn open_service(
        &self,
        manager: &Self::Manager,
        name: &ServiceName,
    ) -> Result<Self::Service, ScmError>;

    /// Register for status-change events on `service`.
    ///
    /// Every notification for the registration must be routed to
    /// [`NotifyBuffer::deliver`] on `buffer`. The implementation keeps
    /// `buffer` alive for as long as the registration can deliver, and may
    /// drop it once the registration is cancelled or if registering failed.
    fn subscribe(
        &self,
        service: &Self::Service,
        buffer: Arc<NotifyBuffer>,
    ) -> Subscription<Self::Registration>;

    /// Cancel a registration. Best effort: failures are not reported.
    fn unsubscribe(&self, registration: Self::Registration);
}

/// Outcome of [`ServiceControl::subscribe`].
///
/// `registration` is `Some` iff the OS accepted the subscription; `code` is
/// whatever status the OS reported, and may be zero even on failure (e.g.
/// when the subscription primitive is not available at all).
#[derive(Debug)]
pub struct Subscription<R> {
    pub registration: Option<R>,
    pub code: SystemErrorCode,
}

impl<R> Subscription<R> {
    #[must_use]
    pub fn active(registration: R, code: SystemErrorCode) -> Self {
        Self {
            registration: Some(registration),
            code,
        }
    }

    #[must_use]
    pub fn failed(code: SystemErrorCode) -> Self {
        Self {
            registration: None,
            code,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.registration.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_be_active_when_registration_present() {
        let sub = Subscription::active(7_u32, SystemErrorCode::SUCCESS);
        assert!(sub.is_active());
        assert_eq!(sub.registration, Some(7));
    }

    #[test]
    fn should_keep_error_code_when_failed() {
        let sub = Subscription::<u32>::failed(SystemErrorCode::ACCESS_DENIED);
        assert!(!sub.is_active());
        assert_eq!(sub.code, SystemErrorCode::ACCESS_DENIED);
    }
}
