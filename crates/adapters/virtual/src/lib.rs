//! # svcwatch-adapter-virtual
//!
//! Virtual service control manager. Implements the `ServiceControl` port
//! entirely in memory, so the notifier can be exercised without an OS.
//!
//! ## Behaviour
//!
//! | Situation | Result |
//! |-----------|--------|
//! | `manager_error` set | opening the manager fails with that code |
//! | name in `missing_services` | opening the service fails with `1060` |
//! | name in `rejected_services` | subscribing fails with the configured code |
//! | anything else | opens and subscribes successfully |
//!
//! [`VirtualServiceControl::notify`] delivers a synthetic notification to
//! every live registration of a service, from whatever thread calls it. The
//! buffers are cloned out of the registration table before delivery, the
//! way an OS delivery thread may still hold a context while the registration
//! is being cancelled.
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `svcwatch-app` and `svcwatch-domain`.

mod config;
mod simulator;

pub use config::VirtualConfig;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use svcwatch_app::dispatch::NotifyBuffer;
use svcwatch_app::ports::{ServiceControl, Subscription};
use svcwatch_domain::error::{ScmError, SystemErrorCode};
use svcwatch_domain::service::ServiceName;

/// In-memory service control manager. Cloning shares the same state.
#[derive(Clone, Default)]
pub struct VirtualServiceControl {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<State>,
    subscribe_calls: AtomicUsize,
    unsubscribe_calls: AtomicUsize,
}

#[derive(Default)]
struct State {
    manager_error: Option<SystemErrorCode>,
    missing: HashSet<String>,
    rejected: HashMap<String, SystemErrorCode>,
    live: BTreeMap<u64, LiveRegistration>,
    next_registration: u64,
    simulate_interval: Option<Duration>,
}

struct LiveRegistration {
    service: ServiceName,
    buffer: Arc<NotifyBuffer>,
}

/// Open session on the virtual manager.
#[derive(Debug)]
pub struct VirtualManager(());

/// Open handle on a virtual service.
#[derive(Debug)]
pub struct VirtualService {
    name: ServiceName,
}

/// A live virtual registration.
#[derive(Debug, PartialEq, Eq)]
pub struct VirtualRegistration(u64);

impl VirtualServiceControl {
    /// A manager where every service exists and every subscription succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a manager from configuration.
    #[must_use]
    pub fn from_config(config: &VirtualConfig) -> Self {
        let control = Self::new();
        {
            let mut state = control.state();
            state.manager_error = config.manager_error.map(SystemErrorCode::from_raw);
            state.missing = config.missing_services.iter().cloned().collect();
            state.rejected = config
                .rejected_services
                .iter()
                .map(|(name, code)| (name.clone(), SystemErrorCode::from_raw(*code)))
                .collect();
            state.simulate_interval = (config.simulate_interval_ms > 0)
                .then(|| Duration::from_millis(config.simulate_interval_ms));
        }
        control
    }

    /// Make opening the manager fail with `code`.
    #[must_use]
    pub fn with_manager_error(self, code: SystemErrorCode) -> Self {
        self.state().manager_error = Some(code);
        self
    }

    /// Make `name` fail to open, as if it were not installed.
    #[must_use]
    pub fn with_missing_service(self, name: impl Into<String>) -> Self {
        self.state().missing.insert(name.into());
        self
    }

    /// Make subscribing to `name` fail with `code`.
    #[must_use]
    pub fn with_rejected_service(self, name: impl Into<String>, code: SystemErrorCode) -> Self {
        self.state().rejected.insert(name.into(), code);
        self
    }

    /// Deliver `flags` to every live registration of `service`.
    ///
    /// Returns the number of registrations the notification was delivered to.
    pub fn notify(&self, service: &str, flags: u32) -> usize {
        let buffers: Vec<_> = self
            .state()
            .live
            .values()
            .filter(|live| live.service.as_str() == service)
            .map(|live| Arc::clone(&live.buffer))
            .collect();
        deliver_all(&buffers, flags)
    }

    /// Deliver `flags` to every live registration.
    pub fn notify_all(&self, flags: u32) -> usize {
        let buffers: Vec<_> = self
            .state()
            .live
            .values()
            .map(|live| Arc::clone(&live.buffer))
            .collect();
        deliver_all(&buffers, flags)
    }

    /// Names of the services with a live registration, in registration order.
    #[must_use]
    pub fn live_services(&self) -> Vec<ServiceName> {
        self.state()
            .live
            .values()
            .map(|live| live.service.clone())
            .collect()
    }

    #[must_use]
    pub fn live_registrations(&self) -> usize {
        self.state().live.len()
    }

    #[must_use]
    pub fn subscribe_calls(&self) -> usize {
        self.inner.subscribe_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn unsubscribe_calls(&self) -> usize {
        self.inner.unsubscribe_calls.load(Ordering::SeqCst)
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn deliver_all(buffers: &[Arc<NotifyBuffer>], flags: u32) -> usize {
    for buffer in buffers {
        buffer.deliver(flags);
    }
    buffers.len()
}

impl ServiceControl for VirtualServiceControl {
    type Manager = VirtualManager;
    type Service = VirtualService;
    type Registration = VirtualRegistration;

    fn open_manager(&self) -> Result<VirtualManager, ScmError> {
        match self.state().manager_error {
            Some(code) => Err(ScmError::ManagerUnavailable { code }),
            None => Ok(VirtualManager(())),
        }
    }

    fn open_service(
        &self,
        _manager: &VirtualManager,
        name: &ServiceName,
    ) -> Result<VirtualService, ScmError> {
        if self.state().missing.contains(name.as_str()) {
            return Err(ScmError::ServiceUnavailable {
                service: name.clone(),
                code: SystemErrorCode::SERVICE_DOES_NOT_EXIST,
            });
        }
        Ok(VirtualService { name: name.clone() })
    }

    fn subscribe(
        &self,
        service: &VirtualService,
        buffer: Arc<NotifyBuffer>,
    ) -> Subscription<VirtualRegistration> {
        self.inner.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();
        if let Some(code) = state.rejected.get(service.name.as_str()) {
            return Subscription::failed(*code);
        }

        state.next_registration += 1;
        let id = state.next_registration;
        state.live.insert(
            id,
            LiveRegistration {
                service: service.name.clone(),
                buffer,
            },
        );
        tracing::trace!(service = %service.name, id, "virtual registration created");
        Subscription::active(VirtualRegistration(id), SystemErrorCode::SUCCESS)
    }

    fn unsubscribe(&self, registration: VirtualRegistration) {
        self.inner.unsubscribe_calls.fetch_add(1, Ordering::SeqCst);
        let removed = self.state().live.remove(&registration.0);
        if let Some(live) = removed {
            tracing::trace!(service = %live.service, id = registration.0, "virtual registration cancelled");
        }
    }
}
