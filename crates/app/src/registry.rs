//! Subscription registry: one entry per watched service.
//!
//! [`StatusNotifier`] owns, per service name, the buffer the OS delivers
//! notifications through, the live registration (if any) and the status the
//! OS reported when registering. Buffers are reference counted and never
//! move, so an adapter can hand their address to the OS for as long as a
//! registration lives. Entries are only discarded after every registration
//! has been cancelled: on the next `start`, or when the notifier is dropped.

use std::collections::BTreeMap;
use std::sync::Arc;

use svcwatch_domain::error::SystemErrorCode;
use svcwatch_domain::id::SubscriptionId;
use svcwatch_domain::notify::NotifyMask;
use svcwatch_domain::service::ServiceName;

use crate::dispatch::{ActionFn, DispatchContext, NotifyBuffer};
use crate::ports::{ServiceControl, Subscription};

/// State kept for one watched service.
#[derive(Debug)]
pub struct SubscriptionEntry<R> {
    id: SubscriptionId,
    name: ServiceName,
    buffer: Arc<NotifyBuffer>,
    registration: Option<R>,
    system_error_code: SystemErrorCode,
}

impl<R> SubscriptionEntry<R> {
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &ServiceName {
        &self.name
    }

    /// Whether a registration is currently live for this service.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.registration.is_some()
    }

    /// Status reported by the OS when registering.
    #[must_use]
    pub fn system_error_code(&self) -> SystemErrorCode {
        self.system_error_code
    }

    /// The buffer notifications for this service are delivered through.
    #[must_use]
    pub fn notify_buffer(&self) -> &NotifyBuffer {
        &self.buffer
    }
}

/// Watches a set of services and forwards their status changes to an action.
///
/// `start` and `stop` never fail: services that cannot be opened are left
/// out, and services that could not be subscribed keep an entry carrying
/// the reported error code. Inspect [`entries`](Self::entries) to find out
/// what is actually being watched.
///
/// Dropping the notifier cancels every live registration.
pub struct StatusNotifier<C: ServiceControl> {
    control: C,
    context: Arc<DispatchContext>,
    entries: BTreeMap<ServiceName, SubscriptionEntry<C::Registration>>,
}

impl<C: ServiceControl> StatusNotifier<C> {
    /// Create an idle notifier bound to the given service control port.
    pub fn new(control: C) -> Self {
        Self {
            control,
            context: Arc::new(DispatchContext::default()),
            entries: BTreeMap::new(),
        }
    }

    /// Subscribe to status changes of `services`, replacing any previous set.
    ///
    /// Every earlier registration is cancelled and every earlier entry
    /// discarded first. Services are then processed in the given order;
    /// invalid names, duplicates and services that cannot be opened are
    /// skipped without affecting the others.
    ///
    /// `action` runs on the OS delivery thread for each notification whose
    /// flags are zero or a subset of `filter_mask`. It must not block.
    pub fn start<I, S, A>(&mut self, services: I, filter_mask: NotifyMask, action: A)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        A: Fn(&ServiceName, u32) + Send + Sync + 'static,
    {
        let action: ActionFn = Arc::new(action);
        self.restart(services, DispatchContext::new(filter_mask, Some(action)));
    }

    fn restart<I, S>(&mut self, services: I, context: DispatchContext)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stop();
        self.entries.clear();
        self.context = Arc::new(context);

        let manager = match self.control.open_manager() {
            Ok(manager) => manager,
            Err(err) => {
                tracing::warn!(%err, "service control manager unavailable, nothing watched");
                return;
            }
        };

        let mut requested = 0_usize;
        for raw in services {
            requested += 1;
            let raw = raw.as_ref();

            let name = match ServiceName::new(raw) {
                Ok(name) => name,
                Err(err) => {
                    tracing::warn!(service = raw, %err, "skipping invalid service name");
                    continue;
                }
            };
            if self.entries.contains_key(&name) {
                tracing::debug!(service = %name, "skipping duplicate service name");
                continue;
            }

            let service = match self.control.open_service(&manager, &name) {
                Ok(service) => service,
                Err(err) => {
                    tracing::warn!(%err, "skipping service that cannot be opened");
                    continue;
                }
            };

            let buffer = Arc::new(NotifyBuffer::wired(
                Arc::clone(&self.context),
                name.clone(),
            ));
            let Subscription { registration, code } =
                self.control.subscribe(&service, Arc::clone(&buffer));
            drop(service);

            let id = SubscriptionId::new();
            if registration.is_some() {
                tracing::debug!(service = %name, %id, "subscribed to status changes");
            } else {
                tracing::warn!(service = %name, %id, %code, "status change subscription failed");
            }

            self.entries.insert(
                name.clone(),
                SubscriptionEntry {
                    id,
                    name,
                    buffer,
                    registration,
                    system_error_code: code,
                },
            );
        }
        drop(manager);

        tracing::info!(
            requested,
            active = self.active_count(),
            mask = %self.context.filter_mask(),
            "service notifications started"
        );
    }

    /// Cancel every live registration. Calling it again is a no-op.
    ///
    /// Entries stay in place (inactive) so that a notification already in
    /// flight still finds its buffer.
    pub fn stop(&mut self) {
        let mut cancelled = 0_usize;
        for entry in self.entries.values_mut() {
            if let Some(registration) = entry.registration.take() {
                self.control.unsubscribe(registration);
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            tracing::info!(cancelled, "service notifications stopped");
        }
    }

    /// Entry for `name`, if the service was opened by the last `start`.
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&SubscriptionEntry<C::Registration>> {
        self.entries.get(name)
    }

    /// All entries created by the last `start`, ordered by name.
    pub fn entries(&self) -> impl Iterator<Item = &SubscriptionEntry<C::Registration>> {
        self.entries.values()
    }

    /// Number of live registrations.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.entries.values().filter(|entry| entry.is_active()).count()
    }

    /// Mask installed by the last `start`.
    #[must_use]
    pub fn filter_mask(&self) -> NotifyMask {
        self.context.filter_mask()
    }

    /// The underlying service control port.
    #[must_use]
    pub fn control(&self) -> &C {
        &self.control
    }
}

impl<C: ServiceControl> Drop for StatusNotifier<C> {
    fn drop(&mut self) {
        self.stop();
    }
}
