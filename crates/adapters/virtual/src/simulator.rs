//! Simulated service activity for demos.
//!
//! Every watched virtual service alternates between stopped and running on
//! a fixed period, and each transition is delivered to the live
//! registrations exactly as the OS would.

use std::time::Duration;

use tokio::task::JoinHandle;

use svcwatch_domain::notify::StatusChange;

use crate::VirtualServiceControl;

impl VirtualServiceControl {
    /// Spawn a task cycling every live service between stopped and running.
    ///
    /// The first transition is a stop, one `interval` after spawning.
    #[must_use]
    pub fn simulate(&self, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(cycle(self.clone(), interval))
    }

    /// Spawn the cycle configured by `simulate_interval_ms`, if any.
    #[must_use]
    pub fn start_simulation(&self) -> Option<JoinHandle<()>> {
        let interval = self.state().simulate_interval?;
        Some(self.simulate(interval))
    }
}

async fn cycle(control: VirtualServiceControl, interval: Duration) {
    let mut next = StatusChange::Stopped;
    loop {
        tokio::time::sleep(interval).await;
        let delivered = control.notify_all(next.bit());
        tracing::debug!(change = %next, delivered, "simulated service transition");
        next = match next {
            StatusChange::Stopped => StatusChange::Running,
            _ => StatusChange::Stopped,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use svcwatch_app::registry::StatusNotifier;
    use svcwatch_domain::notify::NotifyMask;
    use svcwatch_domain::service::ServiceName;

    use crate::VirtualConfig;

    #[tokio::test(start_paused = true)]
    async fn should_alternate_stopped_and_running() {
        let control = VirtualServiceControl::new();
        let mut notifier = StatusNotifier::new(control.clone());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        notifier.start(["Alpha"], NotifyMask::ALL, move |_: &ServiceName, flags: u32| {
            sink.lock().unwrap().push(flags);
        });

        let handle = control.simulate(Duration::from_millis(100));
        tokio::time::sleep(Duration::from_millis(350)).await;
        handle.abort();

        assert_eq!(*seen.lock().unwrap(), vec![0x1, 0x8, 0x1]);
    }

    #[tokio::test(start_paused = true)]
    async fn should_run_configured_simulation() {
        let config = VirtualConfig {
            simulate_interval_ms: 100,
            ..VirtualConfig::default()
        };
        let control = VirtualServiceControl::from_config(&config);
        let mut notifier = StatusNotifier::new(control.clone());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        notifier.start(["Alpha"], NotifyMask::ALL, move |_: &ServiceName, flags: u32| {
            sink.lock().unwrap().push(flags);
        });

        let handle = control.start_simulation().unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        handle.abort();

        assert_eq!(*seen.lock().unwrap(), vec![0x1, 0x8]);
    }

    #[tokio::test]
    async fn should_not_simulate_when_interval_is_zero() {
        let control = VirtualServiceControl::from_config(&VirtualConfig::default());
        assert!(control.start_simulation().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn should_deliver_nothing_without_registrations() {
        let control = VirtualServiceControl::new();
        let handle = control.simulate(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();
        assert_eq!(control.live_registrations(), 0);
    }
}
