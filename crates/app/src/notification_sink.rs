//! In-process notification sink backed by a bounded tokio channel.
//!
//! The action handed to [`StatusNotifier::start`](crate::registry::StatusNotifier::start)
//! runs on the OS delivery thread and must not block. [`NotificationSink::action`]
//! builds such an action: it stamps each notification and `try_send`s it,
//! dropping (and counting) it when the channel is full.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use svcwatch_domain::notification::ServiceNotification;
use svcwatch_domain::service::ServiceName;

/// Stream of notifications forwarded by a [`NotificationSink`].
pub type NotificationStream = ReceiverStream<ServiceNotification>;

/// Forwards delivered notifications into an async stream.
#[derive(Clone)]
pub struct NotificationSink {
    sender: mpsc::Sender<ServiceNotification>,
    dropped: Arc<AtomicU64>,
}

impl NotificationSink {
    /// Create a sink buffering up to `capacity` notifications, and the
    /// stream that receives them.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, NotificationStream) {
        let (sender, receiver) = mpsc::channel(capacity);
        let sink = Self {
            sender,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (sink, ReceiverStream::new(receiver))
    }

    /// A non-blocking action suitable for the OS delivery thread.
    pub fn action(&self) -> impl Fn(&ServiceName, u32) + Send + Sync + 'static {
        let sender = self.sender.clone();
        let dropped = Arc::clone(&self.dropped);
        move |service: &ServiceName, flags: u32| {
            let notification = ServiceNotification::new(service.clone(), flags);
            // Full channel or closed receiver: the notification is lost.
            if sender.try_send(notification).is_err() {
                dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Notifications lost because the channel was full or closed.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt as _;

    fn alpha() -> ServiceName {
        ServiceName::new("Alpha").unwrap()
    }

    #[tokio::test]
    async fn should_forward_notification_to_stream() {
        let (sink, mut stream) = NotificationSink::new(4);
        let action = sink.action();

        action(&alpha(), 0x1);

        let received = stream.next().await.unwrap();
        assert_eq!(received.service, alpha());
        assert_eq!(received.flags, 0x1);
        assert_eq!(sink.dropped(), 0);
    }

    #[tokio::test]
    async fn should_preserve_delivery_order() {
        let (sink, mut stream) = NotificationSink::new(4);
        let action = sink.action();

        action(&alpha(), 0x8);
        action(&alpha(), 0x1);

        assert_eq!(stream.next().await.unwrap().flags, 0x8);
        assert_eq!(stream.next().await.unwrap().flags, 0x1);
    }

    #[tokio::test]
    async fn should_drop_and_count_when_channel_full() {
        let (sink, mut stream) = NotificationSink::new(1);
        let action = sink.action();

        action(&alpha(), 0x1);
        action(&alpha(), 0x2);
        action(&alpha(), 0x4);

        assert_eq!(sink.dropped(), 2);
        assert_eq!(stream.next().await.unwrap().flags, 0x1);
    }

    #[test]
    fn should_not_block_when_receiver_is_gone() {
        let (sink, stream) = NotificationSink::new(1);
        drop(stream);

        let action = sink.action();
        action(&alpha(), 0x1);

        assert_eq!(sink.dropped(), 1);
    }

    #[test]
    fn should_deliver_from_plain_os_thread() {
        let (sink, stream) = NotificationSink::new(8);
        let action = sink.action();

        std::thread::spawn(move || action(&alpha(), 0x1))
            .join()
            .unwrap();

        let mut receiver = stream.into_inner();
        let received = receiver.try_recv().unwrap();
        assert_eq!(received.service.as_str(), "Alpha");
    }
}
