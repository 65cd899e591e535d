//! # Lifecycle Events
//!
//! Publish/subscribe for connection lifecycle and unsolicited server traffic.
//!
//! Handlers registered with [`EventBus::subscribe`] run synchronously on the task that
//! emitted the event (the connection's reader or connect task), so they must not block.
//! Consumers that want to `await` per event should use [`EventBus::stream`] instead.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::SystemTime;

use futures::Stream;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::trace;

use crate::parsers::ChatMessage;

/// Something the connection observed that feature code may want to react to
#[derive(Debug, Clone, PartialEq)]
pub enum RconEvent {
    /// Authentication succeeded and the link is ready for commands
    Connected { timestamp: SystemTime },
    /// The link went away; `reason` is absent for an explicit `disconnect()`
    Disconnected {
        timestamp: SystemTime,
        reason: Option<String>,
    },
    /// Player chat relayed by the server
    Chat {
        timestamp: SystemTime,
        message: ChatMessage,
    },
    /// Unsolicited server packet that is not player chat
    ServerMessage { timestamp: SystemTime, body: String },
}

impl RconEvent {
    pub fn connected() -> Self {
        RconEvent::Connected {
            timestamp: SystemTime::now(),
        }
    }

    pub fn disconnected(reason: Option<String>) -> Self {
        RconEvent::Disconnected {
            timestamp: SystemTime::now(),
            reason,
        }
    }

    pub fn timestamp(&self) -> SystemTime {
        match self {
            RconEvent::Connected { timestamp }
            | RconEvent::Disconnected { timestamp, .. }
            | RconEvent::Chat { timestamp, .. }
            | RconEvent::ServerMessage { timestamp, .. } => *timestamp,
        }
    }

    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            RconEvent::Connected { .. } => "connected",
            RconEvent::Disconnected { .. } => "disconnected",
            RconEvent::Chat { .. } => "chat",
            RconEvent::ServerMessage { .. } => "server_message",
        }
    }
}

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&RconEvent) + Send + Sync>;

/// Fan-out of [`RconEvent`]s to registered handlers
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

#[derive(Default)]
struct BusInner {
    handlers: RwLock<Vec<(SubscriptionId, Handler)>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&RconEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.handlers.write().push((id, Arc::new(handler)));
        id
    }

    /// Returns false if `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.inner.handlers.write();
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        handlers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.handlers.read().len()
    }

    /// Deliver `event` to every handler registered at the time of the call.
    pub fn emit(&self, event: RconEvent) {
        // Snapshot so handlers may subscribe/unsubscribe without deadlocking
        let handlers: Vec<Handler> = self
            .inner
            .handlers
            .read()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        trace!(event = event.kind(), subscribers = handlers.len(), "Emitting event");
        for handler in handlers {
            handler(&event);
        }
    }

    /// Channel-backed subscription; unsubscribes when the stream is dropped.
    pub fn stream(&self) -> EventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.subscribe(move |event| {
            let _ = tx.send(event.clone());
        });
        EventStream {
            inner: UnboundedReceiverStream::new(rx),
            bus: self.clone(),
            id,
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Stream of events from one client
pub struct EventStream {
    inner: UnboundedReceiverStream<RconEvent>,
    bus: EventBus,
    id: SubscriptionId,
}

impl Stream for EventStream {
    type Item = RconEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.id);
    }
}
