//! # RCON Connection
//!
//! Owns the one TCP link of a client: opening and authenticating it, the reader task
//! that drains it, reconnection, and teardown.
//!
//! ## State machine
//! ```text
//! Disconnected -> Connecting -> Authenticating -> Ready
//!       ^              |              |             |
//!       +--------------+--------------+-------------+   (error, link lost)
//! any state -> Disconnecting -> Disconnected            (disconnect)
//! ```
//!
//! The state and the live link sit under one lock so they always change together.
//! Concurrent [`Connection::connect`] calls share a single in-flight attempt, which means
//! at most one socket and one authentication exist per client at any time.
//!
//! Every `disconnect()` bumps an epoch counter. Work started under an older epoch (a
//! connect attempt, a reconnect loop) checks it before touching the state and gives up
//! if it changed.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rand::Rng;
use tokio::net::TcpStream;
use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::codec::Framed;
use tracing::{debug, error, info, instrument, warn};

use crate::core::codec::RconCodec;
use crate::core::packet::{Packet, PacketType};
use crate::config::RconConfig;
use crate::error::{constants, RconError, Result};
use crate::events::{EventBus, RconEvent};
use crate::parsers::parse_chat_message;
use crate::protocol::handshake::authenticate;
use crate::utils::idgen::IdGenerator;
use crate::utils::metrics::Metrics;
use crate::utils::timeout::{backoff_delay, with_timeout_error, CLOSE_TIMEOUT};

type FramedStream = Framed<TcpStream, RconCodec>;
type Writer = SplitSink<FramedStream, Packet>;
type Reader = SplitStream<FramedStream>;
type ConnectFuture = Shared<BoxFuture<'static, Result<()>>>;

/// Lifecycle state of a client's link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Authenticating,
    Ready,
    Disconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Authenticating => "authenticating",
            ConnectionState::Ready => "ready",
            ConnectionState::Disconnecting => "disconnecting",
        };
        f.write_str(name)
    }
}

/// Receives every non-chat packet read from the link.
///
/// Implemented by the dispatcher's pending-request table. Both methods are called from
/// the reader task and must not block.
pub trait PacketRouter: Send + Sync + 'static {
    fn route(&self, packet: Packet);

    /// The link is gone; everything in flight has to fail with `error`.
    fn link_lost(&self, error: &RconError);
}

struct Link {
    session: u64,
    writer: Arc<tokio::sync::Mutex<Writer>>,
    reader: AbortHandle,
}

struct Slot {
    state: ConnectionState,
    link: Option<Link>,
}

struct PendingConnect {
    attempt: u64,
    future: ConnectFuture,
    task: AbortHandle,
}

struct ConnectionInner {
    config: RconConfig,
    slot: Mutex<Slot>,
    pending: Mutex<Option<PendingConnect>>,
    epoch: AtomicU64,
    attempts: AtomicU64,
    sessions: AtomicU64,
    ids: Arc<IdGenerator>,
    events: EventBus,
    router: Arc<dyn PacketRouter>,
    metrics: Arc<Metrics>,
}

/// Cloneable handle to a client's link
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl Connection {
    pub fn new(
        config: RconConfig,
        ids: Arc<IdGenerator>,
        events: EventBus,
        router: Arc<dyn PacketRouter>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                config,
                slot: Mutex::new(Slot {
                    state: ConnectionState::Disconnected,
                    link: None,
                }),
                pending: Mutex::new(None),
                epoch: AtomicU64::new(0),
                attempts: AtomicU64::new(0),
                sessions: AtomicU64::new(0),
                ids,
                events,
                router,
                metrics,
            }),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.slot.lock().state
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ConnectionState::Ready
    }

    /// Bring the link to `Ready`.
    ///
    /// Returns immediately when already ready. Otherwise joins the in-flight attempt, or
    /// starts one if there is none. The attempt runs on its own task, so it makes
    /// progress even if every caller stops waiting.
    pub async fn connect(&self) -> Result<()> {
        let attempt = {
            // Lock order: pending, then slot
            let mut pending = self.inner.pending.lock();
            if self.is_ready() {
                return Ok(());
            }
            match pending.as_ref() {
                Some(existing) => {
                    debug!(attempt = existing.attempt, "Joining in-flight connection attempt");
                    existing.future.clone()
                }
                None => {
                    let started = self.start_attempt();
                    let future = started.future.clone();
                    *pending = Some(started);
                    future
                }
            }
        };

        attempt.await
    }

    fn start_attempt(&self) -> PendingConnect {
        let attempt = self.inner.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let this = self.clone();

        let task: JoinHandle<Result<()>> = tokio::spawn(async move {
            let result = this.establish().await;
            let mut pending = this.inner.pending.lock();
            if pending.as_ref().map(|p| p.attempt) == Some(attempt) {
                *pending = None;
            }
            result
        });
        let abort = task.abort_handle();

        let future: BoxFuture<'static, Result<()>> = async move {
            match task.await {
                Ok(result) => result,
                Err(join) if join.is_cancelled() => Err(RconError::ConnectionClosed),
                Err(join) => Err(RconError::Runtime(join.to_string())),
            }
        }
        .boxed();

        PendingConnect {
            attempt,
            future: future.shared(),
            task: abort,
        }
    }

    #[instrument(skip(self), fields(addr = %self.inner.config.address()))]
    async fn establish(&self) -> Result<()> {
        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        if !self.advance(epoch, ConnectionState::Connecting) {
            return Err(RconError::ConnectionClosed);
        }
        self.inner.metrics.connection_attempt();

        match self.open_session(epoch).await {
            Ok(()) => Ok(()),
            Err(err) => {
                if matches!(err, RconError::Authentication) {
                    self.inner.metrics.auth_failed();
                } else {
                    warn!(error = %err, "Connection attempt failed");
                }

                let reset = {
                    let mut slot = self.inner.slot.lock();
                    let current = self.inner.epoch.load(Ordering::SeqCst) == epoch;
                    if current && slot.state != ConnectionState::Ready {
                        slot.state = ConnectionState::Disconnected;
                    }
                    current
                };
                if reset {
                    self.inner
                        .events
                        .emit(RconEvent::disconnected(Some(err.to_string())));
                }
                Err(err)
            }
        }
    }

    async fn open_session(&self, epoch: u64) -> Result<()> {
        let config = &self.inner.config;
        let addr = config.address();

        let stream = with_timeout_error(
            async { TcpStream::connect(&addr).await.map_err(RconError::from) },
            config.connect_timeout,
            RconError::ConnectionTimeout(constants::STAGE_SOCKET),
        )
        .await?;
        stream.set_nodelay(true)?;
        debug!(%addr, "Socket open");

        if !self.advance(epoch, ConnectionState::Authenticating) {
            return Err(RconError::ConnectionClosed);
        }

        let mut framed = Framed::new(stream, RconCodec::new(config.max_packet_size));
        authenticate(
            &mut framed,
            &config.password,
            self.inner.ids.next_id(),
            config.auth_timeout,
        )
        .await?;

        let (writer, reader) = framed.split();
        let session = self.inner.sessions.fetch_add(1, Ordering::SeqCst) + 1;

        {
            let mut slot = self.inner.slot.lock();
            if self.inner.epoch.load(Ordering::SeqCst) != epoch {
                // disconnect() won the race; dropping both halves closes the socket
                return Err(RconError::ConnectionClosed);
            }
            let reader = tokio::spawn(self.clone().read_loop(reader, session));
            slot.link = Some(Link {
                session,
                writer: Arc::new(tokio::sync::Mutex::new(writer)),
                reader: reader.abort_handle(),
            });
            slot.state = ConnectionState::Ready;
        }

        self.inner.metrics.connection_established();
        info!(session, "RCON connection ready");
        self.inner.events.emit(RconEvent::connected());
        Ok(())
    }

    /// Move to `next` unless a disconnect happened since `epoch` was read.
    fn advance(&self, epoch: u64, next: ConnectionState) -> bool {
        let mut slot = self.inner.slot.lock();
        if self.inner.epoch.load(Ordering::SeqCst) != epoch {
            return false;
        }
        debug!(from = %slot.state, to = %next, "Connection state change");
        slot.state = next;
        true
    }

    async fn read_loop(self, mut reader: Reader, session: u64) {
        let error = loop {
            match reader.next().await {
                Some(Ok(packet)) => {
                    self.inner.metrics.packet_received(packet.wire_len() as u64);
                    if packet.kind == PacketType::CHAT_VALUE {
                        self.publish_unsolicited(packet);
                    } else {
                        self.inner.router.route(packet);
                    }
                }
                Some(Err(err)) => {
                    if matches!(err, RconError::Protocol(_)) {
                        self.inner.metrics.protocol_error();
                    }
                    break err;
                }
                None => {
                    debug!(session, "{}", constants::ERR_CLOSED_BY_PEER);
                    break RconError::ConnectionClosed;
                }
            }
        };

        self.drop_link(Some(session), error);
    }

    fn publish_unsolicited(&self, packet: Packet) {
        let timestamp = std::time::SystemTime::now();
        let body = packet.text();
        let event = match parse_chat_message(&body) {
            Some(message) => RconEvent::Chat { timestamp, message },
            None => RconEvent::ServerMessage {
                timestamp,
                body: body.into_owned(),
            },
        };
        self.inner.events.emit(event);
    }

    /// Write `packets` back to back and flush once.
    ///
    /// A write failure drops the link the same way a read failure does.
    pub async fn send(&self, packets: Vec<Packet>) -> Result<()> {
        let (writer, session) = {
            let slot = self.inner.slot.lock();
            match (&slot.state, &slot.link) {
                (ConnectionState::Ready, Some(link)) => (Arc::clone(&link.writer), link.session),
                _ => return Err(RconError::ConnectionClosed),
            }
        };

        let result = {
            let mut sink = writer.lock().await;
            let mut written = Ok(());
            for packet in packets {
                let len = packet.wire_len() as u64;
                if let Err(err) = sink.feed(packet).await {
                    written = Err(err);
                    break;
                }
                self.inner.metrics.packet_sent(len);
            }
            match written {
                Ok(()) => sink.flush().await,
                Err(err) => Err(err),
            }
        };

        if let Err(err) = &result {
            self.drop_link(Some(session), err.clone());
        }
        result
    }

    /// Drop the current link and immediately start a replacement.
    ///
    /// Used after a command timeout, when the stream position of the late reply is
    /// unknown and the link can no longer be trusted. The replacement attempt is started
    /// regardless of `auto_reconnect`, and is registered before this returns, so the next
    /// [`Connection::connect`] joins it.
    pub fn recycle(&self, reason: RconError) {
        if !self.teardown(None, reason) {
            return;
        }

        let mut pending = self.inner.pending.lock();
        if pending.is_none() && !self.is_ready() {
            let started = self.start_attempt();
            debug!(attempt = started.attempt, "Re-establishing recycled link");
            *pending = Some(started);
        }
    }

    /// True while a connect attempt is in flight
    pub fn is_connecting(&self) -> bool {
        self.inner.pending.lock().is_some()
    }

    /// Tear down a lost link and, when enabled, schedule background reconnection.
    fn drop_link(&self, session: Option<u64>, error: RconError) {
        let reconnect =
            self.inner.config.auto_reconnect && !matches!(error, RconError::Authentication);
        if self.teardown(session, error) && reconnect {
            self.schedule_reconnect();
        }
    }

    /// Tear down the live link if it is still `session` (any link when `None`).
    ///
    /// Returns false when there was nothing to tear down.
    fn teardown(&self, session: Option<u64>, error: RconError) -> bool {
        let link = {
            let mut slot = self.inner.slot.lock();
            let matches = match (&slot.link, session) {
                (Some(link), Some(session)) => link.session == session,
                (Some(_), None) => true,
                (None, _) => false,
            };
            if !matches {
                return false;
            }
            slot.state = ConnectionState::Disconnected;
            slot.link.take()
        };

        if let Some(link) = link {
            // Dropping the writer and aborting the reader closes the socket
            link.reader.abort();
            warn!(session = link.session, error = %error, "RCON link lost");
        }

        self.inner.metrics.disconnected();
        self.inner.router.link_lost(&error);
        self.inner
            .events
            .emit(RconEvent::disconnected(Some(error.to_string())));
        true
    }

    fn schedule_reconnect(&self) {
        let max_attempts = self.inner.config.max_reconnect_attempts;
        if max_attempts == 0 {
            return;
        }

        let this = self.clone();
        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        let base = self.inner.config.reconnect_delay;

        tokio::spawn(async move {
            for attempt in 1..=max_attempts {
                tokio::time::sleep(with_jitter(backoff_delay(base, attempt))).await;

                if this.inner.epoch.load(Ordering::SeqCst) != epoch || this.is_ready() {
                    return;
                }

                match this.connect().await {
                    Ok(()) => {
                        this.inner.metrics.reconnected();
                        info!(attempt, "Reconnected");
                        return;
                    }
                    Err(RconError::Authentication) => {
                        error!("Reconnect rejected by server, giving up");
                        return;
                    }
                    Err(err) => {
                        warn!(attempt, max_attempts, error = %err, "Reconnect attempt failed")
                    }
                }
            }
            warn!(max_attempts, "Giving up on automatic reconnection");
        });
    }

    /// Close the link and cancel any connect attempt.
    ///
    /// Valid in every state. Does not touch the dispatcher's queue; the client does that.
    #[instrument(skip(self))]
    pub async fn disconnect(&self) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);

        if let Some(pending) = self.inner.pending.lock().take() {
            debug!(attempt = pending.attempt, "Cancelling in-flight connection attempt");
            pending.task.abort();
        }

        let (previous, link) = {
            let mut slot = self.inner.slot.lock();
            let previous = slot.state;
            slot.state = ConnectionState::Disconnecting;
            (previous, slot.link.take())
        };

        if let Some(link) = link {
            link.reader.abort();
            let close = async {
                let mut sink = link.writer.lock().await;
                sink.close().await
            };
            if let Err(err) = with_timeout_error(
                close,
                CLOSE_TIMEOUT,
                RconError::ConnectionTimeout(constants::STAGE_SOCKET),
            )
            .await
            {
                debug!(error = %err, "Socket did not close cleanly");
            }
            self.inner.metrics.disconnected();
        }

        {
            let mut slot = self.inner.slot.lock();
            if slot.state == ConnectionState::Disconnecting {
                slot.state = ConnectionState::Disconnected;
            }
        }

        self.inner.router.link_lost(&RconError::ConnectionClosed);
        if previous != ConnectionState::Disconnected {
            info!(from = %previous, "Disconnected");
            self.inner.events.emit(RconEvent::disconnected(None));
        }
    }

    /// Synchronous teardown for when the owning client is dropped. No events are emitted.
    pub fn abort(&self) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(pending) = self.inner.pending.lock().take() {
            pending.task.abort();
        }
        let link = {
            let mut slot = self.inner.slot.lock();
            slot.state = ConnectionState::Disconnected;
            slot.link.take()
        };
        if let Some(link) = link {
            link.reader.abort();
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("addr", &self.inner.config.address())
            .field("state", &self.state())
            .finish()
    }
}

/// `delay` plus up to 25% random jitter
fn with_jitter(delay: Duration) -> Duration {
    let spread = (delay.as_millis() / 4) as u64;
    if spread == 0 {
        return delay;
    }
    delay + Duration::from_millis(rand::rng().random_range(0..=spread))
}
