//! # Command Dispatcher
//!
//! Serializes command execution over the client's single connection.
//!
//! Calls to [`Dispatcher::send`] enqueue a job immediately, so queue order is call
//! order. One worker task drains the queue and keeps exactly one command on the wire at a
//! time: it writes the command and its probe, then waits until the [`ResponseRouter`]
//! reports the probe's echo (or the deadline passes) before touching the next job.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::config::RconConfig;
use crate::core::packet::{Packet, PacketType};
use crate::error::{RconError, Result};
use crate::protocol::reassembler::{Progress, Reassembler};
use crate::transport::connection::{Connection, PacketRouter};
use crate::utils::idgen::IdGenerator;
use crate::utils::metrics::{Metrics, Timer};

type Responder = oneshot::Sender<Result<String>>;

/// A command that has been written and is waiting for its probe echo
#[derive(Debug)]
pub struct PendingRequest {
    pub command_id: i32,
    pub probe_id: i32,
    pub issued_at: Instant,
    reassembler: Reassembler,
    responder: Responder,
}

impl PendingRequest {
    pub fn new(command_id: i32, probe_id: i32, responder: Responder) -> Self {
        Self {
            command_id,
            probe_id,
            issued_at: Instant::now(),
            reassembler: Reassembler::new(command_id, probe_id),
            responder,
        }
    }
}

#[derive(Default)]
struct RouteTable {
    pending: HashMap<i32, PendingRequest>,
    /// probe id -> command id
    probes: HashMap<i32, i32>,
}

/// Pending-request table keyed by packet id
#[derive(Default)]
pub struct ResponseRouter {
    table: Mutex<RouteTable>,
}

impl ResponseRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, request: PendingRequest) {
        let mut table = self.table.lock();
        table.probes.insert(request.probe_id, request.command_id);
        table.pending.insert(request.command_id, request);
    }

    /// Forget a request without resolving it. Returns false if it was already gone.
    pub fn cancel(&self, command_id: i32) -> bool {
        let mut table = self.table.lock();
        match table.pending.remove(&command_id) {
            Some(request) => {
                table.probes.remove(&request.probe_id);
                true
            }
            None => false,
        }
    }

    /// Reject every pending request with `error`.
    pub fn fail_all(&self, error: &RconError) -> usize {
        let drained: Vec<PendingRequest> = {
            let mut table = self.table.lock();
            table.probes.clear();
            table.pending.drain().map(|(_, request)| request).collect()
        };
        let count = drained.len();
        for request in drained {
            let _ = request.responder.send(Err(error.clone()));
        }
        count
    }

    pub fn in_flight(&self) -> usize {
        self.table.lock().pending.len()
    }
}

impl PacketRouter for ResponseRouter {
    fn route(&self, packet: Packet) {
        let mut table = self.table.lock();

        let command_id = if table.pending.contains_key(&packet.id) {
            packet.id
        } else if let Some(command_id) = table.probes.get(&packet.id) {
            *command_id
        } else {
            // Late replies to cancelled commands, or Squad's extra packet after a probe echo
            trace!(id = packet.id, kind = ?packet.kind, "Dropping packet with no pending request");
            return;
        };

        let Some(request) = table.pending.get_mut(&command_id) else {
            return;
        };
        let Progress::Complete(body) = request.reassembler.push(packet) else {
            return;
        };

        let Some(request) = table.pending.remove(&command_id) else {
            return;
        };
        table.probes.remove(&request.probe_id);
        drop(table);

        debug!(
            command_id = request.reassembler.command_id(),
            probe_id = request.reassembler.probe_id(),
            fragments = request.reassembler.fragments(),
            elapsed_ms = request.issued_at.elapsed().as_millis() as u64,
            "Response complete"
        );
        let _ = request.responder.send(Ok(body));
    }

    fn link_lost(&self, error: &RconError) {
        let failed = self.fail_all(error);
        if failed > 0 {
            debug!(failed, error = %error, "Failed in-flight requests after link loss");
        }
    }
}

struct Job {
    command: String,
    generation: u64,
    enqueued_at: Instant,
    responder: Responder,
}

struct DispatcherInner {
    config: RconConfig,
    connection: Connection,
    router: Arc<ResponseRouter>,
    queue: Mutex<VecDeque<Job>>,
    notify: Notify,
    /// Bumped by `cancel_all`; jobs from an older generation are rejected
    generation: AtomicU64,
    ids: Arc<IdGenerator>,
    metrics: Arc<Metrics>,
}

/// FIFO command queue with a single worker
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

impl Dispatcher {
    pub fn new(
        config: RconConfig,
        connection: Connection,
        router: Arc<ResponseRouter>,
        ids: Arc<IdGenerator>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                config,
                connection,
                router,
                queue: Mutex::new(VecDeque::new()),
                notify: Notify::new(),
                generation: AtomicU64::new(0),
                ids,
                metrics,
            }),
        }
    }

    /// Queue `command` and return a future for its response.
    ///
    /// The command is queued before this returns, not when the future is first polled.
    /// Dropping the future before the command's turn removes it from the run.
    pub fn send(
        &self,
        command: impl Into<String>,
    ) -> impl Future<Output = Result<String>> + Send + 'static {
        let (tx, rx) = oneshot::channel();
        let job = Job {
            command: command.into(),
            generation: self.inner.generation.load(Ordering::SeqCst),
            enqueued_at: Instant::now(),
            responder: tx,
        };
        trace!(command = %job.command, "Queued command");
        self.inner.queue.lock().push_back(job);
        self.inner.notify.notify_one();

        async move { rx.await.unwrap_or(Err(RconError::ConnectionClosed)) }
    }

    pub fn queued(&self) -> usize {
        self.inner.queue.lock().len()
    }

    pub fn in_flight(&self) -> usize {
        self.inner.router.in_flight()
    }

    pub fn spawn_worker(&self) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move { this.run().await })
    }

    async fn run(self) {
        loop {
            let next = self.inner.queue.lock().pop_front();
            let Some(job) = next else {
                self.inner.notify.notified().await;
                continue;
            };

            if job.responder.is_closed() {
                debug!(command = %job.command, "Skipping command abandoned by caller");
                continue;
            }

            let queued_ms = job.enqueued_at.elapsed().as_millis() as u64;
            trace!(command = %job.command, queued_ms, "Dispatching command");

            let result = self.process(&job.command, job.generation).await;
            match &result {
                Ok(_) => self.inner.metrics.command_succeeded(),
                Err(_) => self.inner.metrics.command_failed(),
            }
            let _ = job.responder.send(result);
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.generation.load(Ordering::SeqCst) == generation
    }

    async fn process(&self, command: &str, generation: u64) -> Result<String> {
        let _timer = Timer::start("rcon_command");

        let command_id = self.inner.ids.next_id();
        let probe_id = self.inner.ids.next_id();
        let request = Packet::new(command_id, PacketType::EXEC_COMMAND, command);
        // Unframeable commands fail before anything touches the link
        request.validate(self.inner.config.max_packet_size)?;

        let connection = &self.inner.connection;
        if !connection.is_ready() {
            // A link recycled after a timeout is always being replaced; join that attempt
            if !self.inner.config.auto_reconnect && !connection.is_connecting() {
                return Err(RconError::NotConnected);
            }
            connection.connect().await?;
        }
        // A disconnect() while we were connecting cancels this job too
        if !self.is_current(generation) {
            return Err(RconError::ConnectionClosed);
        }

        let (tx, rx) = oneshot::channel();
        self.inner
            .router
            .register(PendingRequest::new(command_id, probe_id, tx));

        let deadline = self.inner.config.command_timeout;
        let exchange = async {
            self.inner
                .connection
                .send(vec![request, Packet::probe(probe_id)])
                .await?;
            self.inner.metrics.command_sent();
            debug!(command, command_id, probe_id, "Command written");
            rx.await.unwrap_or(Err(RconError::ConnectionClosed))
        };

        match tokio::time::timeout(deadline, exchange).await {
            Ok(Ok(body)) => Ok(body),
            Ok(Err(err)) => {
                self.inner.router.cancel(command_id);
                Err(err)
            }
            Err(_) => {
                self.inner.router.cancel(command_id);
                self.inner.metrics.command_timed_out();
                warn!(
                    command,
                    command_id,
                    timeout_ms = deadline.as_millis() as u64,
                    "Command timed out, recycling connection"
                );
                let error = RconError::CommandTimeout {
                    command: command.to_string(),
                    timeout: deadline,
                };
                self.inner.connection.recycle(error.clone());
                Err(error)
            }
        }
    }

    /// Reject every queued and in-flight command with `ConnectionClosed`.
    pub fn cancel_all(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);

        let drained: Vec<Job> = self.inner.queue.lock().drain(..).collect();
        let queued = drained.len();
        for job in drained {
            let _ = job.responder.send(Err(RconError::ConnectionClosed));
        }
        let in_flight = self.inner.router.fail_all(&RconError::ConnectionClosed);

        if queued + in_flight > 0 {
            debug!(queued, in_flight, "Cancelled outstanding commands");
        }
    }
}
