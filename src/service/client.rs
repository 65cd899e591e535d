//! # RCON Client
//!
//! [`RconClient`] is the handle feature code holds for one game server. It wires the
//! connection, the dispatcher and the event bus together and exposes commands as plain
//! async calls.
//!
//! ## Example
//! ```rust,no_run
//! use squad_rcon::{RconClient, RconConfig};
//!
//! # async fn run() -> squad_rcon::Result<()> {
//! let client = RconClient::new(RconConfig::new("127.0.0.1", 21114, "secret"))?;
//! client.connect().await?;
//!
//! let players = client.list_players().await?;
//! for player in players.iter().filter(|p| p.squad_id.is_none()) {
//!     if let Some(id) = player.admin_id() {
//!         client.warn(id, "Please join a squad").await?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::config::RconConfig;
use crate::error::{constants, RconError, Result};
use crate::events::{EventBus, EventStream, RconEvent, SubscriptionId};
use crate::parsers::{
    parse_current_map, parse_list_players, parse_list_squads, parse_next_map, Listing, MapInfo,
    ParseError, PlayerRecord, SquadRecord,
};
use crate::protocol::dispatcher::{Dispatcher, ResponseRouter};
use crate::service::commands;
use crate::transport::connection::{Connection, ConnectionState};
use crate::utils::idgen::IdGenerator;
use crate::utils::metrics::{Metrics, MetricsSnapshot};

/// Response of a queued command. The command is already queued when this is returned.
pub type CommandFuture = BoxFuture<'static, Result<String>>;

struct ClientInner {
    config: RconConfig,
    connection: Connection,
    dispatcher: Dispatcher,
    events: EventBus,
    metrics: Arc<Metrics>,
    worker: JoinHandle<()>,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        self.worker.abort();
        self.connection.abort();
    }
}

/// Handle to one game server's RCON channel. Cheap to clone.
#[derive(Clone)]
pub struct RconClient {
    inner: Arc<ClientInner>,
}

impl RconClient {
    /// Build a client. Does not connect.
    ///
    /// Must be called inside a Tokio runtime; the dispatcher worker is spawned here.
    pub fn new(config: RconConfig) -> Result<Self> {
        config.validate_strict()?;
        Handle::try_current()
            .map_err(|e| RconError::Runtime(format!("{}: {e}", constants::ERR_NO_RUNTIME)))?;

        let ids = Arc::new(IdGenerator::new());
        let metrics = Arc::new(Metrics::new());
        let events = EventBus::new();
        let router = Arc::new(ResponseRouter::new());

        let connection = Connection::new(
            config.clone(),
            Arc::clone(&ids),
            events.clone(),
            router.clone(),
            Arc::clone(&metrics),
        );
        let dispatcher = Dispatcher::new(
            config.clone(),
            connection.clone(),
            router,
            ids,
            Arc::clone(&metrics),
        );

        let worker = dispatcher.spawn_worker();

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                connection,
                dispatcher,
                events,
                metrics,
                worker,
            }),
        })
    }

    pub fn config(&self) -> &RconConfig {
        &self.inner.config
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.connection.state()
    }

    /// Connect and authenticate. Idempotent; concurrent calls share one attempt.
    #[instrument(skip(self), fields(addr = %self.inner.config.address()))]
    pub async fn connect(&self) -> Result<()> {
        self.inner.connection.connect().await
    }

    /// Close the connection and fail every queued or in-flight command with
    /// [`RconError::ConnectionClosed`].
    #[instrument(skip(self), fields(addr = %self.inner.config.address()))]
    pub async fn disconnect(&self) {
        self.inner.dispatcher.cancel_all();
        self.inner.connection.disconnect().await;
        info!("RCON client disconnected");
    }

    /// Run a raw command and return its full response text.
    ///
    /// The command is queued when this is called; awaiting only waits for the result.
    /// Connects first if needed (unless automatic reconnection is off).
    pub fn execute(&self, command: impl Into<String>) -> CommandFuture {
        self.inner.dispatcher.send(command).boxed()
    }

    pub fn warn(&self, player: &str, message: &str) -> CommandFuture {
        self.execute(commands::warn(player, message))
    }

    pub fn broadcast(&self, message: &str) -> CommandFuture {
        self.execute(commands::broadcast(message))
    }

    pub fn kick(&self, player: &str, reason: &str) -> CommandFuture {
        self.execute(commands::kick(player, reason))
    }

    pub fn ban(&self, player: &str, duration: &str, reason: &str) -> CommandFuture {
        self.execute(commands::ban(player, duration, reason))
    }

    pub fn force_team_change(&self, player: &str) -> CommandFuture {
        self.execute(commands::force_team_change(player))
    }

    pub fn disband_squad(&self, team_id: u32, squad_id: u32) -> CommandFuture {
        self.execute(commands::disband_squad(team_id, squad_id))
    }

    /// Current roster. Lines that did not parse are in [`Listing::skipped`].
    pub async fn list_players(&self) -> Result<Listing<PlayerRecord>> {
        let text = self.execute(commands::LIST_PLAYERS).await?;
        let listing = parse_list_players(&text);
        self.report_skipped(commands::LIST_PLAYERS, &listing.skipped);
        Ok(listing)
    }

    pub async fn list_squads(&self) -> Result<Listing<SquadRecord>> {
        let text = self.execute(commands::LIST_SQUADS).await?;
        let listing = parse_list_squads(&text);
        self.report_skipped(commands::LIST_SQUADS, &listing.skipped);
        Ok(listing)
    }

    pub async fn current_map(&self) -> Result<MapInfo> {
        let text = self.execute(commands::SHOW_CURRENT_MAP).await?;
        Ok(parse_current_map(&text)?)
    }

    /// `None` when no next map is set.
    pub async fn next_map(&self) -> Result<Option<MapInfo>> {
        let text = self.execute(commands::SHOW_NEXT_MAP).await?;
        Ok(parse_next_map(&text)?)
    }

    fn report_skipped(&self, command: &str, skipped: &[ParseError]) {
        if skipped.is_empty() {
            return;
        }
        self.inner.metrics.lines_skipped(skipped.len() as u64);
        for error in skipped {
            warn!(
                command,
                line_number = error.line_number,
                reason = error.reason,
                line = %error.line,
                "Skipped unparsable listing line"
            );
        }
    }

    /// Register a handler for lifecycle and chat events. Handlers must not block.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&RconEvent) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.events.unsubscribe(id)
    }

    /// Events as an async stream
    pub fn events(&self) -> EventStream {
        self.inner.events.stream()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    pub fn log_metrics(&self) {
        self.inner.metrics.log_metrics();
    }
}

impl std::fmt::Debug for RconClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RconClient")
            .field("config", &self.inner.config)
            .field("state", &self.state())
            .field("queued", &self.inner.dispatcher.queued())
            .field("in_flight", &self.inner.dispatcher.in_flight())
            .finish()
    }
}
