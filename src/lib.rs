//! # squad-rcon
//!
//! Async RCON client for Squad game servers.
//!
//! One [`RconClient`] per server owns a single authenticated TCP connection and runs every
//! command through a FIFO dispatcher, so any number of tasks can share it. Multi-packet
//! responses are reassembled, lost links are re-established in the background, and
//! listing responses are parsed into typed records.
//!
//! ## Layers
//! - [`core`]: packet model and Tokio codec
//! - [`protocol`]: authentication, response reassembly, command dispatch
//! - [`transport`]: the connection state machine
//! - [`parsers`]: `ListPlayers`, `ListSquads`, chat and map parsers
//! - [`service`]: the public client and admin command formatting
//! - [`events`]: lifecycle and chat notifications
//!
//! ## Example
//! ```rust,no_run
//! use squad_rcon::{Config, RconClient, RconEvent};
//!
//! # async fn run() -> squad_rcon::Result<()> {
//! let config = Config::from_file("squad-rcon.toml")?;
//! squad_rcon::utils::logging::init_logging(&config.logging)?;
//!
//! let client = RconClient::new(config.rcon)?;
//! client.subscribe(|event| {
//!     if let RconEvent::Disconnected { reason, .. } = event {
//!         tracing::warn!(?reason, "RCON link down");
//!     }
//! });
//!
//! client.connect().await?;
//! client.broadcast("Server restart in 5 minutes").await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod events;
pub mod parsers;
pub mod protocol;
pub mod service;
pub mod transport;
pub mod utils;

pub use crate::config::{Config, LoggingConfig, RconConfig};
pub use crate::core::codec::RconCodec;
pub use crate::core::packet::{Packet, PacketType};
pub use crate::error::{RconError, Result};
pub use crate::events::{EventBus, EventStream, RconEvent, SubscriptionId};
pub use crate::parsers::{
    ChatChannel, ChatMessage, Listing, MapInfo, ParseError, PlayerRecord, SquadRecord,
};
pub use crate::service::{CommandFuture, RconClient};
pub use crate::transport::ConnectionState;
pub use crate::utils::metrics::MetricsSnapshot;
