//! # Error Types
//!
//! Error handling for the RCON client.
//!
//! This module defines every error variant that can surface from the client, from
//! low-level I/O failures to command timeouts and listing parse failures.
//!
//! ## Error Categories
//! - **Connection Errors**: socket failures, connect/auth timeouts, closed links
//! - **Authentication Errors**: the server rejected the configured password
//! - **Protocol Errors**: malformed packet framing on the wire
//! - **Command Errors**: a single command exceeded its deadline
//! - **Parse Errors**: a listing line did not match the expected record shape
//!
//! `RconError` is `Clone` so that one failed connection attempt can be handed to every
//! caller that was waiting on it.
//!
//! ## Example Usage
//! ```rust,no_run
//! use squad_rcon::{RconClient, RconConfig, RconError};
//! use tracing::{error, info};
//!
//! async fn show_map(client: &RconClient) {
//!     match client.execute("ShowCurrentMap").await {
//!         Ok(text) => info!(%text, "current map"),
//!         Err(RconError::CommandTimeout { .. }) => error!("server did not answer in time"),
//!         Err(e) => error!(error = %e, "command failed"),
//!     }
//! }
//! ```

use std::io;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::parsers::ParseError;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Framing errors
    pub const ERR_NEGATIVE_SIZE: &str = "Declared packet size is negative";
    pub const ERR_UNDERSIZED_PACKET: &str = "Declared packet size is below the protocol minimum";
    pub const ERR_OVERSIZED_PACKET: &str = "Declared packet size exceeds the configured maximum";
    pub const ERR_MISSING_TERMINATOR: &str = "Packet body is not NUL terminated";
    pub const ERR_BODY_CONTAINS_NUL: &str = "Packet body contains an embedded NUL byte";

    /// Connection stages used in timeout errors
    pub const STAGE_SOCKET: &str = "socket connect";
    pub const STAGE_AUTH: &str = "authentication";

    /// Connection errors
    pub const ERR_CLOSED_BY_PEER: &str = "Connection closed by server";
    pub const ERR_NO_RUNTIME: &str = "RconClient must be created inside a Tokio runtime";
}

/// Primary error type for all client operations
#[derive(Error, Debug, Clone)]
pub enum RconError {
    #[error("I/O error: {0}")]
    Io(Arc<io::Error>),

    #[error("Connection timed out during {0}")]
    ConnectionTimeout(&'static str),

    #[error("Authentication rejected by server")]
    Authentication,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Command `{command}` timed out after {timeout:?}")]
    CommandTimeout { command: String, timeout: Duration },

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Not connected (automatic reconnection is disabled)")]
    NotConnected,

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl From<io::Error> for RconError {
    fn from(err: io::Error) -> Self {
        RconError::Io(Arc::new(err))
    }
}

impl RconError {
    /// Whether retrying the same operation later can reasonably succeed.
    ///
    /// Authentication and configuration errors need operator action first.
    pub fn is_retryable(&self) -> bool {
        match self {
            RconError::Io(_)
            | RconError::ConnectionTimeout(_)
            | RconError::Protocol(_)
            | RconError::CommandTimeout { .. }
            | RconError::ConnectionClosed
            | RconError::NotConnected => true,
            RconError::Authentication
            | RconError::Parse(_)
            | RconError::ConfigError(_)
            | RconError::Runtime(_) => false,
        }
    }
}

/// Type alias for Results using RconError
pub type Result<T> = std::result::Result<T, RconError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_convert_and_stay_cloneable() {
        let err: RconError = io::Error::new(io::ErrorKind::ConnectionReset, "reset").into();
        let copy = err.clone();
        assert!(matches!(copy, RconError::Io(_)));
        assert!(copy.to_string().contains("reset"));
    }

    #[test]
    fn authentication_is_not_retryable() {
        assert!(!RconError::Authentication.is_retryable());
        assert!(RconError::ConnectionTimeout(constants::STAGE_AUTH).is_retryable());
        assert!(RconError::CommandTimeout {
            command: "ListPlayers".into(),
            timeout: Duration::from_secs(1),
        }
        .is_retryable());
    }
}
