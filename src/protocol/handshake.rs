//! RCON authentication handshake
//!
//! The client sends one `AUTH` packet carrying the password. The server answers with an
//! empty `RESPONSE_VALUE` (ignored) followed by an `AUTH_RESPONSE` whose id is either the
//! id we sent (accepted) or `-1` (rejected).
//!
//! Reply classification is a pure function, [`evaluate_auth_reply`], so the decision table
//! is testable without a socket; [`authenticate`] drives it over a framed stream.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::{debug, error, instrument, trace};

use crate::core::codec::RconCodec;
use crate::core::packet::{Packet, PacketType};
use crate::error::{constants, RconError, Result};
use crate::utils::timeout::with_timeout_error;

/// Id the server puts on an `AUTH_RESPONSE` when the password is wrong
pub const AUTH_FAILED_ID: i32 = -1;

/// What a packet received during authentication means for the handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthReply {
    /// Not decisive; keep waiting
    Ignored,
    Accepted,
    Rejected,
}

/// Build the `AUTH` request packet.
pub fn auth_request(id: i32, password: &str) -> Packet {
    Packet::new(id, PacketType::AUTH, password)
}

/// Classify one inbound packet against the id of the `AUTH` request.
pub fn evaluate_auth_reply(sent_id: i32, packet: &Packet) -> AuthReply {
    if packet.kind != PacketType::AUTH_RESPONSE {
        // The empty RESPONSE_VALUE that precedes the verdict, or stray chat
        return AuthReply::Ignored;
    }
    match packet.id {
        AUTH_FAILED_ID => AuthReply::Rejected,
        id if id == sent_id => AuthReply::Accepted,
        _ => AuthReply::Ignored,
    }
}

/// Authenticate over an open framed stream.
///
/// Fails with [`RconError::Authentication`] on rejection, [`RconError::ConnectionTimeout`]
/// if no verdict arrives within `auth_timeout`, and [`RconError::ConnectionClosed`] if the
/// server hangs up first.
#[instrument(skip(framed, password), fields(auth_id = id))]
pub async fn authenticate<T>(
    framed: &mut Framed<T, RconCodec>,
    password: &str,
    id: i32,
    auth_timeout: Duration,
) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let exchange = async {
        framed.send(auth_request(id, password)).await?;
        debug!("Sent authentication request");

        loop {
            let packet = match framed.next().await {
                Some(packet) => packet?,
                None => return Err(RconError::ConnectionClosed),
            };

            match evaluate_auth_reply(id, &packet) {
                AuthReply::Accepted => {
                    debug!("Authentication accepted");
                    return Ok(());
                }
                AuthReply::Rejected => {
                    error!("Server rejected RCON password");
                    return Err(RconError::Authentication);
                }
                AuthReply::Ignored => {
                    trace!(
                        id = packet.id,
                        kind = ?packet.kind,
                        "Ignoring packet during authentication"
                    );
                }
            }
        }
    };

    with_timeout_error(
        exchange,
        auth_timeout,
        RconError::ConnectionTimeout(constants::STAGE_AUTH),
    )
    .await
}
