use std::borrow::Cow;
use std::fmt;

use crate::error::{constants, RconError, Result};

/// Bytes taken by the `size` prefix itself
pub const SIZE_FIELD_LEN: usize = 4;

/// `id` + `type` + body terminator + trailing terminator
pub const MIN_PACKET_SIZE: usize = 4 + 4 + 1 + 1;

/// Default upper bound on a declared packet size (1 MiB)
pub const DEFAULT_MAX_PACKET_SIZE: usize = 1024 * 1024;

/// Packet type as carried on the wire.
///
/// The protocol overloads value `2`: clients send it as `EXEC_COMMAND` and servers use it
/// for `AUTH_RESPONSE`. A newtype with associated constants keeps both names while
/// comparing by wire value, so a decoded packet equals the one that was encoded.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketType(i32);

impl PacketType {
    /// Command output, or the echo of a probe packet
    pub const RESPONSE_VALUE: PacketType = PacketType(0);
    /// Unsolicited server broadcast (chat, admin notices)
    pub const CHAT_VALUE: PacketType = PacketType(1);
    /// Client → server command
    pub const EXEC_COMMAND: PacketType = PacketType(2);
    /// Server → client authentication verdict (same wire value as `EXEC_COMMAND`)
    pub const AUTH_RESPONSE: PacketType = PacketType(2);
    /// Client → server authentication request
    pub const AUTH: PacketType = PacketType(3);

    pub const fn from_wire(value: i32) -> Self {
        PacketType(value)
    }

    pub const fn wire(self) -> i32 {
        self.0
    }
}

impl fmt::Debug for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0 => f.write_str("RESPONSE_VALUE"),
            1 => f.write_str("CHAT_VALUE"),
            2 => f.write_str("EXEC_COMMAND|AUTH_RESPONSE"),
            3 => f.write_str("AUTH"),
            other => write!(f, "PacketType({other})"),
        }
    }
}

/// A single RCON packet
///
/// The body is kept as raw bytes. Servers split long output at arbitrary byte offsets, so
/// a fragment may end inside a multi-byte character; text is decoded only once a whole
/// response is assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub id: i32,
    pub kind: PacketType,
    pub body: Vec<u8>,
}

impl Packet {
    pub fn new(id: i32, kind: PacketType, body: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            kind,
            body: body.into(),
        }
    }

    /// Empty `RESPONSE_VALUE` packet whose echo marks the end of a multi-packet reply
    pub fn probe(id: i32) -> Self {
        Self::new(id, PacketType::RESPONSE_VALUE, Vec::new())
    }

    /// Body as text, with invalid UTF-8 replaced
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Value of the `size` field for this packet
    pub fn declared_size(&self) -> usize {
        MIN_PACKET_SIZE + self.body.len()
    }

    /// Total bytes this packet occupies on the wire
    pub fn wire_len(&self) -> usize {
        SIZE_FIELD_LEN + self.declared_size()
    }

    /// Check the packet can be framed without corrupting the stream.
    pub fn validate(&self, max_packet_size: usize) -> Result<()> {
        if self.body.contains(&0) {
            return Err(RconError::Protocol(constants::ERR_BODY_CONTAINS_NUL.into()));
        }
        if self.declared_size() > max_packet_size {
            return Err(RconError::Protocol(format!(
                "{} ({} > {})",
                constants::ERR_OVERSIZED_PACKET,
                self.declared_size(),
                max_packet_size
            )));
        }
        Ok(())
    }

    /// Serialize into `buf`. Callers are expected to have run [`Packet::validate`].
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        buf.reserve(self.wire_len());
        buf.extend_from_slice(&(self.declared_size() as i32).to_le_bytes());
        buf.extend_from_slice(&self.id.to_le_bytes());
        buf.extend_from_slice(&self.kind.wire().to_le_bytes());
        buf.extend_from_slice(&self.body);
        buf.extend_from_slice(&[0x00, 0x00]);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.wire_len());
        self.write_to(&mut buf);
        buf
    }

    /// Decode one packet from the front of an accumulating buffer.
    ///
    /// Returns `Ok(None)` while the buffer holds less than a full packet, otherwise the
    /// packet together with the number of bytes it consumed.
    pub fn decode(buf: &[u8], max_packet_size: usize) -> Result<Option<(Packet, usize)>> {
        if buf.len() < SIZE_FIELD_LEN {
            return Ok(None);
        }

        let declared = read_i32(buf, 0);
        if declared < 0 {
            return Err(RconError::Protocol(format!(
                "{} ({declared})",
                constants::ERR_NEGATIVE_SIZE
            )));
        }
        let declared = declared as usize;
        if declared < MIN_PACKET_SIZE {
            return Err(RconError::Protocol(format!(
                "{} ({declared} < {MIN_PACKET_SIZE})",
                constants::ERR_UNDERSIZED_PACKET
            )));
        }
        if declared > max_packet_size {
            return Err(RconError::Protocol(format!(
                "{} ({declared} > {max_packet_size})",
                constants::ERR_OVERSIZED_PACKET
            )));
        }

        let total = SIZE_FIELD_LEN + declared;
        if buf.len() < total {
            return Ok(None);
        }

        let id = read_i32(buf, 4);
        let kind = PacketType::from_wire(read_i32(buf, 8));

        // Everything after the type field, terminators included
        let region = &buf[12..total];
        let end = region
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| RconError::Protocol(constants::ERR_MISSING_TERMINATOR.into()))?;
        let body = region[..end].to_vec();

        Ok(Some((Packet { id, kind, body }, total)))
    }
}

#[inline]
fn read_i32(buf: &[u8], offset: usize) -> i32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buf[offset..offset + 4]);
    i32::from_le_bytes(raw)
}
