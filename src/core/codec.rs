use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::core::packet::{Packet, DEFAULT_MAX_PACKET_SIZE};
use crate::error::RconError;

/// Tokio codec framing RCON packets over a byte stream.
///
/// Decoding never consumes a partial packet: until the whole declared size is buffered
/// the input is left untouched and `Ok(None)` is returned.
#[derive(Debug, Clone, Copy)]
pub struct RconCodec {
    max_packet_size: usize,
}

impl RconCodec {
    pub fn new(max_packet_size: usize) -> Self {
        Self { max_packet_size }
    }

    pub fn max_packet_size(&self) -> usize {
        self.max_packet_size
    }
}

impl Default for RconCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PACKET_SIZE)
    }
}

impl Decoder for RconCodec {
    type Item = Packet;
    type Error = RconError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match Packet::decode(src, self.max_packet_size)? {
            Some((packet, consumed)) => {
                src.advance(consumed);
                Ok(Some(packet))
            }
            None => {
                // Size prefix known: reserve once instead of growing per read
                if src.len() >= 4 {
                    let declared = i32::from_le_bytes([src[0], src[1], src[2], src[3]]);
                    let needed = 4 + declared.max(0) as usize;
                    src.reserve(needed.saturating_sub(src.len()));
                }
                Ok(None)
            }
        }
    }
}

impl Encoder<Packet> for RconCodec {
    type Error = RconError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.validate(self.max_packet_size)?;

        dst.reserve(item.wire_len());
        dst.put_i32_le(item.declared_size() as i32);
        dst.put_i32_le(item.id);
        dst.put_i32_le(item.kind.wire());
        dst.put_slice(&item.body);
        dst.put_slice(&[0x00, 0x00]);
        Ok(())
    }
}
