#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use squad_rcon::core::packet::DEFAULT_MAX_PACKET_SIZE;
use squad_rcon::{Packet, RconCodec};
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    // Frame decoding must never panic, whatever the peer sends
    let _ = Packet::decode(data, DEFAULT_MAX_PACKET_SIZE);

    let mut buf = BytesMut::from(data);
    let mut codec = RconCodec::new(4096);
    while let Ok(Some(_)) = codec.decode(&mut buf) {}
});
