//! RCON protocol layer: authentication, response reassembly and command dispatch.

pub mod dispatcher;
pub mod handshake;
pub mod reassembler;
