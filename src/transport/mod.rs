pub mod connection;

pub use connection::{Connection, ConnectionState, PacketRouter};
