//! Public client surface

pub mod client;
pub mod commands;

pub use client::{CommandFuture, RconClient};
