//! # Core Protocol Components
//!
//! Low-level packet handling and the Tokio codec for RCON framing.
//!
//! This module is stateless: it turns packets into bytes and accumulated bytes back
//! into packets. Everything stateful lives in `transport` and `protocol`.
//!
//! ## Components
//! - **Packet**: id, type and text body, with size validation
//! - **Codec**: Tokio codec for framing over byte streams
//!
//! ## Wire Format
//! ```text
//! [Size(4, LE)] [Id(4, LE)] [Type(4, LE)] [Body(N)] [0x00] [0x00]
//! ```
//! `Size` counts everything after itself, so `Size == 10 + N`.
//!
//! ## Safety
//! - Declared sizes are validated before any allocation
//! - A missing NUL terminator is a protocol error, never a panic

pub mod codec;
pub mod packet;
