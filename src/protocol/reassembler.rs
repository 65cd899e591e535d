//! Multi-packet response reassembly
//!
//! Large command outputs arrive split across several `RESPONSE_VALUE` packets that all
//! carry the command's id, with nothing marking the last one. Right after the command the
//! client writes an empty probe packet with its own id; the server answers in order, so
//! the probe's echo arrives only after every fragment of the command's output.
//!
//! Fragments are split at byte offsets, not character boundaries, so bodies are collected
//! as bytes and decoded once the response is complete.

use crate::core::packet::Packet;

/// Result of feeding one packet to a [`Reassembler`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Pending,
    Complete(String),
}

/// Accumulates the fragments of one command's response
#[derive(Debug)]
pub struct Reassembler {
    command_id: i32,
    probe_id: i32,
    body: Vec<u8>,
    fragments: usize,
}

impl Reassembler {
    pub fn new(command_id: i32, probe_id: i32) -> Self {
        Self {
            command_id,
            probe_id,
            body: Vec::new(),
            fragments: 0,
        }
    }

    pub fn command_id(&self) -> i32 {
        self.command_id
    }

    pub fn probe_id(&self) -> i32 {
        self.probe_id
    }

    /// Number of command-id packets seen so far
    pub fn fragments(&self) -> usize {
        self.fragments
    }

    /// True if `id` belongs to this exchange
    pub fn accepts(&self, id: i32) -> bool {
        id == self.command_id || id == self.probe_id
    }

    /// Feed one packet. Packets for other ids are ignored.
    ///
    /// Once `Complete` is returned the reassembler is spent; its body has been moved out.
    pub fn push(&mut self, packet: Packet) -> Progress {
        if packet.id == self.command_id {
            self.fragments += 1;
            self.body.extend_from_slice(&packet.body);
            Progress::Pending
        } else if packet.id == self.probe_id {
            let body = std::mem::take(&mut self.body);
            let text = String::from_utf8(body)
                .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned());
            Progress::Complete(text)
        } else {
            Progress::Pending
        }
    }
}
