//! Packet id generation

use std::sync::atomic::{AtomicI32, Ordering};

/// Thread-safe generator of positive packet ids.
///
/// Ids increase monotonically and wrap back to 1 after `i32::MAX`. Zero and negative
/// values are never produced: `-1` is the server's authentication failure marker.
#[derive(Debug)]
pub struct IdGenerator {
    next_id: AtomicI32,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: i32) -> Self {
        Self {
            next_id: AtomicI32::new(first.max(1)),
        }
    }

    /// Get the next available id
    pub fn next_id(&self) -> i32 {
        let mut current = self.next_id.load(Ordering::Relaxed);
        loop {
            let following = if current == i32::MAX { 1 } else { current + 1 };
            match self.next_id.compare_exchange_weak(
                current,
                following,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return current,
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
