//! Session correlation
//!
//! Requests that produce follow-up notifications carry a 16-bit session id.
//! The correlator hands out ids and answers whether a received id belongs to
//! the request that is in flight; what to do with a mismatch is up to the
//! caller.

use rand::Rng;

/// Generates and matches session ids
#[derive(Debug, Clone)]
pub struct SessionCorrelator {
    next: u16,
    last_issued: Option<u16>,
}

impl Default for SessionCorrelator {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionCorrelator {
    /// Start at a random id so a reconnect does not reuse recent ids
    pub fn new() -> Self {
        Self::with_seed(rand::rng().random())
    }

    /// Start at a fixed id
    pub fn with_seed(seed: u16) -> Self {
        Self {
            next: seed,
            last_issued: None,
        }
    }

    /// Issue the next id, wrapping at 65536
    pub fn next_id(&mut self) -> u16 {
        let id = self.next;
        self.next = self.next.wrapping_add(1);
        self.last_issued = Some(id);
        id
    }

    pub fn last_issued(&self) -> Option<u16> {
        self.last_issued
    }

    /// Whether `received` is the id that was issued
    pub fn matches(received: u16, expected: u16) -> bool {
        received == expected
    }

    /// Whether `received` is the most recently issued id
    pub fn matches_last(&self, received: u16) -> bool {
        self.last_issued
            .is_some_and(|expected| Self::matches(received, expected))
    }
}
