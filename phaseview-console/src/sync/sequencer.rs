//! Request sequencing
//!
//! Every request is stamped with a [`Ticket`]. A response is only applied
//! if it belongs to the current generation and is newer than the last
//! applied one; leaving a view bumps the generation.

/// Stamp identifying one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub generation: u64,
    pub seq: u64,
}

/// Issues tickets and decides which responses are still wanted
#[derive(Debug, Default)]
pub struct SyncSequencer {
    generation: u64,
    next_seq: u64,
    applied: Option<u64>,
}

impl SyncSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamps a new request
    pub fn issue(&mut self) -> Ticket {
        self.next_seq += 1;
        Ticket {
            generation: self.generation,
            seq: self.next_seq,
        }
    }

    /// Whether a response would still be applied
    pub fn is_fresh(&self, ticket: Ticket) -> bool {
        ticket.generation == self.generation && self.applied.is_none_or(|seq| ticket.seq > seq)
    }

    /// Records a response as applied if it is fresh
    pub fn accept(&mut self, ticket: Ticket) -> bool {
        if !self.is_fresh(ticket) {
            return false;
        }
        self.applied = Some(ticket.seq);
        true
    }

    /// Invalidates every outstanding ticket
    pub fn retarget(&mut self) {
        self.generation += 1;
        self.applied = None;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
