//! Deferred reconciliation checks.
//!
//! After each start or stop request the coordinator asks a [`RecheckTimer`]
//! to hand a [`RecheckTicket`] back after a delay. Tickets carry the
//! generation of the request that scheduled them; a newer request bumps the
//! generation, which cancels every ticket still in flight.

use std::time::Duration;

use crate::coordinator::ScannerRunState;

/// A scheduled check that the observed state has reached `intended`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RecheckTicket {
    pub generation: u64,
    pub intended: ScannerRunState,
}

/// Host-provided timer.
///
/// Implementations call [`Coordinator::on_recheck`](crate::Coordinator::on_recheck)
/// with the ticket once `delay` has elapsed, on the same thread that drives
/// the coordinator.
pub trait RecheckTimer {
    fn schedule(&mut self, delay: Duration, ticket: RecheckTicket);
}

/// Result of handling a ticket.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RecheckOutcome {
    /// A newer request superseded the one that scheduled this ticket.
    Stale,
    /// Observed state matches the intent; the chain ends.
    Settled,
    /// The request was issued again and one more check scheduled.
    Reissued { attempt: u32 },
    /// The reissue budget is spent; the chain ends with the mismatch standing.
    GaveUp,
}

/// Deterministic in-process timer driven by explicit time advances.
#[derive(Debug, Default)]
pub struct TimerQueue {
    now: Duration,
    seq: u64,
    pending: Vec<Pending>,
}

#[derive(Debug)]
struct Pending {
    due: Duration,
    seq: u64,
    ticket: RecheckTicket,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed since the queue was created.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of tickets not yet due.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Earliest due time, if anything is pending.
    pub fn next_due(&self) -> Option<Duration> {
        self.pending.iter().map(|p| p.due).min()
    }

    /// Move the clock forward to `until`, returning the earliest due ticket
    /// if one is due by then. The clock stops at that ticket's due time so
    /// tickets scheduled while handling it are timed from there.
    pub fn pop_due(&mut self, until: Duration) -> Option<RecheckTicket> {
        let idx = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.due <= until)
            .min_by_key(|(_, p)| (p.due, p.seq))
            .map(|(i, _)| i);
        match idx {
            Some(i) => {
                let p = self.pending.swap_remove(i);
                self.now = self.now.max(p.due);
                Some(p.ticket)
            }
            None => {
                self.now = self.now.max(until);
                None
            }
        }
    }
}

impl RecheckTimer for TimerQueue {
    fn schedule(&mut self, delay: Duration, ticket: RecheckTicket) {
        self.seq += 1;
        self.pending.push(Pending {
            due: self.now + delay,
            seq: self.seq,
            ticket,
        });
    }
}
