//! The shared auction record: current highest amount and winning bidder.
//!
//! One instance exists per server process, shared by every connection
//! handler. The only synchronization point in the system is the mutex around
//! the compare/update step; it is never held across network I/O, so a slow
//! client cannot stall bid processing for others.

use std::sync::Mutex;

/// Result of a submission, snapshotted under the lock so the caller can
/// format a response without re-reading shared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BidOutcome {
    pub accepted: bool,
    pub highest: i32,
    pub winner_id: i32,
}

#[derive(Debug, Clone, Copy)]
struct Record {
    highest: i32,
    winner_id: i32,
}

/// Process-wide highest-bid record.
///
/// `highest` is monotonically non-decreasing over the process lifetime.
/// `winner_id` identifies the first bidder to reach the current `highest`:
/// the comparator is strict `>`, so a bid equal to the incumbent amount never
/// displaces the incumbent winner.
#[derive(Debug)]
pub struct AuctionState {
    inner: Mutex<Record>,
}

impl AuctionState {
    /// Fresh auction: highest 0, no winner yet.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Record {
                highest: 0,
                winner_id: -1,
            }),
        }
    }

    /// Compare-and-update under the lock. Accepts only a strictly greater
    /// amount.
    pub fn submit_bid(&self, bidder_id: i32, amount: i32) -> BidOutcome {
        let mut rec = self.inner.lock().expect("lock");
        let accepted = amount > rec.highest;
        if accepted {
            rec.highest = amount;
            rec.winner_id = bidder_id;
        }
        BidOutcome {
            accepted,
            highest: rec.highest,
            winner_id: rec.winner_id,
        }
    }

    /// Current `(highest, winner_id)` pair.
    pub fn snapshot(&self) -> (i32, i32) {
        let rec = self.inner.lock().expect("lock");
        (rec.highest, rec.winner_id)
    }
}

impl Default for AuctionState {
    fn default() -> Self {
        Self::new()
    }
}
