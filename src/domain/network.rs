use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Cumulative byte counters of one interface, as reported by the OS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceCounters {
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

impl InterfaceCounters {
    pub fn new(bytes_sent: u64, bytes_received: u64) -> Self {
        Self {
            bytes_sent,
            bytes_received,
        }
    }

    pub fn zero() -> Self {
        Self::new(0, 0)
    }
}

/// Network interface entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub name: String,
    pub is_up: bool,
    pub counters: InterfaceCounters,
}

impl NetworkInterface {
    pub fn new(name: String, is_up: bool, counters: InterfaceCounters) -> Self {
        Self {
            name,
            is_up,
            counters,
        }
    }
}

/// Counters captured at a point in time, the baseline for the next delta
#[derive(Debug, Clone, Copy)]
pub struct CounterSnapshot {
    pub counters: InterfaceCounters,
    pub observed_at: Instant,
}

/// Byte deltas between two snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterDelta {
    pub sent: u64,
    pub received: u64,
    /// Set when either counter went backwards (adapter reset or wrap)
    pub discontinuity: bool,
}

impl CounterSnapshot {
    pub fn new(counters: InterfaceCounters, observed_at: Instant) -> Self {
        Self {
            counters,
            observed_at,
        }
    }

    /// Bytes transferred since `previous`. A counter that decreased
    /// contributes zero rather than a negative amount.
    pub fn delta_since(&self, previous: &CounterSnapshot) -> CounterDelta {
        let (sent, sent_reset) = monotonic_delta(previous.counters.bytes_sent, self.counters.bytes_sent);
        let (received, recv_reset) =
            monotonic_delta(previous.counters.bytes_received, self.counters.bytes_received);

        CounterDelta {
            sent,
            received,
            discontinuity: sent_reset || recv_reset,
        }
    }
}

fn monotonic_delta(previous: u64, current: u64) -> (u64, bool) {
    match current.checked_sub(previous) {
        Some(delta) => (delta, false),
        None => (0, true),
    }
}
