//! Time-gated sample-and-hold debounce.
//!
//! Each poll sees only the latest raw level of a line. A level that differs
//! from the confirmed value is promoted only when at least one debounce
//! interval has passed since the line's previous confirmed change; otherwise
//! the sample is dropped and the next poll re-evaluates from scratch.
//!
//! This is not a majority vote and there is no hysteresis. Two opposite
//! transitions inside one window collapse to nothing: the second undoes the
//! first before the gate opens, so the raw level matches the confirmed value
//! again and no edge is produced.

use std::time::{Duration, Instant};

use crate::line::LineId;

/// Confirmed level of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebouncedState {
    /// Last confirmed electrical level (`true` = high).
    pub confirmed: bool,
    /// When `confirmed` last changed. `None` until the first change after
    /// startup, which leaves the gate open.
    pub last_change: Option<Instant>,
}

impl DebouncedState {
    /// State seeded from the first sample read at startup.
    pub fn initial(level: bool) -> Self {
        Self {
            confirmed: level,
            last_change: None,
        }
    }
}

/// A level change that survived the debounce gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmedEdge {
    pub line: LineId,
    /// New confirmed electrical level.
    pub level: bool,
    pub at: Instant,
}

/// Debounce gate shared by all lines.
#[derive(Debug, Clone, Copy)]
pub struct DebounceFilter {
    interval: Duration,
}

impl DebounceFilter {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Evaluate one raw sample against the line's confirmed state.
    ///
    /// Returns an edge when `raw` differs from the confirmed level and the
    /// gate has elapsed. Never mutates; the registry applies the edge.
    pub fn observe(
        &self,
        line: LineId,
        raw: bool,
        now: Instant,
        state: &DebouncedState,
    ) -> Option<ConfirmedEdge> {
        if raw == state.confirmed {
            return None;
        }

        let gate_open = match state.last_change {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        };

        gate_open.then_some(ConfirmedEdge {
            line,
            level: raw,
            at: now,
        })
    }
}
