//! Notification events built from confirmed edges.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregate::{AggregateState, ASSERTED_LEVEL, SILENCE_TRIPPED_LEVEL};
use crate::debounce::ConfirmedEdge;
use crate::line::Line;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventKind {
    /// Silence relay opened.
    SilenceTripped,
    /// Silence relay closed again.
    SilenceReset,
    /// An on-air or mic-live line changed.
    LineChanged,
    /// The sampling loop came up.
    MonitorStarted,
}

impl EventKind {
    pub fn is_silence(&self) -> bool {
        matches!(self, EventKind::SilenceTripped | EventKind::SilenceReset)
    }
}

/// Immutable event handed to every sink.
///
/// The snapshot is taken when the edge is confirmed and never re-read.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationEvent {
    pub kind: EventKind,
    /// Line that changed; `None` for `MonitorStarted`.
    #[serde(skip)]
    pub line: Option<Line>,
    /// Whether the changed line is now in its active state.
    pub active: bool,
    pub snapshot: AggregateState,
    pub timestamp: DateTime<Utc>,
}

impl NotificationEvent {
    /// Classify a confirmed edge and capture the snapshot.
    pub fn from_edge(edge: &ConfirmedEdge, line: &Line, snapshot: AggregateState) -> Self {
        let (kind, active) = if line.is_silence_relay() {
            let tripped = edge.level == SILENCE_TRIPPED_LEVEL;
            let kind = if tripped {
                EventKind::SilenceTripped
            } else {
                EventKind::SilenceReset
            };
            (kind, tripped)
        } else {
            (EventKind::LineChanged, edge.level == ASSERTED_LEVEL)
        };

        Self {
            kind,
            line: Some(line.clone()),
            active,
            snapshot,
            timestamp: Utc::now(),
        }
    }

    pub fn started(snapshot: AggregateState) -> Self {
        Self {
            kind: EventKind::MonitorStarted,
            line: None,
            active: false,
            snapshot,
            timestamp: Utc::now(),
        }
    }

    /// Short human-readable status line.
    pub fn status_message(&self) -> String {
        match self.kind {
            EventKind::SilenceTripped => "Silence Detector Tripped".to_string(),
            EventKind::SilenceReset => "Silence Detector Reset".to_string(),
            EventKind::MonitorStarted => "Silence Detector Script Started".to_string(),
            EventKind::LineChanged => {
                let label = self
                    .line
                    .as_ref()
                    .map(|l| l.label())
                    .unwrap_or_else(|| "Unknown line".to_string());
                let status = if self.active { "ON" } else { "OFF" };
                format!("{}: {}", label, status)
            }
        }
    }
}
