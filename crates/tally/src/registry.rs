//! Line state registry - sole owner of every line's debounced state.
//!
//! The sampling loop is the only writer. Readers get [`RegistrySnapshot`]
//! copies, so a notification in flight never sees a later poll's state.

use tracing::warn;

use crate::debounce::{ConfirmedEdge, DebouncedState};
use crate::line::{LineId, LineTable};

/// Owned copy of all debounced states, indexed by [`LineId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySnapshot {
    states: Vec<DebouncedState>,
}

impl RegistrySnapshot {
    pub fn get(&self, id: LineId) -> Option<&DebouncedState> {
        self.states.get(id.0)
    }

    /// Confirmed level of a line, `None` for an unknown id.
    pub fn level(&self, id: LineId) -> Option<bool> {
        self.get(id).map(|s| s.confirmed)
    }

    pub fn iter(&self) -> impl Iterator<Item = (LineId, &DebouncedState)> {
        self.states.iter().enumerate().map(|(idx, s)| (LineId(idx), s))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl FromIterator<DebouncedState> for RegistrySnapshot {
    fn from_iter<I: IntoIterator<Item = DebouncedState>>(iter: I) -> Self {
        Self {
            states: iter.into_iter().collect(),
        }
    }
}

/// Per-line debounced state for the whole table.
#[derive(Debug)]
pub struct LineRegistry {
    states: Vec<DebouncedState>,
}

impl LineRegistry {
    /// Seed every line from its startup sample. No edges are produced for
    /// the initial read.
    ///
    /// `initial` must hold one level per table line, in table order.
    pub fn new(table: &LineTable, initial: &[bool]) -> Self {
        assert_eq!(
            table.len(),
            initial.len(),
            "one initial sample per line is required"
        );
        Self {
            states: initial.iter().map(|&level| DebouncedState::initial(level)).collect(),
        }
    }

    pub fn state(&self, id: LineId) -> Option<&DebouncedState> {
        self.states.get(id.0)
    }

    /// Record a confirmed edge.
    pub fn apply(&mut self, edge: &ConfirmedEdge) {
        match self.states.get_mut(edge.line.0) {
            Some(state) => {
                state.confirmed = edge.level;
                state.last_change = Some(edge.at);
            }
            None => warn!(line = %edge.line, "edge for unknown line ignored"),
        }
    }

    /// Copy of every line's state.
    pub fn all_states(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            states: self.states.clone(),
        }
    }
}
