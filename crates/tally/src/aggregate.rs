//! Studio state aggregation.
//!
//! Derives the single on-air studio, per-studio mic-live flags and the
//! silence alarm from a registry snapshot. Pure; the sampler recomputes
//! it whenever any line's confirmed level changes.
//!
//! Polarity is fixed by the wiring. On-air and mic-live contacts are
//! open-collector outputs that pull the input low when active. The silence
//! detector relay holds its input low while audio is present and releases
//! it (reads high) when it trips.

use std::collections::BTreeMap;

use serde::Serialize;
use tallyconf::{Role, Studio};

use crate::line::LineTable;
use crate::registry::RegistrySnapshot;

/// Electrical level of an asserted on-air or mic-live line.
pub const ASSERTED_LEVEL: bool = false;

/// Electrical level of a tripped silence relay.
pub const SILENCE_TRIPPED_LEVEL: bool = true;

/// Process-wide studio summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateState {
    /// The studio feeding the transmitter. `None` when no on-air line is
    /// asserted or more than one is; an ambiguous state is never guessed.
    pub on_air: Option<Studio>,
    /// Mic-live flag per studio that has a mic-live line.
    pub mic_live: BTreeMap<Studio, bool>,
    pub silence_tripped: bool,
}

impl AggregateState {
    /// Mic-live flag for a studio; studios without a mic line read `false`.
    pub fn mic_live(&self, studio: Studio) -> bool {
        self.mic_live.get(&studio).copied().unwrap_or(false)
    }

    /// On-air studio name, empty when unknown or ambiguous.
    pub fn on_air_name(&self) -> &'static str {
        self.on_air.map(|s| s.as_str()).unwrap_or("")
    }
}

/// Recompute the aggregate from the current registry snapshot.
pub fn recompute(table: &LineTable, states: &RegistrySnapshot) -> AggregateState {
    let mut asserted_on_air = table
        .with_role(Role::OnAir)
        .filter(|line| states.level(line.id) == Some(ASSERTED_LEVEL))
        .filter_map(|line| line.studio);

    let on_air = match (asserted_on_air.next(), asserted_on_air.next()) {
        (Some(studio), None) => Some(studio),
        _ => None,
    };

    let mic_live = table
        .with_role(Role::MicLive)
        .filter_map(|line| {
            let studio = line.studio?;
            let level = states.level(line.id)?;
            Some((studio, level == ASSERTED_LEVEL))
        })
        .collect();

    let silence_tripped =
        states.level(table.silence_relay().id) == Some(SILENCE_TRIPPED_LEVEL);

    AggregateState {
        on_air,
        mic_live,
        silence_tripped,
    }
}
