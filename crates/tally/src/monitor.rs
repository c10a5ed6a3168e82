//! The sampling loop.
//!
//! A single task owns the input source, the line registry and the current
//! aggregate. Each tick samples every line, confirms edges through the
//! debounce filter, recomputes the aggregate once, then hands every edge of
//! the tick to the dispatcher with that tick's snapshot.

use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::aggregate::{self, AggregateState};
use crate::debounce::{ConfirmedEdge, DebounceFilter};
use crate::dispatch::Dispatcher;
use crate::event::NotificationEvent;
use crate::input::{InputError, InputSource};
use crate::line::LineTable;
use crate::registry::LineRegistry;

pub struct Monitor {
    table: LineTable,
    input: Box<dyn InputSource>,
    filter: DebounceFilter,
    registry: LineRegistry,
    aggregate: AggregateState,
    dispatcher: Dispatcher,
    ticks: u64,
}

impl Monitor {
    /// Read the startup level of every line and compute the first aggregate.
    ///
    /// The startup read produces no events, and the first change after
    /// startup is never gated.
    pub fn start(
        table: LineTable,
        mut input: Box<dyn InputSource>,
        filter: DebounceFilter,
        dispatcher: Dispatcher,
    ) -> Result<Self, InputError> {
        let initial = sample_all(&table, input.as_mut())?;
        let registry = LineRegistry::new(&table, &initial);
        let aggregate = aggregate::recompute(&table, &registry.all_states());

        info!(
            lines = table.len(),
            debounce_ms = filter.interval().as_millis() as u64,
            on_air = aggregate.on_air_name(),
            silence_tripped = aggregate.silence_tripped,
            "monitor started"
        );

        Ok(Self {
            table,
            input,
            filter,
            registry,
            aggregate,
            dispatcher,
            ticks: 0,
        })
    }

    pub fn aggregate(&self) -> &AggregateState {
        &self.aggregate
    }

    pub fn table(&self) -> &LineTable {
        &self.table
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Send the startup notice with the current aggregate.
    pub fn announce_started(&self) {
        self.dispatcher
            .announce(NotificationEvent::started(self.aggregate.clone()));
    }

    /// One sampling tick at `now`.
    ///
    /// Every line is read before anything is applied, so a failed read
    /// leaves the registry untouched.
    pub fn poll_once(&mut self, now: Instant) -> Result<Vec<ConfirmedEdge>, InputError> {
        let samples = sample_all(&self.table, self.input.as_mut())?;
        self.ticks += 1;

        let mut edges = Vec::new();
        for (line, raw) in self.table.iter().zip(samples) {
            let Some(state) = self.registry.state(line.id) else {
                continue;
            };
            if let Some(edge) = self.filter.observe(line.id, raw, now, state) {
                edges.push(edge);
            }
        }

        if edges.is_empty() {
            return Ok(edges);
        }

        for edge in &edges {
            self.registry.apply(edge);
        }
        self.aggregate = aggregate::recompute(&self.table, &self.registry.all_states());

        for edge in &edges {
            if let Some(line) = self.table.get(edge.line) {
                self.dispatcher.on_edge(edge, line, self.aggregate.clone());
            }
        }

        Ok(edges)
    }

    /// Poll every `poll_interval` until `cancel` fires or a read fails.
    ///
    /// The input is released on every exit path.
    pub async fn run(
        &mut self,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) -> Result<(), InputError> {
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let result = loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.poll_once(tokio::time::Instant::now().into_std()) {
                        error!(error = %e, "input read failed, stopping monitor");
                        break Err(e);
                    }
                }
                _ = cancel.cancelled() => {
                    debug!(ticks = self.ticks, "monitor loop cancelled");
                    break Ok(());
                }
            }
        };

        self.input.release();
        info!(ticks = self.ticks, "monitor stopped");
        result
    }
}

fn sample_all(table: &LineTable, input: &mut dyn InputSource) -> Result<Vec<bool>, InputError> {
    table.iter().map(|line| input.read_line(line)).collect()
}
