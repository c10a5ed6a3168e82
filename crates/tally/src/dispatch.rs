//! Fire-and-forget fan-out of events to sinks.
//!
//! The sampling loop must never wait on the network. Every accepting sink
//! gets its own detached task; the caller returns as soon as the tasks are
//! spawned. A slow, failing or panicking sink affects only its own task.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use tokio_util::task::TaskTracker;
use tracing::{error, info};

use crate::aggregate::AggregateState;
use crate::debounce::ConfirmedEdge;
use crate::event::NotificationEvent;
use crate::line::Line;
use crate::sinks::Sink;

/// Delivery counters, shared with every spawned task.
#[derive(Debug, Default)]
pub struct DispatchStats {
    attempted: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl DispatchStats {
    pub fn attempted(&self) -> u64 {
        self.attempted.load(Ordering::Relaxed)
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

pub struct Dispatcher {
    sinks: Vec<Arc<dyn Sink>>,
    tracker: TaskTracker,
    stats: Arc<DispatchStats>,
}

impl Dispatcher {
    pub fn new(sinks: Vec<Arc<dyn Sink>>) -> Self {
        Self {
            sinks,
            tracker: TaskTracker::new(),
            stats: Arc::new(DispatchStats::default()),
        }
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    pub fn stats(&self) -> Arc<DispatchStats> {
        self.stats.clone()
    }

    /// Build the event for a confirmed edge and hand it to the sinks.
    pub fn on_edge(&self, edge: &ConfirmedEdge, line: &Line, snapshot: AggregateState) {
        let event = NotificationEvent::from_edge(edge, line, snapshot);
        info!(
            line = %line.name,
            level = edge.level,
            kind = ?event.kind,
            "{}",
            event.status_message()
        );
        self.announce(event);
    }

    /// Spawn one delivery task per accepting sink, in sink order.
    ///
    /// Must be called from within a tokio runtime.
    pub fn announce(&self, event: NotificationEvent) {
        let event = Arc::new(event);

        for sink in self.sinks.iter().filter(|s| s.accepts(&event)) {
            let sink = Arc::clone(sink);
            let event = Arc::clone(&event);
            let stats = Arc::clone(&self.stats);
            stats.attempted.fetch_add(1, Ordering::Relaxed);

            self.tracker.spawn(async move {
                match AssertUnwindSafe(sink.deliver(&event)).catch_unwind().await {
                    Ok(Ok(())) => {
                        stats.delivered.fetch_add(1, Ordering::Relaxed);
                        info!(sink = sink.name(), kind = ?event.kind, "OK");
                    }
                    Ok(Err(e)) => {
                        stats.failed.fetch_add(1, Ordering::Relaxed);
                        error!(sink = sink.name(), kind = ?event.kind, error = %e, "ERROR");
                    }
                    Err(payload) => {
                        stats.failed.fetch_add(1, Ordering::Relaxed);
                        error!(
                            sink = sink.name(),
                            kind = ?event.kind,
                            panic = %panic_message(payload.as_ref()),
                            "ERROR"
                        );
                    }
                }
            });
        }
    }

    /// Wait for every spawned delivery to finish.
    ///
    /// Test helper; the monitor never waits on sinks.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Deliveries still in flight.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }
}

fn panic_message<'a>(payload: &'a (dyn Any + Send + 'static)) -> &'a str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}
