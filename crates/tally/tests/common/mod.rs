//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tally::{
    ConfirmedEdge, DebounceFilter, Dispatcher, EventKind, LineTable, Monitor, NotificationEvent,
    SharedInput, Sink, SinkError,
};

pub const DEBOUNCE: Duration = Duration::from_millis(80);
pub const POLL: Duration = Duration::from_millis(50);

pub fn default_table() -> LineTable {
    LineTable::from_config(&tallyconf::default_lines()).unwrap()
}

/// Idle studio: audio present, nothing on air, all mics closed.
pub fn idle_input() -> SharedInput {
    let input = SharedInput::new();
    input.set("silence_detector", false);
    input
}

pub fn start_monitor(input: &SharedInput, sinks: Vec<Arc<dyn Sink>>) -> Monitor {
    Monitor::start(
        default_table(),
        Box::new(input.clone()),
        DebounceFilter::new(DEBOUNCE),
        Dispatcher::new(sinks),
    )
    .unwrap()
}

/// Sink that keeps every event it accepts.
pub struct RecordingSink {
    name: &'static str,
    kinds: Option<Vec<EventKind>>,
    events: Mutex<Vec<NotificationEvent>>,
}

impl RecordingSink {
    pub fn all(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            kinds: None,
            events: Mutex::new(Vec::new()),
        })
    }

    pub fn only(name: &'static str, kinds: &[EventKind]) -> Arc<Self> {
        Arc::new(Self {
            name,
            kinds: Some(kinds.to_vec()),
            events: Mutex::new(Vec::new()),
        })
    }

    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sink for RecordingSink {
    fn name(&self) -> &str {
        self.name
    }

    fn accepts(&self, event: &NotificationEvent) -> bool {
        self.kinds.as_ref().map_or(true, |k| k.contains(&event.kind))
    }

    async fn deliver(&self, event: &NotificationEvent) -> Result<(), SinkError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Sink that appends its name to a journal shared with other sinks.
pub struct JournalSink {
    name: &'static str,
    journal: Arc<Mutex<Vec<&'static str>>>,
}

impl JournalSink {
    pub fn new(name: &'static str, journal: &Arc<Mutex<Vec<&'static str>>>) -> Arc<Self> {
        Arc::new(Self {
            name,
            journal: Arc::clone(journal),
        })
    }
}

#[async_trait]
impl Sink for JournalSink {
    fn name(&self) -> &str {
        self.name
    }

    fn accepts(&self, _event: &NotificationEvent) -> bool {
        true
    }

    async fn deliver(&self, _event: &NotificationEvent) -> Result<(), SinkError> {
        self.journal.lock().unwrap().push(self.name);
        Ok(())
    }
}

/// In-memory log output for asserting on what the dispatcher reports.
///
/// Install with [`LogBuffer::install`] inside a `#[tokio::test]`; the
/// default current-thread runtime runs delivery tasks on the test thread,
/// so they log into the same buffer.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_target(false)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock().unwrap())
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// True when one line holds every needle.
    pub fn has_line(&self, needles: &[&str]) -> bool {
        self.lines()
            .iter()
            .any(|line| needles.iter().all(|n| line.contains(n)))
    }
}

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Sink whose every delivery fails, or panics.
pub struct BrokenSink {
    panics: bool,
    attempts: AtomicUsize,
}

impl BrokenSink {
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            panics: false,
            attempts: AtomicUsize::new(0),
        })
    }

    pub fn panicking() -> Arc<Self> {
        Arc::new(Self {
            panics: true,
            attempts: AtomicUsize::new(0),
        })
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Sink for BrokenSink {
    fn name(&self) -> &str {
        "broken"
    }

    fn accepts(&self, _event: &NotificationEvent) -> bool {
        true
    }

    async fn deliver(&self, _event: &NotificationEvent) -> Result<(), SinkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.panics {
            panic!("sink blew up");
        }
        Err(SinkError::Status {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            body: "down".to_string(),
        })
    }
}

/// A confirmed silence relay trip, for sink tests that bypass the monitor.
pub fn silence_trip_event() -> NotificationEvent {
    let table = default_table();
    let relay = table.silence_relay();
    let edge = ConfirmedEdge {
        line: relay.id,
        level: true,
        at: std::time::Instant::now(),
    };
    let levels: tally::RegistrySnapshot = [true; 7]
        .into_iter()
        .map(tally::DebouncedState::initial)
        .collect();
    let mut snapshot = tally::recompute(&table, &levels);
    snapshot.on_air = Some(tallyconf::Studio::StudioA);
    NotificationEvent::from_edge(&edge, relay, snapshot)
}
