//! tally - studio tally and silence detector monitor.
//!
//! Samples the studio's digital inputs (silence detector relay, on-air and
//! mic-live tallies), debounces them, keeps a single aggregate view of which
//! studio is on air, and fans confirmed changes out to push, chat and
//! dashboard sinks without ever blocking the sampling loop.

pub mod aggregate;
pub mod debounce;
pub mod dispatch;
pub mod event;
pub mod input;
pub mod line;
pub mod monitor;
pub mod registry;
pub mod sinks;
pub mod telemetry;

pub use aggregate::{recompute, AggregateState, ASSERTED_LEVEL, SILENCE_TRIPPED_LEVEL};
pub use debounce::{ConfirmedEdge, DebounceFilter, DebouncedState};
pub use dispatch::{DispatchStats, Dispatcher};
pub use event::{EventKind, NotificationEvent};
pub use input::{InputError, InputSource, SharedInput, SysfsGpio};
pub use line::{Line, LineId, LineTable};
pub use monitor::Monitor;
pub use registry::{LineRegistry, RegistrySnapshot};
pub use sinks::{build_sinks, Sink, SinkError};
