//! Logging setup.

use tallyconf::TelemetryConfig;
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// `log_level` takes any `EnvFilter` directive string. `RUST_LOG` and
/// `TALLY_LOG_LEVEL` have already been folded into it by the config loader.
/// A directive that does not parse falls back to `info`.
pub fn init(config: &TelemetryConfig) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|e| {
        eprintln!("invalid log level {:?} ({}), using info", config.log_level, e);
        EnvFilter::new("info")
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
