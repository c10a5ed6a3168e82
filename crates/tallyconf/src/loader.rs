//! Config file discovery, table merging, and environment variable overlay.

use crate::{ConfigError, TallyConfig};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

/// Fixed install location of the detector's credentials file.
pub const INSTALL_ENV_FILE: &str = "/opt/SilenceDetector/venv/.env";

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Dotenv file that backed the environment overlay, if one was found
    pub env_file: Option<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided it replaces the local override and is
/// returned whether or not it exists, so a mistyped `--config` fails
/// the load instead of being skipped.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/tally/config.toml");
    if system.exists() {
        files.push(system);
    }

    // XDG_CONFIG_HOME or ~/.config
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("tally/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        files.push(path.to_path_buf());
        return files;
    }

    let local = PathBuf::from("tally.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Find the dotenv file holding sink credentials.
///
/// The first of `./.env`, `~/.env` and [`INSTALL_ENV_FILE`] that exists wins.
/// The others are not read.
pub fn discover_env_file() -> Option<PathBuf> {
    let mut candidates = vec![PathBuf::from(".env")];
    if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
        candidates.push(home.join(".env"));
    }
    candidates.push(PathBuf::from(INSTALL_ENV_FILE));

    candidates.into_iter().find(|p| p.is_file())
}

/// Read a dotenv file into a map without touching the process environment.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let parse_error = |e: dotenvy::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut vars = HashMap::new();
    for item in dotenvy::from_path_iter(path).map_err(parse_error)? {
        let (key, value) = item.map_err(parse_error)?;
        vars.insert(key, value);
    }
    Ok(vars)
}

/// Compiled defaults as a TOML table, the base layer for merging.
pub fn default_table() -> Result<toml::Table, ConfigError> {
    toml::Table::try_from(TallyConfig::default()).map_err(|e| ConfigError::Parse {
        path: PathBuf::from("<defaults>"),
        message: e.to_string(),
    })
}

/// Read a TOML file into a raw table.
pub fn load_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_table(&contents, path)
}

fn parse_table(contents: &str, path: &Path) -> Result<toml::Table, ConfigError> {
    contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Deserialize a merged table into a config.
pub fn from_table(table: toml::Table, origin: &Path) -> Result<TallyConfig, ConfigError> {
    toml::Value::Table(table)
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Parse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
}

/// Merge `overlay` into `base`, recursing into tables.
///
/// Scalars and arrays in the overlay replace the base value, so a file
/// that declares `[[lines]]` replaces the whole line table.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(base_child)), toml::Value::Table(overlay_child)) => {
                merge_tables(base_child, overlay_child);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Apply process environment overrides to config.
///
/// `file_vars` come from a dotenv file and only fill in names the process
/// environment leaves unset.
pub fn apply_env_overrides(
    config: &mut TallyConfig,
    sources: &mut ConfigSources,
    file_vars: &HashMap<String, String>,
) -> Result<(), ConfigError> {
    apply_overrides_from(config, sources, |key| {
        env::var(key).ok().or_else(|| file_vars.get(key).cloned())
    })
}

/// Apply overrides from an arbitrary variable lookup.
///
/// Later names in each group win, so the `TALLY_*` spelling beats the
/// legacy detector names when both are set.
pub fn apply_overrides_from<F>(
    config: &mut TallyConfig,
    sources: &mut ConfigSources,
    lookup: F,
) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut take = |key: &str| -> Option<String> {
        let value = lookup(key)?;
        sources.env_overrides.push(key.to_string());
        Some(value)
    };

    // Timing
    if let Some(v) = take("TALLY_POLL_INTERVAL_MS") {
        config.infra.monitor.poll_interval_ms = parse_number("TALLY_POLL_INTERVAL_MS", &v)?;
    }
    if let Some(v) = take("TALLY_DEBOUNCE_MS") {
        config.infra.monitor.debounce_ms = parse_number("TALLY_DEBOUNCE_MS", &v)?;
    }

    // GPIO
    if let Some(v) = take("TALLY_GPIO_ROOT") {
        config.infra.gpio.sysfs_root = PathBuf::from(v);
    }
    if let Some(v) = take("TALLY_GPIO_PIN_OFFSET") {
        config.infra.gpio.pin_offset = parse_number("TALLY_GPIO_PIN_OFFSET", &v)?;
    }

    // Logging - RUST_LOG first so TALLY_LOG_LEVEL wins
    if let Some(v) = take("RUST_LOG") {
        config.infra.telemetry.log_level = v;
    }
    if let Some(v) = take("TALLY_LOG_LEVEL") {
        config.infra.telemetry.log_level = v;
    }

    // Engineering alert push credentials
    for key in ["PUSHOVER_TOKEN", "TALLY_PUSH_TOKEN"] {
        if let Some(v) = take(key) {
            config.sinks.push.token = Some(v);
        }
    }
    for key in ["PUSHOVER_USER", "TALLY_PUSH_USER"] {
        if let Some(v) = take(key) {
            config.sinks.push.user = Some(v);
        }
    }

    // On-air push credentials
    for key in ["PUSHOVER_TOKEN_ONAIR", "TALLY_PUSH_ONAIR_TOKEN"] {
        if let Some(v) = take(key) {
            config.sinks.push_onair.token = Some(v);
        }
    }
    for key in ["PUSHOVER_USER_ONAIR", "TALLY_PUSH_ONAIR_USER"] {
        if let Some(v) = take(key) {
            config.sinks.push_onair.user = Some(v);
        }
    }

    // Chat webhook
    for key in ["WEBHOOK_URL", "TALLY_CHAT_WEBHOOK_URL"] {
        if let Some(v) = take(key) {
            config.sinks.chat.webhook_url = Some(v);
        }
    }

    // Dashboard
    for key in ["DASHBOARD_HOST", "TALLY_DASHBOARD_HOST"] {
        if let Some(v) = take(key) {
            config.sinks.dashboard.host = Some(v);
        }
    }
    for key in ["DASHBOARD_URL", "TALLY_DASHBOARD_PATH"] {
        if let Some(v) = take(key) {
            config.sinks.dashboard.path = Some(v);
        }
    }

    Ok(())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}
