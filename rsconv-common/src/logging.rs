//! Tracing subscriber setup shared by rsconv binaries
//!
//! The subscriber is installed before configuration is read, so messages from
//! config loading are not lost. The configured level is applied afterwards
//! through [`LoggingHandle::apply_level`].

use crate::{Error, Result};
use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

/// Level used until the configuration has been read
pub const BOOTSTRAP_LOG_LEVEL: &str = "info";

/// Build the filter: `RUST_LOG` when set, otherwise `default_level`
pub fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Handle to the installed filter
#[derive(Clone)]
pub struct LoggingHandle {
    filter: reload::Handle<EnvFilter, Registry>,
}

impl LoggingHandle {
    /// Swap in the filter for `level`; `RUST_LOG` still wins when set
    pub fn apply_level(&self, level: &str) -> Result<()> {
        self.filter
            .reload(env_filter(level))
            .map_err(|e| Error::Config(format!("Failed to apply log level '{}': {}", level, e)))
    }

    /// Directives of the active filter
    pub fn current_filter(&self) -> Option<String> {
        self.filter.with_current(|f| f.to_string()).ok()
    }
}

fn reloadable_filter(default_level: &str) -> (reload::Layer<EnvFilter, Registry>, LoggingHandle) {
    let (layer, filter) = reload::Layer::new(env_filter(default_level));
    (layer, LoggingHandle { filter })
}

/// Install the global subscriber (stderr fmt layer)
///
/// Logs go to stderr so JSON dumps on stdout stay machine-readable.
pub fn init_tracing(default_level: &str) -> Result<LoggingHandle> {
    let (filter, handle) = reloadable_filter(default_level);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))?;
    Ok(handle)
}
