//! Structured logging for lattice.
//!
//! Console output carries uptime and thread names so the `mesh-worker-N` and
//! `chunk-gen-N` pools are attributable. Debug builds also write JSON lines
//! to `lattice.log`. The `log` records emitted by `lattice-config` reach the
//! same subscriber through its `tracing-log` bridge.

use std::path::{Path, PathBuf};

use lattice_config::Config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_FILTER: &str = "info,wgpu=warn,naga=warn";

/// Name of the JSON log written in debug builds.
pub const LOG_FILE: &str = "lattice.log";

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over `config.debug.log_level`, which wins over
/// [`DEFAULT_FILTER`]. Returns the JSON log path when one was opened.
/// Calling this twice is harmless: the second call logs a warning.
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) -> Option<PathBuf> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| config_filter(config));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry().with(env_filter).with(console_layer);

    if debug_build
        && let Some(log_dir) = log_dir
        && std::fs::create_dir_all(log_dir).is_ok()
        && let Ok(log_file) = std::fs::File::create(log_dir.join(LOG_FILE))
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_names(true)
            .with_timer(fmt::time::uptime())
            .json();

        if let Err(e) = subscriber.with(file_layer).try_init() {
            tracing::warn!("logging already initialised: {e}");
            return None;
        }
        return Some(log_dir.join(LOG_FILE));
    }

    if let Err(e) = subscriber.try_init() {
        tracing::warn!("logging already initialised: {e}");
    }
    None
}

/// Filter from the config's `log_level`, falling back to [`DEFAULT_FILTER`].
///
/// A bare level such as `"debug"` keeps wgpu and naga at `warn`.
pub fn config_filter(config: Option<&Config>) -> EnvFilter {
    let level = config.map(|c| c.debug.log_level.trim()).unwrap_or_default();
    if level.is_empty() {
        return default_env_filter();
    }
    let directives = if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("{level},wgpu=warn,naga=warn")
    };
    EnvFilter::try_new(&directives).unwrap_or_else(|e| {
        eprintln!("invalid log filter {directives:?}: {e}, using {DEFAULT_FILTER:?}");
        default_env_filter()
    })
}

pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}
