//! Tracing setup for the command-line jobs.
//!
//! Our own crates log at the configured [`LogLevel`]; HTTP internals are held
//! at `warn`. An explicit `filter` in the config wins over `RUST_LOG`, which
//! wins over the default directives.
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//! use bridge_traits::time::LogLevel;
//!
//! init_logging(
//!     LoggingConfig::default()
//!         .with_format(LogFormat::Json)
//!         .with_level(LogLevel::Debug),
//! )?;
//! tracing::info!(row = 2, "Shortcut created");
//! ```

use crate::error::{Error, Result};
use bridge_traits::time::LogLevel;
use serde::{Deserialize, Serialize};
use std::io;
use tracing_subscriber::{
    filter::EnvFilter, layer::SubscriberExt, registry::Registry, util::SubscriberInitExt, Layer,
};

/// Crates whose events are shown at the configured level.
const WORKSPACE_TARGETS: &[&str] = &[
    "drive_shortcuts",
    "create_shortcuts",
    "list_folder",
    "core_runtime",
    "core_auth",
    "core_batch",
    "core_inventory",
    "core_spreadsheet",
    "core_service",
    "provider_google_drive",
    "bridge_desktop",
];

/// Dependencies that are too chatty below `warn`.
const QUIET_TARGETS: &[&str] = &["h2", "hyper", "hyper_util", "reqwest", "rustls"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, colored
    Pretty,
    /// One JSON object per event
    Json,
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Compact
        }
    }
}

/// `logging` section of the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Level for the workspace crates.
    pub level: LogLevel,
    /// Full `EnvFilter` directive string, e.g. `core_batch=debug,core_auth=trace`.
    pub filter: Option<String>,
    pub display_target: bool,
    pub display_thread_info: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            display_target: false,
            display_thread_info: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }

    pub fn with_thread_info(mut self, display: bool) -> Self {
        self.display_thread_info = display;
        self
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// [`Error::Config`] when the filter does not parse or a subscriber is
/// already installed in this process.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;

    Registry::default()
        .with(output_layer(&config))
        .with(filter)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}

fn output_layer(config: &LoggingConfig) -> Box<dyn Layer<Registry> + Send + Sync> {
    let base = tracing_subscriber::fmt::layer()
        .with_target(config.display_target)
        .with_thread_ids(config.display_thread_info)
        .with_thread_names(config.display_thread_info)
        .with_writer(io::stdout);

    match config.format {
        LogFormat::Pretty => base.pretty().boxed(),
        LogFormat::Json => base
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .boxed(),
        LogFormat::Compact => base.compact().boxed(),
    }
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let directives = match &config.filter {
        Some(custom) => custom.clone(),
        None => match EnvFilter::try_from_default_env() {
            Ok(from_env) => return Ok(from_env),
            Err(_) => default_directives(config.level),
        },
    };

    EnvFilter::try_new(&directives)
        .map_err(|e| Error::Config(format!("Invalid log filter '{}': {}", directives, e)))
}

fn default_directives(level: LogLevel) -> String {
    let ours = WORKSPACE_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level.as_str()));
    let quiet = QUIET_TARGETS.iter().map(|target| format!("{}=warn", target));

    std::iter::once("warn".to_string())
        .chain(ours)
        .chain(quiet)
        .collect::<Vec<_>>()
        .join(",")
}
