//! Logging setup.
//!
//! Logs go to stderr so that answers printed on stdout stay machine-readable.

use std::io::IsTerminal;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AppError, AppResult};

/// Output style for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl LogFormat {
    /// Parse a format name; anything other than "json" is pretty.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Build the filter from an explicit level, falling back to `RUST_LOG`, then `warn`.
fn build_filter(log_level: Option<&str>) -> AppResult<EnvFilter> {
    let fallback = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
    let directive = log_level.unwrap_or(&fallback);

    EnvFilter::try_new(directive)
        .map_err(|e| AppError::Config(format!("Invalid log filter '{}': {}", directive, e)))
}

/// Initialize the global tracing subscriber.
///
/// Can only succeed once per process; later calls return a config error.
///
/// # Example
/// ```no_run
/// use coursemate_core::logging::{init_logging, LogFormat};
///
/// init_logging(Some("info"), false, LogFormat::Pretty).expect("logging");
/// ```
pub fn init_logging(log_level: Option<&str>, no_color: bool, format: LogFormat) -> AppResult<()> {
    let env_filter = build_filter(log_level)?;
    let ansi = !no_color && supports_color();

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_ansi(ansi),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };

    result.map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))
}

/// Color only when stderr is a terminal and NO_COLOR is unset.
fn supports_color() -> bool {
    std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal()
}
