//! Logging bootstrap for the probe binary.
//!
//! Log lines go to standard error so standard output only carries the probe
//! report. With diagnostics enabled, driver targets are traced at maximum
//! verbosity and every line gets a millisecond timestamp and the source
//! location of the event.

use crate::Result;
use crate::config::DiagnosticsConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;

/// Filter used when driver diagnostics are on: errors only, except for the
/// driver layers, which are traced in full.
pub const DIAGNOSTICS_FILTER: &str = "error,sqlx=trace,dbprobe_core=trace";

/// Timestamp layout for diagnostic log lines.
pub const DIAGNOSTICS_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Logging settings gathered from the command line and the properties file.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingConfig {
    /// Verbosity level (0=INFO, 1=DEBUG, 2+=TRACE)
    pub verbose: u8,
    /// Only show ERROR level logs
    pub quiet: bool,
    /// Driver diagnostics switch
    pub diagnostics: DiagnosticsConfig,
}

impl LoggingConfig {
    /// Level used when diagnostics are off.
    pub fn level(&self) -> tracing::Level {
        match (self.quiet, self.verbose) {
            (true, _) => tracing::Level::ERROR,
            (false, 0) => tracing::Level::INFO,
            (false, 1) => tracing::Level::DEBUG,
            (false, _) => tracing::Level::TRACE,
        }
    }

    /// Filter directives for the subscriber.
    ///
    /// `RUST_LOG` wins over the computed directives when it is set.
    pub fn filter_directives(&self) -> String {
        if self.diagnostics.enabled {
            DIAGNOSTICS_FILTER.to_string()
        } else {
            self.level().to_string().to_lowercase()
        }
    }
}

/// Local wall-clock timestamps in [`DIAGNOSTICS_TIME_FORMAT`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DiagnosticTimer;

impl FormatTime for DiagnosticTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format(DIAGNOSTICS_TIME_FORMAT))
    }
}

/// Installs the process-wide tracing subscriber.
///
/// Call once, at startup, after the properties file has been read.
///
/// # Errors
/// Returns a configuration error if a subscriber is already installed.
///
/// # Example
/// ```rust,no_run
/// use dbprobe_core::logging::{LoggingConfig, init_logging};
///
/// init_logging(&LoggingConfig { verbose: 1, ..Default::default() })
///     .expect("Failed to initialize logging");
/// ```
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directives()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let installed = if config.diagnostics.enabled {
        builder
            .with_target(true)
            .with_timer(DiagnosticTimer)
            .with_ansi(false)
            .with_file(true)
            .with_line_number(true)
            .try_init()
    } else {
        builder.with_target(false).try_init()
    };

    installed.map_err(|e| {
        crate::error::ProbeError::configuration(format!("Failed to initialize logging: {e}"))
    })
}
