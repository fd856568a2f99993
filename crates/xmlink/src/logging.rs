use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Rendering for the diagnostics the link driver writes to stderr.
///
/// Decoded device events go to stdout as JSON lines either way; this only
/// selects how the tracing output around them looks.
#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Default verbosity for all link layers.
#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Install the global subscriber.
///
/// `--log-level` sets the default across all layers; `RUST_LOG` overrides
/// it when set, which is how to turn up one layer at a time (say,
/// `RUST_LOG=xmlink_frame=trace` for per-frame decode logs without the
/// channel noise).
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.directive()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}
