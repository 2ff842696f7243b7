//! Structured logging.
//!
//! # Channels
//! - `console`: stdout, pretty or JSON
//! - `file`: JSON lines in a time-rotated file, written off-thread
//! - `stack`: several of the above at once
//!
//! # Design Decisions
//! - `RUST_LOG` wins over every configured level when set
//! - Each channel filters on its own level, falling back to `log_level`
//! - File writers flush when the returned [`LogGuard`] is dropped

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{self, Rotation};
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::config::schema::{LogChannel, LogFormat, LogRotation, ObservabilityConfig};

/// A channel layer attached to the registry.
pub type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to install subscriber: {0}")]
    Install(#[from] TryInitError),
    #[error("failed to open log file: {0}")]
    File(#[from] rolling::InitError),
}

/// Keeps background log writers alive. Hold it until shutdown.
#[derive(Default)]
pub struct LogGuard {
    workers: Vec<WorkerGuard>,
}

impl LogGuard {
    /// Number of background writers owned by this guard.
    pub fn writers(&self) -> usize {
        self.workers.len()
    }
}

/// Install the global subscriber.
///
/// Fails if a subscriber is already installed.
pub fn init(config: &ObservabilityConfig) -> Result<LogGuard, LoggingError> {
    let (layers, guard) = build_layers(config)?;
    tracing_subscriber::registry().with(layers).try_init()?;
    Ok(guard)
}

/// Build one layer per active channel.
pub fn build_layers(config: &ObservabilityConfig) -> Result<(Vec<BoxedLayer>, LogGuard), LoggingError> {
    let channels = match config.log_channel {
        LogChannel::Stack => config.stack.clone(),
        channel => vec![channel],
    };

    let mut layers: Vec<BoxedLayer> = Vec::with_capacity(channels.len());
    let mut guard = LogGuard::default();
    for channel in channels {
        match channel {
            LogChannel::Console => {
                let filter = channel_filter(config.console.level.as_deref().unwrap_or(&config.log_level));
                let layer: BoxedLayer = match config.log_format {
                    LogFormat::Pretty => fmt::layer().with_filter(filter).boxed(),
                    LogFormat::Json => fmt::layer()
                        .json()
                        .with_current_span(false)
                        .with_filter(filter)
                        .boxed(),
                };
                layers.push(layer);
            }
            LogChannel::File => {
                let file = &config.file;
                let mut builder = rolling::Builder::new()
                    .rotation(rotation(file.rotation))
                    .filename_prefix(&file.prefix)
                    .filename_suffix("log");
                if file.max_files > 0 {
                    builder = builder.max_log_files(file.max_files);
                }
                let appender = builder.build(&file.directory)?;
                let (writer, worker) = tracing_appender::non_blocking(appender);
                guard.workers.push(worker);

                let filter = channel_filter(file.level.as_deref().unwrap_or(&config.log_level));
                layers.push(
                    fmt::layer()
                        .json()
                        .with_current_span(false)
                        .with_ansi(false)
                        .with_writer(writer)
                        .with_filter(filter)
                        .boxed(),
                );
            }
            LogChannel::Stack => {
                tracing::warn!("Nested log stack ignored");
            }
        }
    }

    Ok((layers, guard))
}

fn rotation(rotation: LogRotation) -> Rotation {
    match rotation {
        LogRotation::Minutely => Rotation::MINUTELY,
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Daily => Rotation::DAILY,
        LogRotation::Never => Rotation::NEVER,
    }
}

fn channel_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level))
}

fn default_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("switchyard={level},tower_http={level}"))
}
