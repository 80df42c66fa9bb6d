//! Logging System for the webroot bridge
//!
//! Provides:
//! - Structured logs with configurable verbosity levels
//! - Console and rolling file output (text or JSON)
//! - Pruning of old log files so the device cannot fill up
//!
//! Rejected requests are logged at `warn` with the attempted path, channel
//! failures at `debug`, served files at `trace`.

mod config;
mod rotation;

#[cfg(test)]
mod tests;

pub use config::{LogFormat, LogLevel, LogOutput, LoggingConfig, LOG_FILE_NAME};
pub use rotation::{
    spawn_rotation_task, LogFileInfo, LogRotator, RotationConfig, RotationStrategy,
};

use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Logging system errors
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to initialize logging: {0}")]
    InitializationError(String),

    #[error("Failed to create log directory: {0}")]
    DirectoryCreationError(String),

    #[error("Failed to rotate logs: {0}")]
    RotationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for logging operations
pub type LoggingResult<T> = Result<T, LoggingError>;

/// How often the background task asks whether the log files rolled over
pub const ROTATION_CHECK_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Installed logging system
///
/// Keep it alive for the lifetime of the process: dropping it flushes and
/// stops the background file writer.
pub struct LoggingSystem {
    config: LoggingConfig,
    rotator: Arc<RwLock<LogRotator>>,
    _guards: Vec<WorkerGuard>,
}

impl LoggingSystem {
    /// Initialize the logging system with the given configuration
    pub fn init(mut config: LoggingConfig) -> LoggingResult<Self> {
        if config.output.uses_file() {
            let log_dir = config.effective_log_directory();
            std::fs::create_dir_all(&log_dir).map_err(|e| {
                LoggingError::DirectoryCreationError(format!(
                    "Failed to create log directory {:?}: {}",
                    log_dir, e
                ))
            })?;
            config.log_directory = Some(log_dir.clone());
            if config.rotation.log_directory.is_none() {
                config.rotation.log_directory = Some(log_dir);
            }
        }

        let mut guards = Vec::new();
        let env_filter = Self::build_env_filter(&config);
        let registry = tracing_subscriber::registry();

        match config.output {
            LogOutput::Console => {
                let fmt_layer = Self::create_console_layer(&config);
                registry
                    .with(env_filter)
                    .with(fmt_layer)
                    .try_init()
                    .map_err(|e| LoggingError::InitializationError(e.to_string()))?;
            }
            LogOutput::File => {
                let (file_layer, guard) = Self::create_file_layer(&config);
                guards.push(guard);
                registry
                    .with(env_filter)
                    .with(file_layer)
                    .try_init()
                    .map_err(|e| LoggingError::InitializationError(e.to_string()))?;
            }
            LogOutput::Both => {
                let console_layer = Self::create_console_layer(&config);
                let (file_layer, guard) = Self::create_file_layer(&config);
                guards.push(guard);
                registry
                    .with(env_filter)
                    .with(console_layer)
                    .with(file_layer)
                    .try_init()
                    .map_err(|e| LoggingError::InitializationError(e.to_string()))?;
            }
        }

        let rotator = Arc::new(RwLock::new(LogRotator::new(config.rotation.clone())));

        let system = Self {
            config,
            rotator,
            _guards: guards,
        };

        // Prune what previous runs left behind
        if system.config.output.uses_file() {
            if let Err(e) = system.rotate_logs() {
                tracing::warn!("Log rotation failed: {}", e);
            }
        }

        Ok(system)
    }

    /// Build environment filter from configuration
    ///
    /// `RUST_LOG`, when set, takes precedence over the configured levels.
    pub(crate) fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return filter;
        }
        Self::configured_filter(config)
    }

    pub(crate) fn configured_filter(config: &LoggingConfig) -> EnvFilter {
        let mut filter = EnvFilter::new(config.level.as_str());

        let mut modules: Vec<_> = config.module_levels.iter().collect();
        modules.sort_by(|a, b| a.0.cmp(b.0));
        for (module, level) in modules {
            match format!("{}={}", module, level).parse() {
                Ok(directive) => filter = filter.add_directive(directive),
                Err(e) => eprintln!("Ignoring log directive for {}: {}", module, e),
            }
        }

        filter
    }

    /// Create console logging layer
    fn create_console_layer<S>(config: &LoggingConfig) -> impl Layer<S>
    where
        S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    {
        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(config.include_target)
            .with_thread_ids(config.include_thread_id)
            .with_file(config.include_file_info)
            .with_line_number(config.include_file_info);

        if config.format == LogFormat::Json {
            layer.json().boxed()
        } else {
            layer.boxed()
        }
    }

    /// Create file logging layer with rotation
    fn create_file_layer<S>(config: &LoggingConfig) -> (impl Layer<S>, WorkerGuard)
    where
        S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    {
        let log_dir = config.effective_log_directory();
        let rotation = config.rotation.strategy.to_appender_rotation();

        let file_appender = RollingFileAppender::new(rotation, &log_dir, LOG_FILE_NAME);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let layer = fmt::layer()
            .with_writer(non_blocking)
            .with_target(config.include_target)
            .with_thread_ids(config.include_thread_id)
            .with_file(config.include_file_info)
            .with_line_number(config.include_file_info)
            .with_ansi(false); // No ANSI colors in file output

        if config.format == LogFormat::Json {
            (layer.json().boxed(), guard)
        } else {
            (layer.boxed(), guard)
        }
    }

    /// Manually trigger log rotation, returning the number of files removed
    pub fn rotate_logs(&self) -> LoggingResult<usize> {
        let mut rotator = self.rotator.write();
        rotator.rotate()
    }

    /// Keep pruning while the process runs
    ///
    /// Returns `None` when logs only go to the console or never roll over.
    /// Must be called from within a tokio runtime.
    pub fn spawn_rotation_task(&self, period: Duration) -> Option<tokio::task::JoinHandle<()>> {
        let rolls_over = self.config.rotation.strategy != RotationStrategy::Never;
        if !self.config.output.uses_file() || !rolls_over {
            return None;
        }
        Some(spawn_rotation_task(Arc::clone(&self.rotator), period))
    }

    /// Get current log directory
    pub fn log_directory(&self) -> Option<&PathBuf> {
        self.config.log_directory.as_ref()
    }

    /// Get current log level
    pub fn log_level(&self) -> LogLevel {
        self.config.level
    }
}

/// Initialize logging with custom configuration
pub fn init_logging(config: LoggingConfig) -> LoggingResult<LoggingSystem> {
    LoggingSystem::init(config)
}
