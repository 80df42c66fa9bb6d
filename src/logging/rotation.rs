//! Log rotation functionality
//!
//! `tracing-appender` starts a new file per period; the rotator prunes the
//! old ones so a long-running bridge cannot fill the device.

use super::config::{default_log_directory, LOG_FILE_NAME};
use super::LoggingError;
use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Log rotation strategy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RotationStrategy {
    /// Rotate logs daily
    #[default]
    Daily,
    /// Rotate logs hourly
    Hourly,
    /// Never rotate logs
    Never,
}

impl RotationStrategy {
    /// Matching `tracing-appender` rotation
    pub fn to_appender_rotation(self) -> tracing_appender::rolling::Rotation {
        use tracing_appender::rolling::Rotation;
        match self {
            RotationStrategy::Daily => Rotation::DAILY,
            RotationStrategy::Hourly => Rotation::HOURLY,
            RotationStrategy::Never => Rotation::NEVER,
        }
    }
}

/// Log rotation configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    /// Rotation strategy
    pub strategy: RotationStrategy,

    /// Maximum number of log files to keep
    pub max_files: usize,

    /// Maximum total size of all log files (in bytes)
    pub max_total_size: u64,

    /// Maximum age of log files (in days)
    pub max_age_days: u32,

    /// Log directory for rotation management
    pub log_directory: Option<PathBuf>,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            strategy: RotationStrategy::Daily,
            max_files: 7,
            max_total_size: 20 * 1024 * 1024, // 20 MB
            max_age_days: 14,
            log_directory: None,
        }
    }
}

impl RotationConfig {
    /// Create a production-ready rotation configuration
    pub fn production() -> Self {
        Self {
            strategy: RotationStrategy::Daily,
            max_files: 14,
            max_total_size: 50 * 1024 * 1024, // 50 MB
            max_age_days: 30,
            log_directory: None,
        }
    }

    /// Create a minimal rotation configuration for development
    pub fn development() -> Self {
        Self {
            strategy: RotationStrategy::Never,
            max_files: 3,
            max_total_size: 10 * 1024 * 1024, // 10 MB
            max_age_days: 7,
            log_directory: None,
        }
    }
}

/// Log file information
#[derive(Debug, Clone)]
pub struct LogFileInfo {
    pub path: PathBuf,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

/// Log rotator implementation
pub struct LogRotator {
    config: RotationConfig,
    last_rotation: Option<DateTime<Utc>>,
}

impl LogRotator {
    /// Create a new log rotator with the given configuration
    pub fn new(config: RotationConfig) -> Self {
        Self {
            config,
            last_rotation: None,
        }
    }

    /// Prune old log files, returning how many were removed
    pub fn rotate(&mut self) -> Result<usize, LoggingError> {
        let log_dir = self
            .config
            .log_directory
            .clone()
            .unwrap_or_else(default_log_directory);

        if !log_dir.exists() {
            return Ok(0); // Nothing to rotate
        }

        let mut files = self.get_log_files(&log_dir)?;

        // The newest file is the one being written and is never pruned
        let (max_files, max_total_size) = match files.pop() {
            Some(active) => (
                self.config.max_files.saturating_sub(1),
                self.config.max_total_size.saturating_sub(active.size),
            ),
            None => (self.config.max_files, self.config.max_total_size),
        };

        // Each policy sees only the files the previous one kept
        let mut removed = 0;
        removed += self.cleanup_by_count(&mut files, max_files)?;
        removed += self.cleanup_by_size(&mut files, max_total_size)?;
        removed += self.cleanup_by_age(&mut files)?;

        self.last_rotation = Some(Utc::now());

        Ok(removed)
    }

    /// Get all bridge log files in the directory, oldest first
    fn get_log_files(&self, log_dir: &Path) -> Result<Vec<LogFileInfo>, LoggingError> {
        let mut files = Vec::new();

        for entry in fs::read_dir(log_dir)?.flatten() {
            let path = entry.path();
            let is_log = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(LOG_FILE_NAME))
                .unwrap_or(false);
            if !is_log || !path.is_file() {
                continue;
            }

            if let Ok(metadata) = fs::metadata(&path) {
                let modified = metadata
                    .modified()
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now());

                files.push(LogFileInfo {
                    path,
                    size: metadata.len(),
                    modified,
                });
            }
        }

        files.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));

        Ok(files)
    }

    /// Cleanup log files by count
    fn cleanup_by_count(
        &self,
        files: &mut Vec<LogFileInfo>,
        max_files: usize,
    ) -> Result<usize, LoggingError> {
        if files.len() <= max_files {
            return Ok(0);
        }

        let to_remove = files.len() - max_files;
        for file in files.drain(..to_remove) {
            tracing::debug!("Removing old log file: {:?}", file.path);
            fs::remove_file(&file.path)?;
        }
        Ok(to_remove)
    }

    /// Cleanup log files by total size
    fn cleanup_by_size(
        &self,
        files: &mut Vec<LogFileInfo>,
        max_total_size: u64,
    ) -> Result<usize, LoggingError> {
        let mut current_size: u64 = files.iter().map(|f| f.size).sum();
        let mut removed = 0;

        while current_size > max_total_size && !files.is_empty() {
            let file = files.remove(0);
            tracing::debug!("Removing log file to reduce total size: {:?}", file.path);
            fs::remove_file(&file.path)?;
            current_size -= file.size;
            removed += 1;
        }
        Ok(removed)
    }

    /// Cleanup log files by age
    fn cleanup_by_age(&self, files: &mut Vec<LogFileInfo>) -> Result<usize, LoggingError> {
        let cutoff = Utc::now() - Duration::days(self.config.max_age_days as i64);
        let before = files.len();

        let mut kept = Vec::with_capacity(files.len());
        for file in files.drain(..) {
            if file.modified < cutoff {
                tracing::debug!("Removing expired log file: {:?}", file.path);
                fs::remove_file(&file.path)?;
            } else {
                kept.push(file);
            }
        }
        *files = kept;

        Ok(before - files.len())
    }

    /// Check if rotation is needed based on strategy
    pub fn needs_rotation(&self) -> bool {
        let last = match self.last_rotation {
            Some(last) => last,
            None => return self.config.strategy != RotationStrategy::Never,
        };

        let now = Utc::now();
        match self.config.strategy {
            RotationStrategy::Never => false,
            RotationStrategy::Daily => now.date_naive() != last.date_naive(),
            RotationStrategy::Hourly => {
                now.date_naive() != last.date_naive() || now.hour() != last.hour()
            }
        }
    }

    /// Get the last rotation time
    pub fn last_rotation(&self) -> Option<DateTime<Utc>> {
        self.last_rotation
    }

    /// Get current configuration
    pub fn config(&self) -> &RotationConfig {
        &self.config
    }
}

/// Prune on a timer for as long as the process runs
///
/// Every `period` the rotator is asked whether its strategy has rolled over;
/// if so the pruning runs on the blocking pool. Abort the handle to stop.
pub fn spawn_rotation_task(
    rotator: Arc<RwLock<LogRotator>>,
    period: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if !rotator.read().needs_rotation() {
                continue;
            }

            let rotator = Arc::clone(&rotator);
            match tokio::task::spawn_blocking(move || rotator.write().rotate()).await {
                Ok(Ok(removed)) if removed > 0 => {
                    tracing::debug!("Log rotation removed {} file(s)", removed)
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::warn!("Log rotation failed: {}", e),
                Err(e) => tracing::error!("Log rotation task failed: {}", e),
            }
        }
    })
}
