//! Tests for the logging system

use super::*;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

fn write_log(dir: &TempDir, name: &str, size: usize, age: Duration) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, vec![b'x'; size]).unwrap();
    let file = std::fs::File::options().write(true).open(&path).unwrap();
    file.set_modified(SystemTime::now() - age).unwrap();
    path
}

fn rotation_in(dir: &TempDir) -> RotationConfig {
    RotationConfig {
        log_directory: Some(dir.path().to_path_buf()),
        max_files: 100,
        max_total_size: u64::MAX,
        max_age_days: 365,
        ..Default::default()
    }
}

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

#[test]
fn test_log_level_display() {
    assert_eq!(LogLevel::Trace.to_string(), "trace");
    assert_eq!(LogLevel::Debug.to_string(), "debug");
    assert_eq!(LogLevel::Info.to_string(), "info");
    assert_eq!(LogLevel::Warn.to_string(), "warn");
    assert_eq!(LogLevel::Error.to_string(), "error");
}

#[test]
fn test_log_level_parse() {
    assert_eq!("DEBUG".parse::<LogLevel>(), Ok(LogLevel::Debug));
    assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
    assert!("loud".parse::<LogLevel>().is_err());
    assert_eq!(LogLevel::Warn.to_tracing_level(), tracing::Level::WARN);
}

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert_eq!(config.level, LogLevel::Info);
    assert_eq!(config.format, LogFormat::Text);
    assert_eq!(config.output, LogOutput::Console);
    assert!(config.include_target);
    assert!(!config.include_thread_id);
    assert!(!config.include_file_info);
    assert!(config
        .effective_log_directory()
        .to_string_lossy()
        .contains("webroot-bridge"));
}

#[test]
fn test_logging_config_builder() {
    let config = LoggingConfig::new()
        .with_level(LogLevel::Debug)
        .with_format(LogFormat::Json)
        .with_output(LogOutput::File)
        .with_target(false)
        .with_thread_id(true)
        .with_file_info(true)
        .with_module_level("webroot_bridge::channel", LogLevel::Trace);

    assert_eq!(config.level, LogLevel::Debug);
    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.output, LogOutput::File);
    assert!(!config.include_target);
    assert!(config.include_thread_id);
    assert!(config.include_file_info);
    assert_eq!(
        config.module_levels.get("webroot_bridge::channel"),
        Some(&LogLevel::Trace)
    );
}

#[test]
fn test_logging_config_presets() {
    let config = LoggingConfig::development();
    assert_eq!(config.level, LogLevel::Debug);
    assert_eq!(config.output, LogOutput::Console);
    assert!(config.include_file_info);
    assert!(!config.output.uses_file());

    let config = LoggingConfig::production();
    assert_eq!(config.level, LogLevel::Info);
    assert_eq!(config.format, LogFormat::Json);
    assert!(config.output.uses_file());
    assert_eq!(config.module_levels.get("tower_http"), Some(&LogLevel::Warn));
}

#[test]
fn test_logging_config_partial_deserialize() {
    let config: LoggingConfig =
        serde_json::from_str(r#"{"level": "trace", "rotation": {"max_files": 2}}"#).unwrap();
    assert_eq!(config.level, LogLevel::Trace);
    assert_eq!(config.format, LogFormat::Text);
    assert_eq!(config.rotation.max_files, 2);
    assert_eq!(config.rotation.strategy, RotationStrategy::Daily);
}

#[test]
fn test_configured_filter_includes_module_levels() {
    let config = LoggingConfig::new()
        .with_level(LogLevel::Warn)
        .with_module_level("webroot_bridge::bridge", LogLevel::Debug);

    let filter = LoggingSystem::configured_filter(&config).to_string();
    assert!(filter.contains("warn"));
    assert!(filter.contains("webroot_bridge::bridge=debug"));
}

#[test]
fn test_rotation_config_presets() {
    let config = RotationConfig::default();
    assert_eq!(config.strategy, RotationStrategy::Daily);
    assert_eq!(config.max_files, 7);

    assert_eq!(RotationConfig::production().max_files, 14);
    assert_eq!(
        RotationConfig::development().strategy,
        RotationStrategy::Never
    );
}

#[test]
fn test_log_rotator_needs_rotation() {
    let config = RotationConfig {
        strategy: RotationStrategy::Never,
        ..Default::default()
    };
    assert!(!LogRotator::new(config).needs_rotation());

    let temp = TempDir::new().unwrap();
    let mut rotator = LogRotator::new(rotation_in(&temp));
    assert!(rotator.needs_rotation()); // First time should need rotation
    rotator.rotate().unwrap();
    assert!(rotator.last_rotation().is_some());
    assert!(!rotator.needs_rotation());
}

#[test]
fn test_rotation_missing_directory() {
    let temp = TempDir::new().unwrap();
    let config = RotationConfig {
        log_directory: Some(temp.path().join("absent")),
        ..Default::default()
    };
    assert_eq!(LogRotator::new(config).rotate().unwrap(), 0);
}

#[test]
fn test_rotation_by_count_keeps_newest() {
    let temp = TempDir::new().unwrap();
    let oldest = write_log(&temp, "webroot-bridge.log.2026-01-01", 10, DAY * 3);
    let older = write_log(&temp, "webroot-bridge.log.2026-01-02", 10, DAY * 2);
    let newest = write_log(&temp, "webroot-bridge.log.2026-01-03", 10, DAY);

    let config = RotationConfig {
        max_files: 2,
        ..rotation_in(&temp)
    };
    let removed = LogRotator::new(config).rotate().unwrap();

    assert_eq!(removed, 1);
    assert!(!oldest.exists());
    assert!(older.exists());
    assert!(newest.exists());
}

#[test]
fn test_rotation_by_size() {
    let temp = TempDir::new().unwrap();
    let first = write_log(&temp, "webroot-bridge.log.a", 600, DAY * 2);
    let second = write_log(&temp, "webroot-bridge.log.b", 600, DAY);

    let config = RotationConfig {
        max_total_size: 1000,
        ..rotation_in(&temp)
    };
    LogRotator::new(config).rotate().unwrap();

    assert!(!first.exists());
    assert!(second.exists());
}

#[test]
fn test_rotation_by_age_ignores_foreign_files() {
    let temp = TempDir::new().unwrap();
    let expired = write_log(&temp, "webroot-bridge.log.old", 10, DAY * 40);
    let foreign = write_log(&temp, "other.log", 10, DAY * 40);
    let fresh = write_log(&temp, "webroot-bridge.log", 10, Duration::ZERO);

    let config = RotationConfig {
        max_age_days: 30,
        ..rotation_in(&temp)
    };
    let removed = LogRotator::new(config).rotate().unwrap();

    assert_eq!(removed, 1);
    assert!(!expired.exists());
    assert!(foreign.exists());
    assert!(fresh.exists());
}

#[test]
fn test_rotation_by_size_keeps_active_file() {
    let temp = TempDir::new().unwrap();
    let older = write_log(&temp, "webroot-bridge.log.2026-01-01", 400, DAY);
    let active = write_log(&temp, "webroot-bridge.log.2026-01-02", 5000, Duration::ZERO);

    let config = RotationConfig {
        max_total_size: 1000,
        ..rotation_in(&temp)
    };
    let removed = LogRotator::new(config).rotate().unwrap();

    assert_eq!(removed, 1);
    assert!(!older.exists());
    assert!(active.exists());
}

#[test]
fn test_rotation_never_removes_the_only_file() {
    let temp = TempDir::new().unwrap();
    let active = write_log(&temp, "webroot-bridge.log", 5000, DAY * 90);

    let config = RotationConfig {
        max_files: 0,
        max_total_size: 10,
        max_age_days: 1,
        ..rotation_in(&temp)
    };
    assert_eq!(LogRotator::new(config).rotate().unwrap(), 0);
    assert!(active.exists());
}

#[tokio::test]
async fn test_rotation_task_prunes_in_background() {
    let temp = TempDir::new().unwrap();
    for day in 1..=5u32 {
        write_log(
            &temp,
            &format!("webroot-bridge.log.2026-01-0{}", day),
            10,
            DAY * (6 - day),
        );
    }

    let config = RotationConfig {
        max_files: 2,
        ..rotation_in(&temp)
    };
    let rotator = Arc::new(RwLock::new(LogRotator::new(config)));
    let handle = spawn_rotation_task(Arc::clone(&rotator), Duration::from_millis(20));

    let mut remaining = usize::MAX;
    for _ in 0..100 {
        remaining = std::fs::read_dir(temp.path()).unwrap().count();
        if remaining == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    handle.abort();

    assert_eq!(remaining, 2);
    assert!(temp.path().join("webroot-bridge.log.2026-01-05").exists());
    assert!(rotator.read().last_rotation().is_some());
}
