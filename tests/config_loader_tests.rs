//! Configuration loading: layered env files, typed parsing, and synchronous
//! validation.

use std::fs;

use larder::config::{ConfigError, ConfigLoader, PacingMode, ResumeScan};
use tempfile::TempDir;

fn write_env(dir: &TempDir, name: &str, contents: &str) {
    fs::write(dir.path().join(name), contents).expect("write env file");
}

#[test]
fn loads_typed_values_from_env_file() {
    let dir = TempDir::new().unwrap();
    write_env(
        &dir,
        ".env",
        "LARDER_APP_KEY=lindos\n\
         LARDER_STORE_ID=7446\n\
         LARDER_DEPT_CONCURRENCY=3\n\
         LARDER_DETAIL_CONCURRENCY=12\n\
         LARDER_DRY_RUN=true\n\
         LARDER_SINCE=2026-08-01\n\
         LARDER_RESUME_SCAN=all\n\
         LARDER_PACING_MODE=serialized\n\
         LARDER_PACING_MIN_SPACING_MS=2500\n\
         LARDER_RETRY_MAX_RETRIES=4\n\
         LARDER_RETRY_THROTTLE_STATUS_CODES=429,400,418\n",
    );

    let config = ConfigLoader::with_base_dir(dir.path().to_path_buf())
        .load()
        .unwrap();

    assert_eq!(config.app_key, "lindos");
    assert_eq!(config.store_id, 7446);
    assert_eq!(config.fetch.dept_concurrency, 3);
    assert_eq!(config.fetch.detail_concurrency, 12);
    assert!(config.fetch.dry_run);
    assert_eq!(
        config.fetch.since.map(|d| d.to_string()),
        Some("2026-08-01".to_string())
    );
    assert_eq!(config.fetch.resume_scan, ResumeScan::All);
    assert_eq!(config.pacing.mode, PacingMode::Serialized);
    assert_eq!(config.pacing.min_spacing_ms, 2500);
    assert_eq!(config.retry.max_retries, 4);
    assert_eq!(config.retry.throttle_status_codes, vec![429, 400, 418]);
}

#[test]
fn profile_layer_overrides_base_env() {
    let dir = TempDir::new().unwrap();
    write_env(
        &dir,
        ".env",
        "LARDER_APP_KEY=base-key\nLARDER_PROFILE=staging\nLARDER_STORE_ID=1\n",
    );
    write_env(&dir, ".env.staging", "LARDER_STORE_ID=2\n");
    write_env(&dir, ".env.staging.local", "LARDER_STORE_ID=3\n");

    let config = ConfigLoader::with_base_dir(dir.path().to_path_buf())
        .load()
        .unwrap();

    assert_eq!(config.profile, "staging");
    assert_eq!(config.store_id, 3);
    assert_eq!(config.app_key, "base-key");
}

#[test]
fn missing_app_key_is_rejected() {
    let dir = TempDir::new().unwrap();
    write_env(&dir, ".env", "LARDER_STORE_ID=7442\n");

    let result = ConfigLoader::with_base_dir(dir.path().to_path_buf()).load();
    assert!(matches!(result, Err(ConfigError::MissingAppKey)));
}

#[test]
fn unknown_resume_scan_is_rejected() {
    let dir = TempDir::new().unwrap();
    write_env(
        &dir,
        ".env",
        "LARDER_APP_KEY=k\nLARDER_RESUME_SCAN=sometimes\n",
    );

    let result = ConfigLoader::with_base_dir(dir.path().to_path_buf()).load();
    assert!(matches!(
        result,
        Err(ConfigError::InvalidResumeScan { .. })
    ));
}

#[test]
fn malformed_since_date_is_rejected() {
    let dir = TempDir::new().unwrap();
    write_env(
        &dir,
        ".env",
        "LARDER_APP_KEY=k\nLARDER_SINCE=last-tuesday\n",
    );

    let result = ConfigLoader::with_base_dir(dir.path().to_path_buf()).load();
    assert!(matches!(result, Err(ConfigError::InvalidSinceDate { .. })));
}

#[test]
fn invalid_retry_bounds_fail_validation() {
    let dir = TempDir::new().unwrap();
    write_env(
        &dir,
        ".env",
        "LARDER_APP_KEY=k\n\
         LARDER_RETRY_BASE_DELAY_MS=60000\n\
         LARDER_RETRY_MAX_DELAY_MS=1000\n",
    );

    let result = ConfigLoader::with_base_dir(dir.path().to_path_buf()).load();
    assert!(matches!(
        result,
        Err(ConfigError::InvalidRetryBounds { .. })
    ));
}
