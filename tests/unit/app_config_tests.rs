/*!
 * Tests for application configuration functionality
 */

use std::time::Duration;

use pagetran::app_config::{Config, ExhaustedPolicy, LogLevel};
use pagetran::errors::AppError;
use pagetran::translation::AbortMode;
use pagetran::translation::escalation::EscalationDecision;

use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.source_language, "English");
    assert_eq!(config.target_language, "Farsi");
    assert_eq!(config.backend.endpoint, "http://localhost:8000/v1/chat/completions");
    assert_eq!(config.backend.timeout_secs, 180);
    assert!(config.backend.api_key.is_empty());
    assert_eq!(config.batching.max_chars_per_batch, 12_000);
    assert_eq!(config.batching.context_tail_chars, 2_000);
    assert_eq!(config.batching.concurrent_requests, 4);
    assert_eq!(config.retry.max_retries, 3);
    assert_eq!(config.retry.retry_delay_ms, 5_000);
    assert_eq!(config.on_exhausted, ExhaustedPolicy::Prompt);
    assert_eq!(config.abort_mode, AbortMode::Immediate);
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.validate().is_ok());
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let invalid: Vec<(&str, fn(&mut Config))> = vec![
        ("empty target", |c| c.target_language = "  ".to_string()),
        ("bad endpoint", |c| c.backend.endpoint = "not a url".to_string()),
        ("empty model", |c| c.backend.model = String::new()),
        ("zero timeout", |c| c.backend.timeout_secs = 0),
        ("zero batch", |c| c.batching.max_chars_per_batch = 0),
        ("zero workers", |c| c.batching.concurrent_requests = 0),
        ("shrinking backoff", |c| c.retry.backoff_multiplier = 0.5),
        ("no batch placeholder", |c| c.prompt_template = "Translate {context}".to_string()),
    ];

    for (name, mutate) in invalid {
        let mut config = Config::default();
        mutate(&mut config);
        assert!(
            matches!(config.validate(), Err(AppError::Config(_))),
            "{} should be rejected",
            name
        );
    }
}

#[test]
fn test_config_validation_withLegacyPlaceholder_shouldAccept() {
    let mut config = Config::default();
    config.prompt_template = "Translate from {source_language} to {target_language}:\n{text_to_translate}".to_string();
    assert!(config.validate().is_ok());
}

/// Test that a missing config file is created with defaults and reloads identically
#[test]
fn test_load_or_create_withMissingFile_shouldWriteDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("conf.json");

    let created = Config::load_or_create(&path).unwrap();
    assert!(path.exists());

    let reloaded = Config::load_or_create(&path).unwrap();
    assert_eq!(reloaded.target_language, created.target_language);
    assert_eq!(reloaded.prompt_template, created.prompt_template);
    assert_eq!(reloaded.batching.max_chars_per_batch, created.batching.max_chars_per_batch);
}

#[test]
fn test_load_or_create_withMalformedJson_shouldReturnConfigError() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "conf.json", "{ not json").unwrap();

    assert!(matches!(Config::load_or_create(&path), Err(AppError::Config(_))));
}

#[test]
fn test_config_file_withEnumValues_shouldParseLowercase() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(
        dir.path(),
        "conf.json",
        r#"{"on_exhausted": "skip", "abort_mode": "graceful", "log_level": "debug", "retry": {"max_retries": 1}}"#,
    )
    .unwrap();

    let config = Config::load_or_create(&path).unwrap();
    assert_eq!(config.on_exhausted, ExhaustedPolicy::Skip);
    assert_eq!(config.on_exhausted.fixed_decision(), Some(EscalationDecision::Skip));
    assert_eq!(config.abort_mode, AbortMode::Graceful);
    assert_eq!(config.log_level.to_level_filter(), log::LevelFilter::Debug);
    assert_eq!(config.retry.max_retries, 1);
    assert_eq!(config.retry.retry_delay_ms, 5_000);
}

#[test]
fn test_scheduler_options_shouldReflectConfig() {
    let mut config = Config::default();
    config.batching.concurrent_requests = 7;
    config.retry.max_retries = 5;
    config.retry.retry_delay_ms = 10;
    config.abort_mode = AbortMode::Graceful;

    let options = config.scheduler_options();
    assert_eq!(options.concurrent_requests, 7);
    assert_eq!(options.retry.max_retries, 5);
    assert_eq!(options.retry.retry_delay, Duration::from_millis(10));
    assert_eq!(options.abort_mode, AbortMode::Graceful);
}
