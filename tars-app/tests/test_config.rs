#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::fs;
use tars_app::config::{AppConfig, NotifierConfig};
use tempfile::TempDir;

const MINIMAL: &str = "provider:\n  base_url: http://localhost:11434/v1\n  model: qwen2.5-coder\n";

#[test]
fn test_minimal_config_defaults() {
    let config = AppConfig::from_yaml(MINIMAL).unwrap();
    assert_eq!(config.provider.model, "qwen2.5-coder");
    assert!(config.fallback.is_none());
    assert_eq!(config.workers_dir.to_str().unwrap(), "workers");
    assert_eq!(config.sandbox_dir.to_str().unwrap(), "sandbox");
    assert_eq!(config.notifier, NotifierConfig::Log);
    assert_eq!(config.worker_path("coder").to_str().unwrap(), "workers/coder.yaml");
}

#[test]
fn test_full_config() {
    let yaml = r#"
provider:
  base_url: http://localhost:11434/v1
  model: qwen2.5-coder
  timeout_secs: 30
fallback:
  base_url: https://api.openai.com/v1
  model: gpt-4o-mini
  api_key_env: OPENAI_API_KEY
workers_dir: /opt/tars/workers
notifier:
  type: command
  program: notify-send
  args: ["TARS"]
"#;
    let config = AppConfig::from_yaml(yaml).unwrap();
    assert_eq!(config.provider.timeout_secs, 30);
    let fallback = config.fallback.as_ref().unwrap();
    assert_eq!(fallback.api_key_env.as_deref(), Some("OPENAI_API_KEY"));
    assert_eq!(
        config.notifier,
        NotifierConfig::Command {
            program: "notify-send".to_string(),
            args: vec!["TARS".to_string()],
        }
    );
    config.validate().unwrap();
}

#[test]
fn test_overrides_replace_primary_only() {
    let mut config = AppConfig::from_yaml(MINIMAL).unwrap();
    config.apply_overrides(Some("http://gpu-box:8000/v1".to_string()), None);
    assert_eq!(config.provider.base_url, "http://gpu-box:8000/v1");
    assert_eq!(config.provider.model, "qwen2.5-coder");

    config.apply_overrides(None, Some("  ".to_string()));
    assert_eq!(config.provider.model, "qwen2.5-coder");
}

#[test]
fn test_validation_rejects_empty_model() {
    let config = AppConfig::from_yaml("provider:\n  base_url: http://x\n  model: \"\"\n").unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("provider.model"));
}

#[test]
fn test_missing_provider_is_parse_error() {
    assert!(AppConfig::from_yaml("workers_dir: w\n").is_err());
}

#[test]
fn test_load_resolves_dirs_against_config_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("tars.yaml");
    fs::write(&path, MINIMAL).unwrap();

    let config = AppConfig::load(&path).unwrap();
    assert_eq!(config.workers_dir, temp.path().join("workers"));
    assert_eq!(config.sandbox_dir, temp.path().join("sandbox"));
}

#[test]
fn test_load_missing_file() {
    let err = AppConfig::load("/nonexistent/tars.yaml").unwrap_err();
    assert!(err.to_string().contains("Failed to read"));
}
