use awslogger::config::types::SourceType;
use awslogger::config::generate::generate_starter_config;
use awslogger::config::{load, load_config, ConfigError, ConfigOverrides};
use awslogger::source::TimestampExtractor;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn write_config(dir: &TempDir, yaml: &str) -> std::path::PathBuf {
    let config_path = dir.path().join("config.yml");
    fs::write(&config_path, yaml).unwrap();
    config_path
}

#[test]
fn test_generated_config_is_valid() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, &generate_starter_config());

    let config = load_config(&config_path).expect("Generated config should be valid");

    assert_eq!(config.target.group, "my-application");
    assert_eq!(config.target.region, "us-east-1");
    // Empty stream in the file resolves to the hostname
    assert!(!config.target.stream.is_empty());
    assert_eq!(config.source.source_type, SourceType::Stdin);
    assert_eq!(config.batch.max_put_size, 5000);
    assert_eq!(config.batch.debounce, Duration::from_millis(250));

    TimestampExtractor::from_config(&config.timestamp).expect("Generated format should parse");
}

#[test]
fn test_duration_parsing() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(
        &temp_dir,
        r#"
target:
  group: app
  stream: web-1
  region: eu-west-1
  timeout: 1m
source:
  read_error_backoff: 50ms
batch:
  debounce: 2s
"#,
    );

    let config = load_config(&config_path).unwrap();

    assert_eq!(config.target.timeout, Duration::from_secs(60));
    assert_eq!(config.source.read_error_backoff, Duration::from_millis(50));
    assert_eq!(config.batch.debounce, Duration::from_secs(2));
    // Untouched sections keep their defaults
    assert_eq!(config.batch.message_buffer_size, 20000);
}

#[test]
fn test_udp_source_with_delimiter() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(
        &temp_dir,
        r#"
target:
  group: app
  stream: web-1
  endpoint: http://localhost:4566
source:
  type: udp
  listen: 127.0.0.1:5514
  read_buffer_size: 65535
timestamp:
  format: epoch_ms
  delimiter: '|'
"#,
    );

    let config = load_config(&config_path).unwrap();

    assert_eq!(config.source.source_type, SourceType::Udp);
    assert_eq!(config.source.listen.as_deref(), Some("127.0.0.1:5514"));
    assert_eq!(config.source.read_buffer_size, 65535);
    assert_eq!(config.timestamp.delimiter, Some('|'));

    let extractor = TimestampExtractor::from_config(&config.timestamp).unwrap();
    let ts = extractor.extract("1704067200000|GET /index.html").unwrap();
    assert_eq!(ts.timestamp_millis(), 1704067200000);
}

#[test]
fn test_flags_override_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(
        &temp_dir,
        r#"
target:
  group: from-file
  stream: web-1
  region: us-east-1
batch:
  max_put_size: 100
"#,
    );

    let overrides = ConfigOverrides {
        group: Some("from-flag".to_string()),
        debounce: Some(Duration::from_millis(500)),
        time_format: Some("iso8601".to_string()),
        ..Default::default()
    };
    let config = load(Some(&config_path), &overrides).unwrap();

    assert_eq!(config.target.group, "from-flag");
    assert_eq!(config.target.stream, "web-1");
    assert_eq!(config.batch.max_put_size, 100);
    assert_eq!(config.batch.debounce, Duration::from_millis(500));
    assert_eq!(config.timestamp.format, "iso8601");
}

#[test]
fn test_flags_alone_are_enough() {
    let overrides = ConfigOverrides {
        group: Some("app".to_string()),
        stream: Some("web-1".to_string()),
        region: Some("us-east-1".to_string()),
        udp_listen: Some("0.0.0.0:5514".to_string()),
        ..Default::default()
    };

    let config = load(None, &overrides).unwrap();

    assert_eq!(config.source.source_type, SourceType::Udp);
    assert_eq!(config.batch.message_buffer_size, 20000);
}

#[test]
fn test_empty_file_means_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, "\n");

    let overrides = ConfigOverrides {
        group: Some("app".to_string()),
        region: Some("us-east-1".to_string()),
        ..Default::default()
    };
    let config = load(Some(&config_path), &overrides).unwrap();

    assert_eq!(config.batch.max_put_size, 5000);
}

#[test]
fn test_missing_group_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(
        &temp_dir,
        r#"
target:
  stream: web-1
  region: us-east-1
"#,
    );

    let result = load_config(&config_path);
    match result {
        Err(ConfigError::ValidationList(errors)) => {
            assert!(errors.iter().any(|e| e.contains("target.group")));
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn test_oversized_put_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(
        &temp_dir,
        r#"
target:
  group: app
  stream: web-1
  region: us-east-1
batch:
  max_put_size: 20000
"#,
    );

    assert!(matches!(
        load_config(&config_path),
        Err(ConfigError::ValidationList(_))
    ));
}

#[test]
fn test_unknown_source_type_fails_to_parse() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(
        &temp_dir,
        r#"
target:
  group: app
source:
  type: kafka
"#,
    );

    let err = load_config(&config_path).unwrap_err();
    assert!(err.to_string().contains("config.yml"));
}
