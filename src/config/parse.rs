use super::types::*;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Upper bound on events per put accepted by the sink.
pub const MAX_PUT_SIZE_LIMIT: usize = 10_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),
}

/// Load a config file without applying any overrides.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    load(Some(path), &ConfigOverrides::default())
}

/// Build the effective configuration: defaults, then the file (if any), then overrides.
///
/// An empty stream name falls back to the machine's hostname before validation.
pub fn load(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => Config::default(),
    };

    overrides.apply(&mut config);

    if config.target.stream.is_empty() {
        if let Some(host) = hostname::get().ok().and_then(|h| h.into_string().ok()) {
            config.target.stream = host;
        }
    }

    validate_config(&config)?;

    Ok(config)
}

fn read_config_file(path: &Path) -> Result<Config, ConfigError> {
    let yaml_string = fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    // An empty file is a valid "all defaults" config
    if yaml_string.trim().is_empty() {
        return Ok(Config::default());
    }

    let config = serde_yaml::from_str(&yaml_string).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("in file '{}': {}", path.display(), e),
        ))
    })?;

    Ok(config)
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.target.group.trim().is_empty() {
        errors.push("target.group must be set (--group)".to_string());
    }
    if config.target.stream.trim().is_empty() {
        errors.push("target.stream must be set (--stream)".to_string());
    }
    if config.target.region.trim().is_empty() && config.target.endpoint.is_none() {
        errors.push("either target.region or target.endpoint must be set".to_string());
    }

    if config.batch.message_buffer_size == 0 {
        errors.push("batch.message_buffer_size must be at least 1".to_string());
    }
    if config.batch.max_put_size == 0 || config.batch.max_put_size > MAX_PUT_SIZE_LIMIT {
        errors.push(format!(
            "batch.max_put_size must be between 1 and {}, got {}",
            MAX_PUT_SIZE_LIMIT, config.batch.max_put_size
        ));
    }
    if config.batch.debounce.is_zero() {
        errors.push("batch.debounce must be greater than zero".to_string());
    }

    if config.source.read_buffer_size == 0 {
        errors.push("source.read_buffer_size must be at least 1".to_string());
    }
    if config.source.source_type == SourceType::Udp && config.source.listen.is_none() {
        errors.push("source.listen is required for the udp source (--udp)".to_string());
    }

    if config.timestamp.format.trim().is_empty() {
        errors.push("timestamp.format must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}
