use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub timestamp: TimestampConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

/// Where batches are delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Log group name, created if it doesn't exist
    #[serde(default)]
    pub group: String,
    /// Log stream name, created if it doesn't exist. Empty means the hostname.
    #[serde(default)]
    pub stream: String,
    #[serde(default)]
    pub region: String,
    /// Overrides the regional endpoint (emulators, signing proxies)
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            group: String::new(),
            stream: String::new(),
            region: String::new(),
            endpoint: None,
            timeout: default_timeout(),
        }
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(rename = "type", default = "default_source_type")]
    pub source_type: SourceType,
    /// Bind address for the udp source
    #[serde(default)]
    pub listen: Option<String>,
    /// Datagram buffer size for udp, maximum line length for stdin
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
    #[serde(default = "default_read_error_backoff", with = "humantime_serde")]
    pub read_error_backoff: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            source_type: default_source_type(),
            listen: None,
            read_buffer_size: default_read_buffer_size(),
            read_error_backoff: default_read_error_backoff(),
        }
    }
}

fn default_source_type() -> SourceType {
    SourceType::Stdin
}

fn default_read_buffer_size() -> usize {
    1024
}

fn default_read_error_backoff() -> Duration {
    Duration::from_millis(10)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Stdin,
    Udp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampConfig {
    /// strftime format string, or one of 'iso8601', 'epoch', 'epoch_ms'
    #[serde(default = "default_timestamp_format")]
    pub format: String,
    /// Separator ending the leading timestamp field; None splits on any whitespace
    #[serde(default)]
    pub delimiter: Option<char>,
}

impl Default for TimestampConfig {
    fn default() -> Self {
        Self {
            format: default_timestamp_format(),
            delimiter: None,
        }
    }
}

pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

fn default_timestamp_format() -> String {
    DEFAULT_TIMESTAMP_FORMAT.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Capacity of the queue between line sources and the shipper
    #[serde(default = "default_message_buffer_size")]
    pub message_buffer_size: usize,
    /// Maximum number of events in a single put
    #[serde(default = "default_max_put_size")]
    pub max_put_size: usize,
    /// Idle time after which a non-empty batch is flushed
    #[serde(default = "default_debounce", with = "humantime_serde")]
    pub debounce: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            message_buffer_size: default_message_buffer_size(),
            max_put_size: default_max_put_size(),
            debounce: default_debounce(),
        }
    }
}

fn default_message_buffer_size() -> usize {
    20000
}

fn default_max_put_size() -> usize {
    5000
}

fn default_debounce() -> Duration {
    Duration::from_millis(250)
}

/// Values given on the command line. Every field set here wins over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub group: Option<String>,
    pub stream: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub time_format: Option<String>,
    pub read_buffer_size: Option<usize>,
    pub message_buffer_size: Option<usize>,
    pub max_put_size: Option<usize>,
    pub debounce: Option<Duration>,
    pub udp_listen: Option<String>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(group) = &self.group {
            config.target.group = group.clone();
        }
        if let Some(stream) = &self.stream {
            config.target.stream = stream.clone();
        }
        if let Some(region) = &self.region {
            config.target.region = region.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            config.target.endpoint = Some(endpoint.clone());
        }
        if let Some(format) = &self.time_format {
            config.timestamp.format = format.clone();
        }
        if let Some(size) = self.read_buffer_size {
            config.source.read_buffer_size = size;
        }
        if let Some(size) = self.message_buffer_size {
            config.batch.message_buffer_size = size;
        }
        if let Some(size) = self.max_put_size {
            config.batch.max_put_size = size;
        }
        if let Some(debounce) = self.debounce {
            config.batch.debounce = debounce;
        }
        if let Some(listen) = &self.udp_listen {
            config.source.source_type = SourceType::Udp;
            config.source.listen = Some(listen.clone());
        }
    }
}
