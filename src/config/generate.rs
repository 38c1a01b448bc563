pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# AWSLOGGER CONFIGURATION
# =============================================================================
# Lines are read from stdin (or a UDP socket), batched, and appended to a log
# stream. Every value here can be overridden on the command line.
#
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/awslogger/config.yml
#   3. /etc/awslogger/config.yml

# =============================================================================
# TARGET
# =============================================================================
target:
  # Log group and stream are created if they don't exist
  group: my-application
  # Leave empty to use the hostname
  stream: ""
  region: us-east-1
  # Uncomment to send to an emulator or signing proxy instead of the region
  # endpoint: http://localhost:4566
  timeout: 30s

# =============================================================================
# SOURCE
# =============================================================================
source:
  # 'stdin' or 'udp'
  type: stdin
  # Bind address, only used by the udp source
  # listen: 127.0.0.1:5514
  # UDP datagram buffer, or maximum line length for stdin
  read_buffer_size: 1024
  # Pause after a read error before trying again
  read_error_backoff: 10ms

# =============================================================================
# TIMESTAMP
# =============================================================================
# Every line must start with its own timestamp. Lines whose leading field
# doesn't parse are dropped.
timestamp:
  # strftime format string, or 'iso8601', 'epoch', 'epoch_ms'
  format: '%Y-%m-%dT%H:%M:%S%z'
  # Character ending the timestamp field; leave unset to split on whitespace
  # delimiter: '|'

# =============================================================================
# BATCHING
# =============================================================================
batch:
  # Lines held between the source and the shipper before readers block
  message_buffer_size: 20000
  # Events per put (at most 10000)
  max_put_size: 5000
  # Idle time before a partial batch is sent
  debounce: 250ms
"#
    .to_string()
}
