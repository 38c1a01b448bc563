use crate::config::types::TimestampConfig;
use chrono::format::ParseErrorKind;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimestampError {
    #[error("timestamp format must not be empty")]
    EmptyFormat,

    #[error("line has no leading timestamp field")]
    MissingField,

    #[error("failed to parse timestamp '{value}' with format '{format}': {source}")]
    ParseError {
        value: String,
        format: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimestampFormat {
    Strptime(String),
    Iso8601,
    Epoch,
    EpochMs,
}

impl TimestampFormat {
    fn name(&self) -> &str {
        match self {
            TimestampFormat::Strptime(fmt) => fmt,
            TimestampFormat::Iso8601 => "iso8601",
            TimestampFormat::Epoch => "epoch",
            TimestampFormat::EpochMs => "epoch_ms",
        }
    }
}

/// Parses the timestamp every well-formed line starts with.
///
/// The leading field runs up to the first delimiter (any whitespace unless a
/// delimiter character is configured). Lines that don't parse are reported as
/// errors so the caller can drop them.
#[derive(Debug, Clone)]
pub struct TimestampExtractor {
    format: TimestampFormat,
    delimiter: Option<char>,
}

impl TimestampExtractor {
    /// Create a new TimestampExtractor
    ///
    /// # Arguments
    /// * `format` - One of: strptime format string, 'iso8601', 'epoch', 'epoch_ms'
    /// * `delimiter` - Character ending the timestamp field, or None for whitespace
    pub fn new(format: &str, delimiter: Option<char>) -> Result<Self, TimestampError> {
        let format = match format {
            "" => return Err(TimestampError::EmptyFormat),
            "iso8601" => TimestampFormat::Iso8601,
            "epoch" => TimestampFormat::Epoch,
            "epoch_ms" => TimestampFormat::EpochMs,
            other => TimestampFormat::Strptime(other.to_string()),
        };

        Ok(Self { format, delimiter })
    }

    pub fn from_config(config: &TimestampConfig) -> Result<Self, TimestampError> {
        Self::new(&config.format, config.delimiter)
    }

    /// Returns the leading field of a line, or None when it is empty.
    pub fn leading_field<'a>(&self, line: &'a str) -> Option<&'a str> {
        let field = match self.delimiter {
            Some(delim) => line.split(delim).next(),
            None => line.split(char::is_whitespace).next(),
        }?;

        if field.is_empty() {
            None
        } else {
            Some(field)
        }
    }

    /// Extract the timestamp from the start of a log line
    pub fn extract(&self, line: &str) -> Result<DateTime<Utc>, TimestampError> {
        let value = self
            .leading_field(line)
            .ok_or(TimestampError::MissingField)?;

        match &self.format {
            TimestampFormat::Iso8601 => parse_iso8601(value),
            TimestampFormat::Epoch => parse_epoch(value, 1, &self.format),
            TimestampFormat::EpochMs => parse_epoch(value, 1000, &self.format),
            TimestampFormat::Strptime(fmt) => parse_strptime(value, fmt),
        }
    }
}

fn parse_error(
    value: &str,
    format: &str,
    source: impl std::error::Error + Send + Sync + 'static,
) -> TimestampError {
    TimestampError::ParseError {
        value: value.to_string(),
        format: format.to_string(),
        source: Box::new(source),
    }
}

fn parse_iso8601(value: &str) -> Result<DateTime<Utc>, TimestampError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| parse_error(value, "iso8601", e))
}

fn parse_epoch(
    value: &str,
    units_per_second: i64,
    format: &TimestampFormat,
) -> Result<DateTime<Utc>, TimestampError> {
    let raw: i64 = value
        .parse()
        .map_err(|e: std::num::ParseIntError| parse_error(value, format.name(), e))?;

    let seconds = raw.div_euclid(units_per_second);
    let nanos = (raw.rem_euclid(units_per_second) * (1_000_000_000 / units_per_second)) as u32;

    Utc.timestamp_opt(seconds, nanos).single().ok_or_else(|| {
        parse_error(
            value,
            format.name(),
            std::io::Error::new(std::io::ErrorKind::InvalidData, "timestamp out of range"),
        )
    })
}

fn parse_strptime(value: &str, format: &str) -> Result<DateTime<Utc>, TimestampError> {
    match DateTime::parse_from_str(value, format) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        // Zone names carry no usable offset, so they never fall back to UTC
        Err(e) if e.kind() == ParseErrorKind::NotEnough && !format.contains("%Z") => {
            // No offset in the format: read as UTC
            NaiveDateTime::parse_from_str(value, format)
                .map(|ndt| Utc.from_utc_datetime(&ndt))
                .map_err(|e| parse_error(value, format, e))
        }
        Err(e) => Err(parse_error(value, format, e)),
    }
}
