use super::traits::{InputLogEvent, LogSink, SequenceToken, SinkError, StreamDescription};
use crate::config::types::TargetConfig;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const TARGET_PREFIX: &str = "Logs_20140328";
const CONTENT_TYPE_JSON: &str = "application/x-amz-json-1.1";

/// Client for the CloudWatch Logs JSON protocol.
///
/// Requests are not signed. Point `endpoint` at an emulator or a signing proxy
/// when talking to the real service.
#[derive(Debug)]
pub struct HttpLogSink {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpLogSink {
    pub fn new(config: &TargetConfig) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            endpoint: endpoint_for(config),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call<B, R>(&self, action: &str, body: &B) -> Result<R, SinkError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body)?;

        debug!(action = action, bytes = payload.len(), "Sending request");

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, CONTENT_TYPE_JSON)
            .header("X-Amz-Target", format!("{}.{}", TARGET_PREFIX, action))
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(parse_error_body(status.as_u16(), &text));
        }

        // Create calls answer with an empty body
        if text.trim().is_empty() {
            return Ok(serde_json::from_str("{}")?);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

fn endpoint_for(config: &TargetConfig) -> String {
    match &config.endpoint {
        Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
        None => format!("https://logs.{}.amazonaws.com", config.region),
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type", default)]
    error_type: String,
    #[serde(alias = "Message", default)]
    message: String,
    #[serde(rename = "expectedSequenceToken", default)]
    expected_sequence_token: Option<String>,
}

/// Map a failed response onto the sink's error kinds.
fn parse_error_body(status: u16, text: &str) -> SinkError {
    let Ok(body) = serde_json::from_str::<ErrorBody>(text) else {
        return SinkError::Api {
            code: format!("HTTP {}", status),
            message: text.to_string(),
        };
    };

    // "__type" may carry a namespace: "com.amazonaws.logs#InvalidSequenceTokenException"
    let code = body
        .error_type
        .rsplit('#')
        .next()
        .unwrap_or_default()
        .to_string();

    match code.as_str() {
        "InvalidSequenceTokenException" | "DataAlreadyAcceptedException" => {
            SinkError::TokenConflict {
                expected: body.expected_sequence_token.map(SequenceToken::from),
            }
        }
        "ResourceNotFoundException" => SinkError::NotFound(body.message),
        "" => SinkError::Api {
            code: format!("HTTP {}", status),
            message: body.message,
        },
        _ => SinkError::Api {
            code,
            message: body.message,
        },
    }
}

fn is_already_exists(err: &SinkError) -> bool {
    matches!(err, SinkError::Api { code, .. } if code == "ResourceAlreadyExistsException")
}

// ===== Request/Response Types =====

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateLogGroupRequest<'a> {
    log_group_name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateLogStreamRequest<'a> {
    log_group_name: &'a str,
    log_stream_name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DescribeLogStreamsRequest<'a> {
    log_group_name: &'a str,
    log_stream_name_prefix: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeLogStreamsResponse {
    #[serde(default)]
    log_streams: Vec<LogStream>,
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogStream {
    log_stream_name: String,
    upload_sequence_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PutLogEventsRequest<'a> {
    log_group_name: &'a str,
    log_stream_name: &'a str,
    log_events: Vec<WireEvent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sequence_token: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct WireEvent<'a> {
    timestamp: i64,
    message: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PutLogEventsResponse {
    next_sequence_token: Option<String>,
    #[serde(default)]
    rejected_log_events_info: Option<RejectedLogEventsInfo>,
}

/// Index bounds of events the service accepted the put for but did not store.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct RejectedLogEventsInfo {
    too_new_log_event_start_index: Option<i64>,
    too_old_log_event_end_index: Option<i64>,
    expired_log_event_end_index: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Empty {}

#[async_trait]
impl LogSink for HttpLogSink {
    async fn ensure_group(&self, group: &str) -> Result<(), SinkError> {
        let request = CreateLogGroupRequest {
            log_group_name: group,
        };
        match self.call::<_, Empty>("CreateLogGroup", &request).await {
            Ok(_) => Ok(()),
            Err(e) if is_already_exists(&e) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn ensure_stream(&self, group: &str, stream: &str) -> Result<(), SinkError> {
        let request = CreateLogStreamRequest {
            log_group_name: group,
            log_stream_name: stream,
        };
        match self.call::<_, Empty>("CreateLogStream", &request).await {
            Ok(_) => Ok(()),
            Err(e) if is_already_exists(&e) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn describe_streams(
        &self,
        group: &str,
        prefix: &str,
    ) -> Result<Vec<StreamDescription>, SinkError> {
        let mut streams = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let request = DescribeLogStreamsRequest {
                log_group_name: group,
                log_stream_name_prefix: prefix,
                next_token: next_token.as_deref(),
            };
            let page: DescribeLogStreamsResponse =
                self.call("DescribeLogStreams", &request).await?;

            streams.extend(page.log_streams.into_iter().map(|s| StreamDescription {
                name: s.log_stream_name,
                upload_sequence_token: s.upload_sequence_token.map(SequenceToken::from),
            }));

            // Stop paging once the exact stream has shown up
            if streams.iter().any(|s| s.name == prefix) {
                break;
            }

            match page.next_token {
                Some(token) if next_token.as_deref() != Some(token.as_str()) => {
                    next_token = Some(token)
                }
                _ => break,
            }
        }

        Ok(streams)
    }

    async fn put_batch(
        &self,
        group: &str,
        stream: &str,
        token: Option<&SequenceToken>,
        events: &[InputLogEvent],
    ) -> Result<Option<SequenceToken>, SinkError> {
        let request = PutLogEventsRequest {
            log_group_name: group,
            log_stream_name: stream,
            log_events: events
                .iter()
                .map(|e| WireEvent {
                    timestamp: e.timestamp_millis,
                    message: &e.message,
                })
                .collect(),
            sequence_token: token.map(SequenceToken::as_str),
        };

        let response: PutLogEventsResponse = self.call("PutLogEvents", &request).await?;

        if let Some(rejected) = &response.rejected_log_events_info {
            warn!(
                group = group,
                stream = stream,
                too_new_start_index = ?rejected.too_new_log_event_start_index,
                too_old_end_index = ?rejected.too_old_log_event_end_index,
                expired_end_index = ?rejected.expired_log_event_end_index,
                "Some log events were rejected"
            );
        }

        Ok(response.next_sequence_token.map(SequenceToken::from))
    }
}
