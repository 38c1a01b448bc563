/// HttpLogSink against a local stand-in for the logs service.
use awslogger::config::types::TargetConfig;
use awslogger::delivery::{DeliveryClient, StreamTarget};
use awslogger::pipeline::{Batch, LogEvent};
use awslogger::sink::{HttpLogSink, InputLogEvent, LogSink, SequenceToken, SinkError};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct MockState {
    groups: HashSet<String>,
    /// (group, stream) -> number of accepted puts
    streams: BTreeMap<(String, String), u64>,
    targets: Vec<String>,
    events: Vec<Value>,
}

type Shared = Arc<Mutex<MockState>>;

fn token_for(writes: u64) -> Value {
    if writes == 0 {
        Value::Null
    } else {
        json!(format!("seq-{}", writes))
    }
}

fn error(code: &str, message: &str) -> (StatusCode, String) {
    (
        StatusCode::BAD_REQUEST,
        json!({ "__type": code, "message": message }).to_string(),
    )
}

async fn handle(
    State(state): State<Shared>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let target = headers
        .get("x-amz-target")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let request: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    let group = request["logGroupName"].as_str().unwrap_or_default().to_string();
    let stream = request["logStreamName"].as_str().unwrap_or_default().to_string();

    let mut state = state.lock().unwrap();
    state.targets.push(target.clone());

    match target.strip_prefix("Logs_20140328.").unwrap_or_default() {
        "CreateLogGroup" => {
            if !state.groups.insert(group) {
                return error("ResourceAlreadyExistsException", "group exists");
            }
            (StatusCode::OK, String::new())
        }
        "CreateLogStream" => {
            if !state.groups.contains(&group) {
                return error("ResourceNotFoundException", "log group does not exist");
            }
            let key = (group, stream);
            if state.streams.contains_key(&key) {
                return error("ResourceAlreadyExistsException", "stream exists");
            }
            state.streams.insert(key, 0);
            (StatusCode::OK, String::new())
        }
        "DescribeLogStreams" => {
            let prefix = request["logStreamNamePrefix"].as_str().unwrap_or_default();
            let start: usize = request["nextToken"]
                .as_str()
                .and_then(|t| t.parse().ok())
                .unwrap_or(0);

            let matching: Vec<(&String, &u64)> = state
                .streams
                .iter()
                .filter(|((g, s), _)| *g == group && s.starts_with(prefix))
                .map(|((_, s), writes)| (s, writes))
                .collect();

            // One stream per page to exercise pagination
            let mut response = json!({ "logStreams": [] });
            if let Some((name, writes)) = matching.get(start) {
                response["logStreams"] = json!([{
                    "logStreamName": name,
                    "uploadSequenceToken": token_for(**writes),
                }]);
            }
            if start + 1 < matching.len() {
                response["nextToken"] = json!((start + 1).to_string());
            }
            (StatusCode::OK, response.to_string())
        }
        "PutLogEvents" => {
            let presented = request["sequenceToken"].clone();
            let key = (group.clone(), stream.clone());
            let Some(writes) = state.streams.get(&key).copied() else {
                return error("ResourceNotFoundException", "log stream does not exist");
            };
            let expected = token_for(writes);
            if presented != expected {
                return (
                    StatusCode::BAD_REQUEST,
                    json!({
                        "__type": "com.amazonaws.logs#InvalidSequenceTokenException",
                        "message": "The given sequenceToken is invalid.",
                        "expectedSequenceToken": expected,
                    })
                    .to_string(),
                );
            }

            state.streams.insert((group, stream), writes + 1);
            if let Some(events) = request["logEvents"].as_array() {
                state.events.extend(events.iter().cloned());
            }
            (
                StatusCode::OK,
                json!({ "nextSequenceToken": token_for(writes + 1) }).to_string(),
            )
        }
        _ => (
            StatusCode::BAD_REQUEST,
            json!({ "__type": "UnknownOperationException" }).to_string(),
        ),
    }
}

async fn start_mock() -> (HttpLogSink, Shared) {
    let state = Shared::default();
    let app = Router::new()
        .route("/", post(handle))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = TargetConfig {
        group: "app".to_string(),
        stream: "web-1".to_string(),
        region: "us-east-1".to_string(),
        endpoint: Some(format!("http://{}/", addr)),
        timeout: Duration::from_secs(5),
    };

    (HttpLogSink::new(&config).unwrap(), state)
}

fn event(message: &str, timestamp_millis: i64) -> InputLogEvent {
    InputLogEvent {
        message: message.to_string(),
        timestamp_millis,
    }
}

#[tokio::test]
async fn test_requests_carry_target_header() {
    let (sink, state) = start_mock().await;

    sink.ensure_group("app").await.unwrap();
    sink.ensure_stream("app", "web-1").await.unwrap();
    sink.describe_streams("app", "web-1").await.unwrap();

    let targets = state.lock().unwrap().targets.clone();
    assert_eq!(
        targets,
        vec![
            "Logs_20140328.CreateLogGroup",
            "Logs_20140328.CreateLogStream",
            "Logs_20140328.DescribeLogStreams",
        ]
    );
}

#[tokio::test]
async fn test_existing_resources_are_not_errors() {
    let (sink, _state) = start_mock().await;

    sink.ensure_group("app").await.unwrap();
    sink.ensure_group("app").await.unwrap();
    sink.ensure_stream("app", "web-1").await.unwrap();
    sink.ensure_stream("app", "web-1").await.unwrap();
}

#[tokio::test]
async fn test_stream_in_missing_group_is_not_found() {
    let (sink, _state) = start_mock().await;

    let result = sink.ensure_stream("nope", "web-1").await;
    assert!(matches!(result, Err(SinkError::NotFound(_))));
}

#[tokio::test]
async fn test_describe_follows_pagination() {
    let (sink, state) = start_mock().await;
    sink.ensure_group("app").await.unwrap();
    for stream in ["web-1", "web-10", "web-2", "db-1"] {
        sink.ensure_stream("app", stream).await.unwrap();
    }

    let streams = sink.describe_streams("app", "web-").await.unwrap();
    let names: Vec<_> = streams.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["web-1", "web-10", "web-2"]);

    let describes = state
        .lock()
        .unwrap()
        .targets
        .iter()
        .filter(|t| t.ends_with("DescribeLogStreams"))
        .count();
    assert_eq!(describes, 3);
}

#[tokio::test]
async fn test_describe_stops_at_exact_name() {
    let (sink, _state) = start_mock().await;
    sink.ensure_group("app").await.unwrap();
    for stream in ["web-1", "web-10", "web-11"] {
        sink.ensure_stream("app", stream).await.unwrap();
    }

    let streams = sink.describe_streams("app", "web-1").await.unwrap();
    assert_eq!(streams.len(), 1);
    assert_eq!(streams[0].name, "web-1");
    assert_eq!(streams[0].upload_sequence_token, None);
}

#[tokio::test]
async fn test_put_chains_tokens_and_maps_conflicts() {
    let (sink, state) = start_mock().await;
    sink.ensure_group("app").await.unwrap();
    sink.ensure_stream("app", "web-1").await.unwrap();

    let first = sink
        .put_batch("app", "web-1", None, &[event("a", 1704067200000)])
        .await
        .unwrap();
    assert_eq!(first, Some(SequenceToken::new("seq-1")));

    let second = sink
        .put_batch("app", "web-1", first.as_ref(), &[event("b", 1704067201000)])
        .await
        .unwrap();
    assert_eq!(second, Some(SequenceToken::new("seq-2")));

    let stale = sink
        .put_batch("app", "web-1", first.as_ref(), &[event("c", 1704067202000)])
        .await;
    match stale {
        Err(SinkError::TokenConflict { expected }) => {
            assert_eq!(expected, Some(SequenceToken::new("seq-2")));
        }
        other => panic!("expected token conflict, got {:?}", other),
    }

    let events = state.lock().unwrap().events.clone();
    assert_eq!(
        events,
        vec![
            json!({ "timestamp": 1704067200000i64, "message": "a" }),
            json!({ "timestamp": 1704067201000i64, "message": "b" }),
        ]
    );
}

#[tokio::test]
async fn test_delivery_client_over_http() {
    let (sink, state) = start_mock().await;
    let mut client = DeliveryClient::new(
        Arc::new(sink),
        StreamTarget {
            group: "app".to_string(),
            stream: "web-1".to_string(),
        },
    );
    client.setup().await.unwrap();
    assert!(client.is_ready());
    assert_eq!(client.sequence_token(), None);

    let timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let batch = Batch::from(vec![LogEvent {
        text: "2024-01-01T00:00:00+0000 hello".to_string(),
        timestamp,
    }]);

    client.flush(&batch).await.unwrap();
    assert_eq!(client.sequence_token(), Some(&SequenceToken::new("seq-1")));

    // Someone else writes to the stream
    state
        .lock()
        .unwrap()
        .streams
        .insert(("app".to_string(), "web-1".to_string()), 5);

    assert!(client.flush(&batch).await.is_err());
    assert!(client.is_stale());

    client.flush(&batch).await.unwrap();
    assert_eq!(client.sequence_token(), Some(&SequenceToken::new("seq-6")));
}
