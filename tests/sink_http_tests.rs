use axum::{
    Json, Router,
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode, header},
    routing::post,
};
use lead_portal::{
    enquiry::{
        ApiSink, DeliveryPolicy, EnquirySubmitter, LeadSink, RelaySink, SinkError, SinkState,
        SubmitError,
        sink::http_client,
    },
    models::{EnquiryForm, EnquirySubmission, PageRef},
};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::net::TcpListener;

// --- Capture server standing in for the API and the relay ---

#[derive(Debug, Clone)]
enum Captured {
    Json {
        content_type: String,
        body: serde_json::Value,
    },
    Multipart(Vec<(String, String)>),
}

#[derive(Clone)]
struct Capture {
    calls: Arc<Mutex<Vec<Captured>>>,
    api_status: StatusCode,
    relay_status: StatusCode,
    delay: Duration,
}

async fn api_endpoint(
    State(capture): State<Capture>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> StatusCode {
    tokio::time::sleep(capture.delay).await;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    capture
        .calls
        .lock()
        .unwrap()
        .push(Captured::Json { content_type, body });
    capture.api_status
}

async fn relay_endpoint(State(capture): State<Capture>, mut multipart: Multipart) -> StatusCode {
    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap().to_string();
        let value = field.text().await.unwrap();
        fields.push((name, value));
    }
    capture.calls.lock().unwrap().push(Captured::Multipart(fields));
    capture.relay_status
}

struct TestSinks {
    address: String,
    calls: Arc<Mutex<Vec<Captured>>>,
}

async fn spawn_sinks(api_status: StatusCode, relay_status: StatusCode, delay: Duration) -> TestSinks {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let capture = Capture {
        calls: calls.clone(),
        api_status,
        relay_status,
        delay,
    };

    let router = Router::new()
        .route("/api/ContactFormSubmissions", post(api_endpoint))
        .route("/relay", post(relay_endpoint))
        .with_state(capture);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestSinks {
        address: format!("http://127.0.0.1:{}", port),
        calls,
    }
}

fn real_submitter(address: &str, timeout: Duration) -> EnquirySubmitter {
    let client = http_client(timeout).unwrap();
    let api = Arc::new(ApiSink::new(client.clone(), &format!("{address}/"))) as SinkState;
    let relay = Arc::new(RelaySink::new(
        client,
        &format!("{address}/relay"),
        vec!["sales@example.com".to_string(), "ops@example.com".to_string()],
        "https://api.example.com/api/webhooks/relay",
    )) as SinkState;
    EnquirySubmitter::new(api, relay)
}

fn jane() -> EnquiryForm {
    EnquiryForm {
        name: "Jane Doe".to_string(),
        email: "jane@example.com".to_string(),
        phone: String::new(),
        message: "Hi".to_string(),
    }
}

fn field<'a>(fields: &'a [(String, String)], name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

// --- Tests ---

#[tokio::test]
async fn test_one_json_post_then_one_multipart_post() {
    let sinks = spawn_sinks(StatusCode::OK, StatusCode::OK, Duration::ZERO).await;
    let submitter = real_submitter(&sinks.address, Duration::from_secs(5));

    let report = submitter
        .submit(&jane(), &PageRef::new("test", "Why Degaussing Is Not Enough"))
        .await
        .expect("both sinks answer 200");
    assert!(report.api_delivered() && report.relay_delivered());

    let calls = sinks.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 2);

    match &calls[0] {
        Captured::Json { content_type, body } => {
            assert!(content_type.starts_with("application/json"));
            assert_eq!(body["email"], "jane@example.com");
            assert_eq!(body["blogId"], "test");
        }
        other => panic!("first call should be the JSON API, got {other:?}"),
    }

    match &calls[1] {
        Captured::Multipart(fields) => {
            assert_eq!(field(fields, "blogId"), Some("test"));
            assert_eq!(field(fields, "email"), Some("jane@example.com"));
            assert_eq!(
                field(fields, "_subject"),
                Some("New Enquiry from Blog: Why Degaussing Is Not Enough")
            );
            assert_eq!(field(fields, "_cc"), Some("sales@example.com,ops@example.com"));
            assert_eq!(
                field(fields, "_webhook"),
                Some("https://api.example.com/api/webhooks/relay")
            );
            assert_eq!(field(fields, "_captcha"), Some("false"));
            assert_eq!(field(fields, "_template"), Some("table"));
            assert_eq!(field(fields, "source"), Some("blog-enquiry"));
            // Routing metadata comes before the lead fields.
            assert_eq!(fields[0].0, "_subject");
        }
        other => panic!("second call should be the relay, got {other:?}"),
    }
}

#[tokio::test]
async fn test_api_rejection_is_reported_not_fatal() {
    let sinks = spawn_sinks(
        StatusCode::INTERNAL_SERVER_ERROR,
        StatusCode::OK,
        Duration::ZERO,
    )
    .await;
    let submitter = real_submitter(&sinks.address, Duration::from_secs(5));

    let report = submitter
        .submit(&jane(), &PageRef::new("test", "t"))
        .await
        .expect("relay accepted");

    assert!(matches!(
        report.api,
        Err(SinkError::Rejected { sink: "api", status: 500 })
    ));
    assert_eq!(sinks.calls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_relay_rejection_fails_under_all_policy_too() {
    let sinks = spawn_sinks(StatusCode::OK, StatusCode::BAD_REQUEST, Duration::ZERO).await;
    let submitter =
        real_submitter(&sinks.address, Duration::from_secs(5)).with_policy(DeliveryPolicy::All);

    let result = submitter.submit(&jane(), &PageRef::new("test", "t")).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_slow_sink_times_out() {
    let sinks = spawn_sinks(StatusCode::OK, StatusCode::OK, Duration::from_secs(2)).await;
    let client = http_client(Duration::from_millis(200)).unwrap();
    let api = ApiSink::new(client, &sinks.address);
    let submission = EnquirySubmission::new(&jane(), &PageRef::new("test", "t"), chrono::Utc::now());

    let result = api.deliver(&submission).await;

    assert!(matches!(result, Err(SinkError::Timeout { sink: "api" })));
}

#[tokio::test]
async fn test_api_timeout_fails_submission_before_relay() {
    let sinks = spawn_sinks(StatusCode::OK, StatusCode::OK, Duration::from_secs(2)).await;
    let submitter = real_submitter(&sinks.address, Duration::from_millis(200));

    let result = submitter.submit(&jane(), &PageRef::new("test", "t")).await;

    match result {
        Err(SubmitError::Delivery(report)) => {
            assert!(matches!(report.api, Err(SinkError::Timeout { sink: "api" })));
            assert!(matches!(report.relay, Err(SinkError::Skipped { sink: "relay" })));
        }
        other => panic!("expected a delivery failure, got {other:?}"),
    }
    let relayed = sinks
        .calls
        .lock()
        .unwrap()
        .iter()
        .any(|call| matches!(call, Captured::Multipart(_)));
    assert!(!relayed, "the relay must not be called after the API timed out");
}

#[tokio::test]
async fn test_unreachable_sink_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = http_client(Duration::from_secs(2)).unwrap();
    let relay = RelaySink::new(client, &format!("{address}/relay"), vec![], "");
    let submission = EnquirySubmission::new(&jane(), &PageRef::new("test", "t"), chrono::Utc::now());

    let result = relay.deliver(&submission).await;

    assert!(matches!(result, Err(SinkError::Transport { sink: "relay", .. })));
}

#[test]
fn test_api_endpoint_joins_base_url() {
    let client = reqwest::Client::new();
    assert_eq!(
        ApiSink::new(client.clone(), "https://api.example.com/").endpoint(),
        "https://api.example.com/api/ContactFormSubmissions"
    );
    assert_eq!(
        ApiSink::new(client, "https://api.example.com").endpoint(),
        "https://api.example.com/api/ContactFormSubmissions"
    );
}
