//! Tests for the session module

use super::*;
use crate::config::{LoggingConfig, SessionConfigBuilder};
use crate::http::{BlockingTransport, HttpRequest, Transport, TransportError};
use crate::pagination::PageRequest;
use crate::types::{BackoffType, Direction, TotalPages};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use reqwest::header::HeaderValue;
use reqwest::StatusCode;
use serde_json::json;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type Reply = std::result::Result<HttpResponse, TransportError>;
type Handler = dyn Fn(u32, &HttpRequest) -> Reply + Send + Sync;

/// Transport answering from a closure and recording what it was sent
#[derive(Clone)]
struct StubTransport {
    handler: Arc<Handler>,
    calls: Arc<AtomicU32>,
    sent: Arc<Mutex<Vec<HttpRequest>>>,
}

impl StubTransport {
    fn new(handler: impl Fn(u32, &HttpRequest) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            handler: Arc::new(handler),
            calls: Arc::new(AtomicU32::new(0)),
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn always(status: u16, body: &'static str) -> Self {
        Self::new(move |_, _| Ok(reply(status, body)))
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn sent(&self) -> Vec<HttpRequest> {
        self.sent.lock().unwrap().clone()
    }

    fn answer(&self, request: HttpRequest) -> Reply {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let reply = (self.handler)(call, &request);
        self.sent.lock().unwrap().push(request);
        reply
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn send(&self, request: HttpRequest) -> Reply {
        self.answer(request)
    }
}

impl BlockingTransport for StubTransport {
    fn send(&self, request: HttpRequest) -> Reply {
        self.answer(request)
    }
}

fn reply(status: u16, body: &str) -> HttpResponse {
    HttpResponse::new(
        StatusCode::from_u16(status).unwrap(),
        HeaderMap::new(),
        body.to_string(),
    )
}

fn reply_with_link(body: &str, link: &str) -> HttpResponse {
    let mut headers = HeaderMap::new();
    headers.insert("link", HeaderValue::from_str(link).unwrap());
    HttpResponse::new(StatusCode::OK, headers, body.to_string())
}

fn redirect_to(status: u16, location: &str) -> HttpResponse {
    let mut headers = HeaderMap::new();
    headers.insert("location", HeaderValue::from_str(location).unwrap());
    HttpResponse::new(StatusCode::from_u16(status).unwrap(), headers, String::new())
}

fn query_value<'a>(request: &'a HttpRequest, key: &str) -> Option<&'a str> {
    request
        .query
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Three pages of two devices each, linked by `startingAfter`
fn three_pages() -> StubTransport {
    StubTransport::new(|_, request| {
        let page = match query_value(request, "startingAfter") {
            None => reply_with_link(
                r#"[{"serial":"A"},{"serial":"B"}]"#,
                "<https://api.meraki.com/api/v1/organizations/1/devices?perPage=2&startingAfter=B>; rel=next",
            ),
            Some("B") => reply_with_link(
                r#"[{"serial":"C"},{"serial":"D"}]"#,
                "<https://api.meraki.com/api/v1/organizations/1/devices?perPage=2&startingAfter=D>; rel=next",
            ),
            Some(_) => reply(200, r#"[{"serial":"E"},{"serial":"F"}]"#),
        };
        Ok(page)
    })
}

fn test_config() -> SessionConfigBuilder {
    SessionConfig::builder()
        .api_key("0123456789abcdef")
        .nginx_429_retry_wait_time(Duration::ZERO)
        .action_batch_retry_wait_time(Duration::ZERO)
        .network_delete_retry_wait_time(Duration::ZERO)
        .backoff(BackoffType::Constant, Duration::ZERO, Duration::ZERO)
        .maximum_retries(2)
        .logging(LoggingConfig::suppressed())
}

fn async_session(config: SessionConfig, transport: &StubTransport) -> AsyncRestSession<StubTransport> {
    AsyncRestSession::with_transport(config, transport.clone()).unwrap()
}

fn blocking_session(config: SessionConfig, transport: &StubTransport) -> RestSession<StubTransport> {
    RestSession::with_transport(config, transport.clone()).unwrap()
}

fn devices() -> PageRequest {
    PageRequest::new(RequestDescriptor::get("/organizations/1/devices").query("perPage", 2))
}

fn serials(items: &[JsonValue]) -> Vec<&str> {
    items.iter().filter_map(|d| d["serial"].as_str()).collect()
}

// ============================================================================
// ApiResponse Tests
// ============================================================================

#[test]
fn test_api_response_from_http() {
    let response = ApiResponse::from_http(reply(200, r#"{"id":"N_1"}"#)).unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body, Some(json!({"id": "N_1"})));
    assert!(!response.simulated);

    let empty = ApiResponse::from_http(reply(204, " \n")).unwrap();
    assert_eq!(empty.body, None);

    let err = ApiResponse::from_http(reply(200, "<html>")).unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
}

#[test]
fn test_session_requires_api_key() {
    let config = SessionConfig::builder()
        .logging(LoggingConfig::suppressed())
        .build()
        .with_env_fallbacks_from(|_| None);
    let err = RestSession::with_transport(config, StubTransport::always(200, "[]")).unwrap_err();
    assert!(matches!(err, Error::MissingApiKey { .. }));
}

#[test]
fn test_prepare_resolves_url_and_headers() {
    let core = SessionCore::new(test_config().build()).unwrap();
    let prepared = core.prepare(&RequestDescriptor::get("/organizations").query("perPage", 10), None);

    assert_eq!(prepared.url, "https://api.meraki.com/api/v1/organizations");
    assert_eq!(prepared.query, vec![("perPage".to_string(), "10".to_string())]);
    assert_eq!(prepared.timeout, Duration::from_secs(60));
    assert_eq!(
        prepared.headers.get("authorization").unwrap(),
        "Bearer 0123456789abcdef"
    );
}

// ============================================================================
// Retry Behaviour (async)
// ============================================================================

#[tokio::test]
async fn test_rate_limit_retried_until_exhausted() {
    let transport = StubTransport::always(429, r#"{"errors":["Too many requests"]}"#);
    let session = async_session(test_config().build(), &transport);

    let err = session.send(&RequestDescriptor::get("/organizations")).await.unwrap_err();
    assert_eq!(transport.calls(), 3);
    assert!(matches!(err, Error::RateLimitExhausted { attempts: 3, .. }));
}

#[tokio::test]
async fn test_rate_limit_without_waiting_fails_at_once() {
    let transport = StubTransport::always(429, "");
    let session = async_session(test_config().wait_on_rate_limit(false).build(), &transport);

    let err = session.send(&RequestDescriptor::get("/organizations")).await.unwrap_err();
    assert_eq!(transport.calls(), 1);
    assert_eq!(err.attempts(), Some(1));
}

#[tokio::test]
async fn test_rate_limit_then_success() {
    let transport = StubTransport::new(|call, _| {
        Ok(if call == 1 {
            reply(429, "")
        } else {
            reply(200, r#"[{"id":"1"}]"#)
        })
    });
    let session = async_session(test_config().build(), &transport);

    let body = session.get("/organizations", &[]).await.unwrap();
    assert_eq!(body, Some(json!([{"id": "1"}])));
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn test_client_error_not_retried_by_default() {
    let transport = StubTransport::always(400, r#"{"errors":["Invalid name"]}"#);
    let session = async_session(test_config().build(), &transport);

    let err = session.post("/organizations", Some(json!({"name": ""}))).await.unwrap_err();
    assert_eq!(transport.calls(), 1);
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.body(), Some(r#"{"errors":["Invalid name"]}"#));
}

#[tokio::test]
async fn test_client_error_retried_when_enabled() {
    let transport = StubTransport::always(400, "{}");
    let session = async_session(
        test_config().retry_4xx_error(true, Duration::ZERO).build(),
        &transport,
    );

    let err = session.delete("/networks/N_1").await.unwrap_err();
    assert_eq!(transport.calls(), 3);
    assert!(matches!(err, Error::ClientErrorExhausted { attempts: 3, status: 400, .. }));
}

#[tokio::test]
async fn test_action_batch_conflict_retried_regardless_of_4xx_flag() {
    let transport = StubTransport::new(|call, _| {
        Ok(if call < 3 {
            reply(400, r#"{"errors":["Too many concurrently executing batches. Maximum is 5."]}"#)
        } else {
            reply(201, r#"{"id":"B1","status":{"completed":false}}"#)
        })
    });
    let session = async_session(test_config().build(), &transport);

    let body = session
        .post("/organizations/1/actionBatches", Some(json!({"actions": []})))
        .await
        .unwrap();
    assert_eq!(body.unwrap()["id"], "B1");
    assert_eq!(transport.calls(), 3);
}

#[tokio::test]
async fn test_server_errors_exhaust_attempts() {
    let transport = StubTransport::always(503, "unavailable");
    let session = async_session(test_config().maximum_retries(4).build(), &transport);

    let err = session.send(&RequestDescriptor::get("/organizations")).await.unwrap_err();
    assert_eq!(transport.calls(), 5);
    assert!(matches!(err, Error::ServerErrorExhausted { status: 503, attempts: 5, .. }));
}

#[tokio::test]
async fn test_transport_failure_retried() {
    let transport = StubTransport::new(|call, _| {
        if call == 1 {
            Err(TransportError::Timeout)
        } else {
            Ok(reply(200, "{}"))
        }
    });
    let session = async_session(test_config().build(), &transport);

    assert_eq!(session.get("/organizations/1", &[]).await.unwrap(), Some(json!({})));
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn test_simulate_never_sends_mutations() {
    let transport = StubTransport::always(200, "[]");
    let session = async_session(test_config().simulate(true).build(), &transport);

    let response = session
        .request(&RequestDescriptor::put("/devices/Q2XX").json(json!({"name": "ap"})))
        .await
        .unwrap();
    assert!(response.simulated);
    assert_eq!(response.status, 200);
    assert_eq!(response.body, None);
    assert_eq!(transport.calls(), 0);

    session.get("/organizations", &[]).await.unwrap();
    assert_eq!(transport.calls(), 1);
}

// ============================================================================
// Redirects
// ============================================================================

#[test]
fn test_prepare_for_redirect_target() {
    let core = SessionCore::new(test_config().build()).unwrap();
    let request = RequestDescriptor::get("/organizations").query("perPage", 10);

    let kept = core.prepare(&request, Some("https://n149.meraki.com/api/v1/organizations"));
    assert_eq!(kept.url, "https://n149.meraki.com/api/v1/organizations");
    assert_eq!(kept.query, vec![("perPage".to_string(), "10".to_string())]);

    let replaced = core.prepare(&request, Some("https://n149.meraki.com/api/v1/organizations?perPage=10"));
    assert!(replaced.query.is_empty());
    assert_eq!(replaced.headers.get("authorization").unwrap(), "Bearer 0123456789abcdef");
}

#[tokio::test]
async fn test_redirect_followed_with_session_headers() {
    let transport = StubTransport::new(|call, _| {
        Ok(if call == 1 {
            redirect_to(307, "https://n149.meraki.com/api/v1/organizations")
        } else {
            reply(200, r#"[{"id":"1"}]"#)
        })
    });
    let session = async_session(test_config().maximum_retries(0).build(), &transport);

    let body = session.get("/organizations", &[("perPage", "5")]).await.unwrap();
    assert_eq!(body, Some(json!([{"id": "1"}])));

    let sent = transport.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].url, "https://api.meraki.com/api/v1/organizations");
    assert_eq!(sent[1].url, "https://n149.meraki.com/api/v1/organizations");
    assert_eq!(query_value(&sent[1], "perPage"), Some("5"));
    assert_eq!(sent[1].headers.get("authorization").unwrap(), "Bearer 0123456789abcdef");
}

#[tokio::test]
async fn test_retry_after_redirect_stays_on_target() {
    let transport = StubTransport::new(|call, _| {
        Ok(match call {
            1 => redirect_to(302, "/api/v1/shard/organizations"),
            2 => reply(503, ""),
            _ => reply(200, "[]"),
        })
    });
    let session = async_session(test_config().maximum_retries(1).build(), &transport);

    session.get("/organizations", &[]).await.unwrap();
    let urls: Vec<_> = transport.sent().into_iter().map(|r| r.url).collect();
    assert_eq!(
        urls,
        vec![
            "https://api.meraki.com/api/v1/organizations",
            "https://api.meraki.com/api/v1/shard/organizations",
            "https://api.meraki.com/api/v1/shard/organizations",
        ]
    );
}

#[tokio::test]
async fn test_redirect_loop_fails() {
    let transport = StubTransport::new(|_, _| Ok(redirect_to(301, "https://api.meraki.com/api/v1/organizations")));
    let session = async_session(test_config().build(), &transport);

    let err = session.get("/organizations", &[]).await.unwrap_err();
    assert!(matches!(err, Error::Redirect { .. }));
    assert_eq!(transport.calls(), crate::http::MAX_REDIRECTS + 1);
}

#[test]
fn test_blocking_redirect_followed() {
    let transport = StubTransport::new(|call, _| {
        Ok(if call == 1 {
            redirect_to(308, "https://n149.meraki.com/api/v1/networks/N_1")
        } else {
            reply(200, r#"{"id":"N_1"}"#)
        })
    });
    let session = blocking_session(test_config().build(), &transport);

    let body = session.get("/networks/N_1", &[]).unwrap();
    assert_eq!(body, Some(json!({"id": "N_1"})));
    assert_eq!(transport.sent()[1].url, "https://n149.meraki.com/api/v1/networks/N_1");
}

// ============================================================================
// Pagination (async)
// ============================================================================

#[tokio::test]
async fn test_get_pages_merges_all_pages_in_order() {
    let transport = three_pages();
    let session = async_session(test_config().build(), &transport);

    let merged = session.get_pages(devices().all_pages()).await.unwrap();
    let items = merged.as_array().unwrap();
    assert_eq!(serials(items), vec!["A", "B", "C", "D", "E", "F"]);
    assert_eq!(transport.calls(), 3);

    let sent = transport.sent();
    assert_eq!(query_value(&sent[1], "startingAfter"), Some("B"));
    assert_eq!(query_value(&sent[2], "perPage"), Some("2"));
}

#[tokio::test]
async fn test_get_pages_single_page_budget() {
    let transport = three_pages();
    let session = async_session(test_config().build(), &transport);

    let merged = session.get_pages(devices()).await.unwrap();
    assert_eq!(merged.as_array().unwrap().len(), 2);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_get_pages_is_repeatable() {
    let transport = three_pages();
    let session = async_session(test_config().build(), &transport);

    let first = session.get_pages(devices().total_pages(TotalPages::Limit(2))).await.unwrap();
    let second = session.get_pages(devices().total_pages(TotalPages::Limit(2))).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(transport.calls(), 4);
}

#[tokio::test]
async fn test_get_pages_aborts_on_page_failure() {
    let transport = StubTransport::new(|call, _| {
        Ok(if call == 1 {
            reply_with_link("[1]", "<https://x/y?startingAfter=1>; rel=next")
        } else {
            reply(404, r#"{"errors":["Not found"]}"#)
        })
    });
    let session = async_session(test_config().build(), &transport);

    let err = session.get_pages(devices().all_pages()).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_lazy_pages_yield_same_items() {
    let transport = three_pages();
    let session = async_session(test_config().build(), &transport);

    let items = session.iter_pages(devices().all_pages()).collect_all().await.unwrap();
    assert_eq!(serials(&items), vec!["A", "B", "C", "D", "E", "F"]);
}

#[tokio::test]
async fn test_lazy_pages_fetch_on_demand() {
    let transport = three_pages();
    let session = async_session(test_config().build(), &transport);

    let mut stream = session.iter_pages(devices().all_pages());
    assert_eq!(transport.calls(), 0);

    stream.next().await.unwrap();
    stream.next().await.unwrap();
    assert_eq!(transport.calls(), 1);
    assert_eq!(stream.pages_fetched(), 1);

    let third = stream.next().await.unwrap().unwrap();
    assert_eq!(third["serial"], "C");
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn test_lazy_pages_end_after_error() {
    let transport = StubTransport::always(404, "{}");
    let session = async_session(test_config().build(), &transport);

    let mut stream = session.iter_pages(devices().all_pages());
    assert!(stream.next().await.is_err());
    assert_eq!(stream.next().await.unwrap(), None);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_lazy_pages_as_stream() {
    use futures::StreamExt;

    let transport = three_pages();
    let session = async_session(test_config().build(), &transport);

    let items: Vec<JsonValue> = session
        .iter_pages(devices().all_pages())
        .into_stream()
        .take(3)
        .map(|item| item.unwrap())
        .collect()
        .await;
    assert_eq!(serials(&items), vec!["A", "B", "C"]);
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn test_pages_honours_iterator_setting() {
    let transport = three_pages();

    let eager = async_session(test_config().build(), &transport);
    assert!(eager.pages(devices()).await.unwrap().collected().is_some());

    let lazy = async_session(test_config().use_iterator_for_get_pages(true).build(), &transport);
    let calls_before = transport.calls();
    let stream = lazy.pages(devices()).await.unwrap().lazy().unwrap();
    assert_eq!(transport.calls(), calls_before);
    assert_eq!(stream.collect_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_event_log_pages_backward() {
    let transport = StubTransport::new(|_, request| {
        Ok(match query_value(request, "endingBefore") {
            None => reply_with_link(
                r#"{"pageStartAt":"t2","pageEndAt":"t3","events":[{"id":4},{"id":3}]}"#,
                "<https://x/networks/N/events?endingBefore=t2>; rel=prev",
            ),
            Some(_) => reply(200, r#"{"pageStartAt":"t1","pageEndAt":"t2","events":[{"id":2},{"id":1}]}"#),
        })
    });
    let session = async_session(test_config().build(), &transport);

    let merged = session
        .get_pages(
            PageRequest::new(RequestDescriptor::get("/networks/N/events"))
                .all_pages()
                .direction(Direction::Prev),
        )
        .await
        .unwrap();
    assert_eq!(merged["pageStartAt"], "t1");
    assert_eq!(merged["events"], json!([{"id": 4}, {"id": 3}, {"id": 2}, {"id": 1}]));
}

// ============================================================================
// Concurrency Gate
// ============================================================================

#[derive(Clone, Default)]
struct SlowTransport {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Transport for SlowTransport {
    async fn send(&self, _request: HttpRequest) -> Reply {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(reply(200, "{}"))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_gate_bounds_in_flight_requests() {
    let transport = SlowTransport::default();
    let session = Arc::new(
        AsyncRestSession::with_transport(
            test_config().maximum_concurrent_requests(2).build(),
            transport.clone(),
        )
        .unwrap(),
    );

    let tasks: Vec<_> = (0..5)
        .map(|i| {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.get(&format!("/devices/Q{i}"), &[]).await })
        })
        .collect();
    for task in futures::future::join_all(tasks).await {
        assert!(task.unwrap().is_ok());
    }

    assert_eq!(transport.calls.load(Ordering::SeqCst), 5);
    assert_eq!(transport.peak.load(Ordering::SeqCst), 2);
    assert_eq!(session.in_flight(), 0);
}

// ============================================================================
// Blocking Session
// ============================================================================

#[test]
fn test_blocking_rate_limit_attempts() {
    let transport = StubTransport::always(429, "");
    let session = blocking_session(test_config().maximum_retries(1).build(), &transport);

    let err = session.get("/organizations", &[]).unwrap_err();
    assert_eq!(transport.calls(), 2);
    assert!(err.is_exhausted());
}

#[test]
fn test_blocking_network_delete_conflict_retried() {
    let transport = StubTransport::new(|call, _| {
        Ok(if call == 1 {
            reply(400, r#"{"errors":["This may be due to concurrent requests to delete networks."]}"#)
        } else {
            reply(204, "")
        })
    });
    let session = blocking_session(test_config().build(), &transport);

    assert_eq!(session.delete("/networks/N_1").unwrap(), None);
    assert_eq!(transport.calls(), 2);
}

#[test]
fn test_blocking_get_pages() {
    let transport = three_pages();
    let session = blocking_session(test_config().build(), &transport);

    let merged = session.get_pages(devices().all_pages()).unwrap();
    assert_eq!(
        serials(merged.as_array().unwrap()),
        vec!["A", "B", "C", "D", "E", "F"]
    );
}

#[test]
fn test_blocking_lazy_pages() {
    let transport = three_pages();
    let session = blocking_session(test_config().build(), &transport);

    let first_two: Vec<JsonValue> = session
        .iter_pages(devices().all_pages())
        .take(2)
        .collect::<Result<_>>()
        .unwrap();
    assert_eq!(serials(&first_two), vec!["A", "B"]);
    assert_eq!(transport.calls(), 1);

    let all: Vec<JsonValue> = session
        .iter_pages(devices().all_pages())
        .collect::<Result<_>>()
        .unwrap();
    assert_eq!(all.len(), 6);
}

#[test]
fn test_blocking_lazy_pages_stop_after_error() {
    let transport = StubTransport::always(500, "");
    let session = blocking_session(test_config().maximum_retries(0).build(), &transport);

    let results: Vec<_> = session.iter_pages(devices().all_pages()).collect();
    assert_eq!(results.len(), 1);
    assert!(results[0].is_err());
}

#[test]
fn test_blocking_simulate_and_close() {
    let transport = StubTransport::always(200, "{}");
    let session = blocking_session(test_config().simulate(true).build(), &transport);

    assert_eq!(session.post("/organizations", Some(json!({"name": "x"}))).unwrap(), None);
    assert_eq!(transport.calls(), 0);
    session.close();
}
