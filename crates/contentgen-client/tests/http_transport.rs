use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use contentgen_client::{
    ClientConfig, Dispatcher, HttpTransport, InferenceTransport, Request, SessionStatus, Task,
    TransportError,
};

struct Canned {
    status: &'static str,
    content_type: &'static str,
    body: String,
}

impl Canned {
    fn json(status: &'static str, body: serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.to_string(),
        }
    }

    fn event_stream(body: &str) -> Self {
        Self {
            status: "200 OK",
            content_type: "text/event-stream",
            body: body.to_string(),
        }
    }
}

/// Serves one canned response and yields the raw request it received.
async fn serve_once(canned: Canned) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let base_url = format!("http://{}", listener.local_addr().expect("addr"));
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {}\r\ncontent-type: {}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            canned.status,
            canned.content_type,
            canned.body.len(),
            canned.body
        );
        socket.write_all(response.as_bytes()).await.expect("write");
        socket.shutdown().await.ok();
        request
    });
    (base_url, handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0_u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.expect("read");
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn transport(base_url: &str) -> Arc<HttpTransport> {
    let config = ClientConfig::default()
        .base_url(base_url)
        .timeout(Duration::from_secs(5));
    Arc::new(HttpTransport::new(config).expect("transport"))
}

#[tokio::test]
async fn streams_translate_request_to_done() {
    let body = concat!(
        "event: chunk\r\ndata: {\"text\":\"Good \"}\r\n\r\n",
        "event: chunk\r\ndata: {\"text\":\"morning\"}\r\n\r\n",
        "event: end\r\ndata: {\"usage\":{\"prompt_tokens\":4,\"completion_tokens\":2,\"total_tokens\":6},",
        "\"model\":\"gpt-4o-mini\",\"task\":\"translate\",\"estimated_cost\":0.00001,\"id\":\"abc\"}\r\n\r\n",
    );
    let (base_url, server) = serve_once(Canned::event_stream(body)).await;

    let dispatcher = Dispatcher::new(transport(&base_url));
    let state = dispatcher
        .submit(Request::translate("Buenos días", "English"))
        .await;
    let raw_request = server.await.expect("server");

    assert_eq!(state.status, SessionStatus::Done);
    assert_eq!(state.output, "Good morning");
    let meta = state.meta.expect("meta");
    assert_eq!(meta.task, Task::Translate);
    assert_eq!(meta.usage.total_tokens, 6);

    assert!(raw_request.starts_with("POST /api/v1/ai/stream "));
    assert!(raw_request.to_ascii_lowercase().contains("accept: text/event-stream"));
    assert!(raw_request.contains("\"target_language\":\"English\""));
    assert!(raw_request.contains("\"task\":\"translate\""));
}

#[tokio::test]
async fn buffered_request_parses_response_body() {
    let (base_url, server) = serve_once(Canned::json(
        "200 OK",
        serde_json::json!({
            "id": "r-9",
            "task": "summarize",
            "model": "gpt-4.1-mini",
            "input_text": "long text",
            "output_text": "short",
            "usage": {
                "prompt_tokens": 12,
                "completion_tokens": 1,
                "total_tokens": 13,
                "estimated_cost": 0.00002
            },
            "created_at": "2026-01-01T00:00:00"
        }),
    ))
    .await;

    let dispatcher = Dispatcher::new(transport(&base_url)).with_streaming(false);
    let state = dispatcher.submit(Request::summarize("long text")).await;
    let raw_request = server.await.expect("server");

    assert_eq!(state.status, SessionStatus::Done);
    assert_eq!(state.output, "short");
    assert_eq!(state.meta.expect("meta").usage.total_tokens, 13);
    assert!(raw_request.starts_with("POST /api/v1/ai "));
    assert!(!raw_request.contains("target_language"));
    assert!(raw_request.contains("\"temperature\":0.6"));
    assert!(raw_request.contains("\"max_tokens\":600"));
}

#[tokio::test]
async fn nested_error_body_message_reaches_session() {
    let (base_url, server) = serve_once(Canned::json(
        "503 Service Unavailable",
        serde_json::json!({
            "detail": {
                "error": {
                    "type": "upstream_error",
                    "message": "Both primary and fallback models failed.",
                    "retryable": true
                }
            }
        }),
    ))
    .await;

    let dispatcher = Dispatcher::new(transport(&base_url)).with_streaming(false);
    let state = dispatcher.submit(Request::generate("a poem")).await;
    server.await.expect("server");

    assert_eq!(state.status, SessionStatus::Error);
    assert_eq!(
        state.error.as_deref(),
        Some("Both primary and fallback models failed.")
    );
}

#[tokio::test]
async fn unreadable_error_body_uses_fallback_message() {
    let (base_url, server) = serve_once(Canned {
        status: "502 Bad Gateway",
        content_type: "text/html",
        body: "<html>bad gateway</html>".into(),
    })
    .await;

    let err = transport(&base_url)
        .open_stream(&Request::generate("x"))
        .await
        .err()
        .expect("error");
    server.await.expect("server");

    assert_eq!(err, TransportError::http(502, "Request failed"));
}

#[tokio::test]
async fn recent_usage_returns_items() {
    let (base_url, server) = serve_once(Canned::json(
        "200 OK",
        serde_json::json!({
            "items": [
                {
                    "id": "u1",
                    "task": "generate",
                    "model": "gpt-4o-mini",
                    "prompt_tokens": 3,
                    "completion_tokens": 7,
                    "total_tokens": 10,
                    "estimated_cost": 0.0,
                    "created_at": "2026-01-02T03:04:05"
                }
            ]
        }),
    ))
    .await;

    let items = transport(&base_url).recent_usage().await.expect("items");
    let raw_request = server.await.expect("server");

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].task, Task::Generate);
    assert_eq!(items[0].total_tokens, 10);
    assert!(raw_request.starts_with("GET /api/v1/usage/recent "));
}

#[tokio::test]
async fn unreachable_service_is_a_session_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let base_url = format!("http://{}", listener.local_addr().expect("addr"));
    drop(listener);

    let dispatcher = Dispatcher::new(transport(&base_url));
    let state = dispatcher.submit(Request::generate("x")).await;

    assert_eq!(state.status, SessionStatus::Error);
    assert!(state.error.expect("message").starts_with("request failed"));
}
