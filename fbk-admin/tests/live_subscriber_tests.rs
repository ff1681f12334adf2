//! Live subscriber event sequence against a mock event stream

mod helpers;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use fbk_admin::{ConnectionState, FeedEvent, FeedHandler, LiveSubscriber, StreamTransportError};
use fbk_common::{ApiClient, ClientConfig};
use helpers::{eventually, review_json, MockBackend};

const WAIT: Duration = Duration::from_secs(5);

/// Records every event it is handed
#[derive(Default)]
struct RecordingHandler {
    events: Mutex<Vec<FeedEvent>>,
}

impl RecordingHandler {
    fn events(&self) -> Vec<FeedEvent> {
        self.events.lock().unwrap().clone()
    }

    fn count(&self, pred: impl Fn(&FeedEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }
}

impl FeedHandler for RecordingHandler {
    fn handle(&self, event: FeedEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn api_for(backend: &MockBackend) -> ApiClient {
    let config = ClientConfig::new(&backend.base_url)
        .unwrap()
        .with_reconnect_delay(Duration::from_millis(50));
    ApiClient::new(config).unwrap()
}

#[tokio::test]
async fn test_event_sequence_across_reconnect_and_close() {
    let backend = MockBackend::start(vec![]).await;
    let handler = Arc::new(RecordingHandler::default());
    let mut subscriber = LiveSubscriber::spawn(api_for(&backend), handler.clone());

    assert!(backend.wait_for_connections(1, WAIT).await);
    assert!(eventually(WAIT, || handler.count(|e| *e == FeedEvent::Open) == 1).await);

    backend.push(&review_json(1, "Joe's Pizza", 5, 0));
    assert!(eventually(WAIT, || handler.count(|e| matches!(e, FeedEvent::Message(_))) == 1).await);

    backend.close_stream();
    assert!(eventually(WAIT, || handler.count(|e| *e == FeedEvent::Open) == 2).await);

    subscriber.close().await;
    assert_eq!(subscriber.connection_state(), ConnectionState::Closed);
    assert!(subscriber.is_closed());

    let events = handler.events();
    assert_eq!(events.first(), Some(&FeedEvent::Open));
    assert_eq!(events.last(), Some(&FeedEvent::Closed));
    assert!(events.contains(&FeedEvent::Error(StreamTransportError::Ended)));
    assert_eq!(events.iter().filter(|e| **e == FeedEvent::Closed).count(), 1);

    match &events[1] {
        FeedEvent::Message(message) => {
            assert!(message.is_default_event());
            assert!(message.data.contains("Joe's Pizza"));
        }
        other => panic!("expected message, got {:?}", other),
    }

    // second close is a no-op and emits nothing
    subscriber.close().await;
    assert_eq!(handler.events().len(), events.len());
}

#[tokio::test]
async fn test_unreachable_backend_reports_connect_errors() {
    let config = ClientConfig::new("http://127.0.0.1:9")
        .unwrap()
        .with_reconnect_delay(Duration::from_millis(20));
    let handler = Arc::new(RecordingHandler::default());
    let mut subscriber = LiveSubscriber::spawn(ApiClient::new(config).unwrap(), handler.clone());

    assert!(
        eventually(WAIT, || {
            handler.count(|e| matches!(e, FeedEvent::Error(StreamTransportError::Connect(_)))) >= 2
        })
        .await
    );
    assert_eq!(handler.count(|e| *e == FeedEvent::Open), 0);

    subscriber.close().await;
    assert_eq!(handler.events().last(), Some(&FeedEvent::Closed));
}

#[tokio::test]
async fn test_endless_line_ends_connection() {
    use axum::{http::header, routing::get, Router};

    let router = Router::new().route(
        "/reviews/events",
        get(|| async {
            (
                [(header::CONTENT_TYPE, "text/event-stream")],
                format!("data: {}", "x".repeat(2 * fbk_admin::subscriber::sse::MAX_BUFFER_BYTES)),
            )
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let config = ClientConfig::new(&format!("http://{}", addr))
        .unwrap()
        .with_reconnect_delay(Duration::from_millis(50));
    let handler = Arc::new(RecordingHandler::default());
    let mut subscriber = LiveSubscriber::spawn(ApiClient::new(config).unwrap(), handler.clone());

    assert!(
        eventually(WAIT, || {
            handler.count(|e| {
                matches!(e, FeedEvent::Error(StreamTransportError::Body(reason)) if reason.contains("exceeded"))
            }) >= 1
        })
        .await
    );
    assert_eq!(handler.count(|e| matches!(e, FeedEvent::Message(_))), 0);

    subscriber.close().await;
}
