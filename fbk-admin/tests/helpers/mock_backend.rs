//! In-process review backend for integration tests
//!
//! Serves `GET /reviews/` from a mutable list and `GET /reviews/events` as a
//! server-sent event stream fed by `push*` calls. The listing can be switched
//! to an error status or slowed down; the event stream can be closed from
//! the server side to force a client reconnect.

use std::convert::Infallible;
use std::sync::atomic::{AtomicU16, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    routing::get,
    Json, Router,
};
use futures::Stream;
use serde_json::Value;
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
enum Push {
    Data { id: Option<String>, data: String },
    Close,
}

struct MockState {
    reviews: Mutex<Vec<Value>>,
    listing_status: AtomicU16,
    listing_delay_ms: AtomicU64,
    listing_requests: AtomicUsize,
    pushes: broadcast::Sender<Push>,
    connections: AtomicUsize,
    last_event_ids: Mutex<Vec<Option<String>>>,
}

/// Running mock backend
pub struct MockBackend {
    pub base_url: String,
    state: Arc<MockState>,
}

impl MockBackend {
    /// Start serving `reviews` on an ephemeral loopback port
    pub async fn start(reviews: Vec<Value>) -> Self {
        let (pushes, _) = broadcast::channel(64);
        let state = Arc::new(MockState {
            reviews: Mutex::new(reviews),
            listing_status: AtomicU16::new(200),
            listing_delay_ms: AtomicU64::new(0),
            listing_requests: AtomicUsize::new(0),
            pushes,
            connections: AtomicUsize::new(0),
            last_event_ids: Mutex::new(Vec::new()),
        });

        let router = Router::new()
            .route("/reviews/", get(list_reviews))
            .route("/reviews/events", get(review_events))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    /// Make `GET /reviews/` answer with `status` (200 restores the listing)
    pub fn set_listing_status(&self, status: u16) {
        self.state.listing_status.store(status, Ordering::SeqCst);
    }

    pub fn set_listing_delay(&self, delay: Duration) {
        self.state
            .listing_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set_reviews(&self, reviews: Vec<Value>) {
        *self.state.reviews.lock().unwrap() = reviews;
    }

    pub fn listing_requests(&self) -> usize {
        self.state.listing_requests.load(Ordering::SeqCst)
    }

    /// Number of event stream connections accepted so far
    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    /// `Last-Event-ID` header of each event stream request, in order
    pub fn last_event_ids(&self) -> Vec<Option<String>> {
        self.state.last_event_ids.lock().unwrap().clone()
    }

    pub fn push(&self, review: &Value) {
        self.push_raw(&review.to_string());
    }

    pub fn push_with_id(&self, id: &str, review: &Value) {
        let _ = self.state.pushes.send(Push::Data {
            id: Some(id.to_string()),
            data: review.to_string(),
        });
    }

    /// Send an arbitrary `data:` payload
    pub fn push_raw(&self, data: &str) {
        let _ = self.state.pushes.send(Push::Data {
            id: None,
            data: data.to_string(),
        });
    }

    /// End the current event stream response
    pub fn close_stream(&self) {
        let _ = self.state.pushes.send(Push::Close);
    }

    /// Poll until `connections() >= count`
    pub async fn wait_for_connections(&self, count: usize, timeout: Duration) -> bool {
        eventually(timeout, || self.connections() >= count).await
    }
}

async fn list_reviews(State(state): State<Arc<MockState>>) -> Response {
    state.listing_requests.fetch_add(1, Ordering::SeqCst);

    let delay = state.listing_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let status = state.listing_status.load(Ordering::SeqCst);
    if status != 200 {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, "database down").into_response();
    }

    let reviews = state.reviews.lock().unwrap().clone();
    Json(reviews).into_response()
}

async fn review_events(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let last_event_id = headers
        .get("last-event-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.last_event_ids.lock().unwrap().push(last_event_id);

    // Subscribe before counting so a visible connection never misses a push
    let mut rx = state.pushes.subscribe();
    state.connections.fetch_add(1, Ordering::SeqCst);

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(Push::Data { id, data }) => {
                    let mut event = Event::default().data(data);
                    if let Some(id) = id {
                        event = event.id(id);
                    }
                    yield Ok(event);
                }
                Ok(Push::Close) | Err(_) => break,
            }
        }
    };

    Sse::new(stream)
}

/// Poll `condition` every 10 ms until it holds or `timeout` passes
pub async fn eventually<F>(timeout: Duration, condition: F) -> bool
where
    F: Fn() -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() > deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
