//! Live update subscriber
//!
//! Holds one long-lived `GET /reviews/events` subscription and turns its
//! traffic into `FeedEvent`s for a `FeedHandler`:
//! - `Open` once per successful (re)connection
//! - `Message` per unnamed server-sent event
//! - `Error` when the connection drops; a reconnect follows after the delay
//! - `Closed` exactly once, after `close()` or drop
//!
//! Reconnects are unbounded. The delay starts at the configured value and
//! follows any `retry:` hint from the server. `Last-Event-ID` is replayed
//! when the server has sent ids. Duplicate deliveries after a reconnect are
//! absorbed by the store's id-based merge.

pub mod sse;

use fbk_common::{ApiClient, ReviewRecord};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{StreamParseError, StreamTransportError};
use crate::store::{ReviewStore, UpsertOutcome};
use sse::{SseDecoder, SseMessage};

/// Subscription lifecycle as seen by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Live,
    Reconnecting,
    Closed,
}

/// Events delivered to a `FeedHandler`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    Open,
    Message(SseMessage),
    Error(StreamTransportError),
    Closed,
}

/// Receiver of subscription events
///
/// Called from the subscriber task; implementations must not block.
pub trait FeedHandler: Send + Sync + 'static {
    fn handle(&self, event: FeedEvent);
}

/// Decode one message payload as a review
pub fn parse_record(data: &str) -> Result<ReviewRecord, StreamParseError> {
    serde_json::from_str(data).map_err(|e| StreamParseError {
        reason: e.to_string(),
        payload: data.to_string(),
    })
}

/// Merges pushed reviews into a `ReviewStore`
pub struct StoreFeedHandler {
    store: Arc<ReviewStore>,
}

impl StoreFeedHandler {
    pub fn new(store: Arc<ReviewStore>) -> Self {
        Self { store }
    }
}

impl FeedHandler for StoreFeedHandler {
    fn handle(&self, event: FeedEvent) {
        match event {
            FeedEvent::Open => info!("Live review feed connected"),
            FeedEvent::Message(message) => {
                if !message.is_default_event() {
                    debug!(event = %message.event, "Ignoring named feed event");
                    return;
                }

                let record = match parse_record(&message.data) {
                    Ok(record) => record,
                    Err(e) => {
                        warn!(payload = %e.payload, "{}", e);
                        return;
                    }
                };

                let review_id = record.id;
                match self.store.upsert_front(record) {
                    Ok(UpsertOutcome::Inserted) => info!(review_id = %review_id, "New review received"),
                    Ok(UpsertOutcome::Annotated) => {
                        info!(review_id = %review_id, "Review annotation received")
                    }
                    Ok(UpsertOutcome::Duplicate) => {}
                    Err(e) => debug!(review_id = %review_id, "Feed message dropped: {}", e),
                }
            }
            FeedEvent::Error(e) => warn!("{} (reconnecting)", e),
            FeedEvent::Closed => info!("Live review feed closed"),
        }
    }
}

/// Handle to the background subscription task
pub struct LiveSubscriber {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl LiveSubscriber {
    /// Start the subscription on the current tokio runtime
    pub fn spawn(api: ApiClient, handler: Arc<dyn FeedHandler>) -> Self {
        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);

        let task = tokio::spawn(run_feed(api, handler, cancel.clone(), state_tx));

        Self {
            cancel,
            task: Some(task),
            state_rx,
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.task.is_none()
    }

    /// Cancel the subscription and wait for the task to finish
    ///
    /// Idempotent. No handler call happens after this returns.
    pub async fn close(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Live feed task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for LiveSubscriber {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_feed(
    api: ApiClient,
    handler: Arc<dyn FeedHandler>,
    cancel: CancellationToken,
    state_tx: watch::Sender<ConnectionState>,
) {
    let mut cursor = FeedCursor {
        last_event_id: None,
        retry_delay: api.config().reconnect_delay,
    };

    loop {
        state_tx.send_replace(ConnectionState::Connecting);

        let error = tokio::select! {
            _ = cancel.cancelled() => break,
            error = stream_once(&api, handler.as_ref(), &state_tx, &mut cursor) => error,
        };

        handler.handle(FeedEvent::Error(error));
        state_tx.send_replace(ConnectionState::Reconnecting);

        debug!("Reconnecting live feed in {:?}", cursor.retry_delay);
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(cursor.retry_delay) => {}
        }
    }

    state_tx.send_replace(ConnectionState::Closed);
    handler.handle(FeedEvent::Closed);
}

/// State carried across reconnects
struct FeedCursor {
    last_event_id: Option<String>,
    retry_delay: Duration,
}

/// Run one connection until it fails; always returns the reason it ended
async fn stream_once(
    api: &ApiClient,
    handler: &dyn FeedHandler,
    state_tx: &watch::Sender<ConnectionState>,
    cursor: &mut FeedCursor,
) -> StreamTransportError {
    let response = match api.open_event_stream(cursor.last_event_id.as_deref()).await {
        Ok(response) => response,
        Err(e) => return e.into(),
    };

    state_tx.send_replace(ConnectionState::Live);
    handler.handle(FeedEvent::Open);

    let mut decoder = SseDecoder::new();
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => return StreamTransportError::Body(e.to_string()),
        };

        let messages = match decoder.feed(&chunk) {
            Ok(messages) => messages,
            Err(e) => return StreamTransportError::Body(e.to_string()),
        };

        if let Some(ms) = decoder.retry_ms() {
            cursor.retry_delay = Duration::from_millis(ms);
        }
        if let Some(id) = decoder.last_event_id() {
            cursor.last_event_id = Some(id.to_string());
        }

        for message in messages {
            handler.handle(FeedEvent::Message(message));
        }
    }

    StreamTransportError::Ended
}
