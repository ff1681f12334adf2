//! fbk-admin library - live review dashboard
//!
//! Combines a one-shot bulk listing with a server-sent event feed of new
//! reviews into one observable store, and derives the filtered list and
//! analytics the dashboard draws.
//!
//! Data flow:
//! - `BulkLoader` -> `ReviewStore::replace_all`
//! - `LiveSubscriber` -> `StoreFeedHandler` -> `ReviewStore::upsert_front`
//! - `AdminView::render_model` -> `filter` + `analytics` -> `dashboard`

pub mod analytics;
pub mod dashboard;
pub mod error;
pub mod filter;
pub mod loader;
pub mod store;
pub mod subscriber;
pub mod view;

pub use analytics::Analytics;
pub use error::{FetchError, StreamParseError, StreamTransportError};
pub use filter::{ReviewQuery, StarFilter};
pub use loader::{BulkLoader, LoadState};
pub use store::{ReviewStore, StoreSnapshot, UpsertOutcome};
pub use subscriber::{ConnectionState, FeedEvent, FeedHandler, LiveSubscriber, StoreFeedHandler};
pub use view::{AdminView, RenderModel, ViewStatus};
