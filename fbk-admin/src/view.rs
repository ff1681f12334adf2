//! Admin view activation
//!
//! `AdminView` owns one store, one loader and one live subscription. The
//! subscription and the initial load start together on `activate`; their
//! results interleave freely and meet only in the store.

use fbk_common::{ApiClient, ClientConfig, ReviewRecord};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::analytics::Analytics;
use crate::error::FetchError;
use crate::filter::ReviewQuery;
use crate::loader::{BulkLoader, LoadState};
use crate::store::{ReviewStore, StoreSnapshot};
use crate::subscriber::{ConnectionState, LiveSubscriber, StoreFeedHandler};

pub const LOADING_MESSAGE: &str = "Loading Dashboard...";
pub const EMPTY_RESULTS_MESSAGE: &str = "No reviews found";
pub const EMPTY_RESULTS_HINT: &str = "Try adjusting your search or filters";

/// What the dashboard should show in place of (or alongside) the list
///
/// Loading and error states only block the view while the store is empty;
/// once anything is stored, stale content wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewStatus {
    Loading,
    Failed(String),
    Ready,
}

impl ViewStatus {
    fn resolve(store_empty: bool, load: &LoadState) -> Self {
        if !store_empty {
            return ViewStatus::Ready;
        }
        match load {
            LoadState::Idle | LoadState::Loading => ViewStatus::Loading,
            LoadState::Failed(reason) => ViewStatus::Failed(reason.clone()),
            LoadState::Ready => ViewStatus::Ready,
        }
    }
}

/// Everything needed to draw one frame
#[derive(Debug, Clone)]
pub struct RenderModel {
    pub snapshot: StoreSnapshot,
    /// Indices into `snapshot.records()` matching the query, in store order
    pub visible: Vec<usize>,
    /// Computed over the unfiltered store
    pub analytics: Analytics,
    pub connection: ConnectionState,
    pub status: ViewStatus,
}

impl RenderModel {
    pub fn rows(&self) -> impl Iterator<Item = &ReviewRecord> + '_ {
        let records = self.snapshot.records();
        self.visible.iter().filter_map(move |&i| records.get(i))
    }

    pub fn result_count(&self) -> usize {
        self.visible.len()
    }

    pub fn results_header(&self) -> String {
        format!("Results ({})", self.result_count())
    }
}

pub struct AdminView {
    store: Arc<ReviewStore>,
    loader: Arc<BulkLoader>,
    subscriber: LiveSubscriber,
    initial_load: Option<JoinHandle<Result<Vec<ReviewRecord>, FetchError>>>,
    retry_load: Option<JoinHandle<Result<Vec<ReviewRecord>, FetchError>>>,
}

impl AdminView {
    /// Build the backend client from `config` and activate
    pub fn activate(config: ClientConfig) -> fbk_common::Result<Self> {
        Ok(Self::activate_with(ApiClient::new(config)?))
    }

    /// Start the live subscription and the initial load concurrently
    pub fn activate_with(api: ApiClient) -> Self {
        info!(base_url = %api.config().base_url, "Activating admin view");

        let store = Arc::new(ReviewStore::new());
        let loader = Arc::new(BulkLoader::new(api.clone(), Arc::clone(&store)));

        let handler = Arc::new(StoreFeedHandler::new(Arc::clone(&store)));
        let subscriber = LiveSubscriber::spawn(api, handler);

        let initial_load = {
            let loader = Arc::clone(&loader);
            tokio::spawn(async move { loader.load().await })
        };

        Self {
            store,
            loader,
            subscriber,
            initial_load: Some(initial_load),
            retry_load: None,
        }
    }

    pub fn store(&self) -> &Arc<ReviewStore> {
        &self.store
    }

    /// Store revision; changes after every merge
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.store.subscribe()
    }

    pub fn load_changes(&self) -> watch::Receiver<LoadState> {
        self.loader.subscribe_state()
    }

    pub fn connection_changes(&self) -> watch::Receiver<ConnectionState> {
        self.subscriber.watch_state()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.subscriber.connection_state()
    }

    /// Wait for the load started by `activate`
    ///
    /// Returns `Ok` immediately if it was already awaited.
    pub async fn initial_load(&mut self) -> Result<(), FetchError> {
        match self.initial_load.take() {
            Some(task) => match task.await {
                Ok(result) => result.map(|_| ()),
                Err(e) => {
                    debug!("Initial load task did not complete: {}", e);
                    Err(FetchError::TornDown)
                }
            },
            None => Ok(()),
        }
    }

    /// Retry the bulk load (the "Retry" action)
    pub async fn reload(&self) -> Result<Vec<ReviewRecord>, FetchError> {
        self.loader.load().await
    }

    /// Start a retry without waiting for it; progress shows on `load_changes`
    ///
    /// Returns false if the previous background retry is still running.
    pub fn reload_in_background(&mut self) -> bool {
        if self.retry_load.as_ref().is_some_and(|task| !task.is_finished()) {
            debug!("Background reload already running");
            return false;
        }

        let loader = Arc::clone(&self.loader);
        self.retry_load = Some(tokio::spawn(async move { loader.load().await }));
        true
    }

    pub fn status(&self) -> ViewStatus {
        let empty = self.store.is_empty().unwrap_or(true);
        ViewStatus::resolve(empty, &self.loader.state())
    }

    /// Snapshot, filtered rows and analytics for one frame
    pub fn render_model(&self, query: &ReviewQuery) -> fbk_common::Result<RenderModel> {
        let snapshot = self.store.snapshot()?;
        let visible = query.matching_indices(snapshot.records());
        let analytics = snapshot.analytics();
        let status = ViewStatus::resolve(snapshot.is_empty(), &self.loader.state());

        Ok(RenderModel {
            snapshot,
            visible,
            analytics,
            connection: self.subscriber.connection_state(),
            status,
        })
    }

    /// Tear down: store first so nothing in flight can still merge
    pub async fn shutdown(&mut self) {
        self.store.close();
        self.subscriber.close().await;
        self.abort_loads();
        info!("Admin view shut down");
    }

    fn abort_loads(&mut self) {
        for task in [self.initial_load.take(), self.retry_load.take()]
            .into_iter()
            .flatten()
        {
            task.abort();
        }
    }
}

impl Drop for AdminView {
    fn drop(&mut self) {
        self.store.close();
        self.abort_loads();
    }
}
