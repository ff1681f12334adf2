//! Bulk loader
//!
//! One `GET /reviews/` per `load()`. Success replaces the store contents;
//! failure leaves them untouched so the dashboard keeps showing stale data.

use fbk_common::{ApiClient, ReviewRecord};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

use crate::error::FetchError;
use crate::store::{sort_newest_first, ReviewStore};

/// Progress of the most recent load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

pub struct BulkLoader {
    api: ApiClient,
    store: Arc<ReviewStore>,
    in_flight: AtomicBool,
    state: watch::Sender<LoadState>,
}

impl BulkLoader {
    pub fn new(api: ApiClient, store: Arc<ReviewStore>) -> Self {
        let (state, _) = watch::channel(LoadState::Idle);
        Self {
            api,
            store,
            in_flight: AtomicBool::new(false),
            state,
        }
    }

    /// Fetch the full listing and install it in the store
    ///
    /// Returns the fetched records newest-first. A second call while one is
    /// running fails with `FetchError::InProgress` and does not touch state.
    pub async fn load(&self) -> Result<Vec<ReviewRecord>, FetchError> {
        if self.store.is_closed() {
            return Err(FetchError::TornDown);
        }

        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(FetchError::InProgress)?;
        self.state.send_replace(LoadState::Loading);

        match self.fetch_and_install().await {
            Ok(records) => {
                info!(count = records.len(), "Reviews loaded");
                self.state.send_replace(LoadState::Ready);
                Ok(records)
            }
            Err(e) => {
                error!("Failed to load reviews: {}", e);
                self.state.send_replace(LoadState::Failed(e.reason()));
                Err(e)
            }
        }
    }

    async fn fetch_and_install(&self) -> Result<Vec<ReviewRecord>, FetchError> {
        let mut records = self.api.list_reviews().await?;
        sort_newest_first(&mut records);

        self.store.replace_all(records.clone())?;

        Ok(records)
    }

    pub fn state(&self) -> LoadState {
        self.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<LoadState> {
        self.state.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Clears the in-flight flag on every exit path, including cancellation
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fbk_common::ClientConfig;

    fn unreachable_loader() -> BulkLoader {
        // Port 9 (discard) on loopback; nothing listens there in test environments
        let api = ApiClient::new(ClientConfig::new("http://127.0.0.1:9").unwrap()).unwrap();
        BulkLoader::new(api, Arc::new(ReviewStore::new()))
    }

    #[test]
    fn test_guard_rejects_second_acquire() {
        let flag = AtomicBool::new(false);
        let first = InFlightGuard::acquire(&flag);
        assert!(first.is_some());
        assert!(InFlightGuard::acquire(&flag).is_none());

        drop(first);
        assert!(InFlightGuard::acquire(&flag).is_some());
    }

    #[tokio::test]
    async fn test_load_on_closed_store_is_torn_down() {
        let loader = unreachable_loader();
        loader.store.close();

        assert_eq!(loader.load().await.unwrap_err(), FetchError::TornDown);
        assert_eq!(loader.state(), LoadState::Idle);
    }

    #[tokio::test]
    async fn test_network_failure_sets_failed_state() {
        let loader = unreachable_loader();
        let err = loader.load().await.unwrap_err();

        assert!(matches!(err, FetchError::Network(_)));
        assert!(matches!(loader.state(), LoadState::Failed(_)));
        assert!(!loader.is_loading());
        assert!(loader.store.is_empty().unwrap());
    }
}
