//! Local mirror of the remote memo collection.
//!
//! Mutations never touch the cached collection directly: a successful create,
//! relocation or delete invalidates the cache and reloads it wholesale. A failed
//! mutation leaves the cache exactly as it was.

use std::{sync::Arc, time::Duration};

use shared::{
    domain::{Coordinates, Memo, MemoId},
    protocol::{CreateMemoDraft, ListMemosQuery},
};
use tokio::{sync::Mutex, time::Instant};
use tracing::{debug, info, warn};

use crate::{error::SyncError, MemoStore};

pub const DEFAULT_LOAD_LIMIT: u32 = 500;
pub const FRESHNESS_WINDOW: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
pub struct MemoSnapshot {
    pub memos: Arc<[Memo]>,
    pub total_items: usize,
    pub fetched_at: Instant,
}

impl MemoSnapshot {
    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.fetched_at)
    }
}

/// Outcome of a mutation that the store accepted. The follow-up reload can still fail
/// independently.
#[derive(Debug)]
pub struct Mutation<T> {
    pub value: T,
    pub reload: Result<MemoSnapshot, SyncError>,
}

struct CacheState {
    snapshot: Option<MemoSnapshot>,
    invalidated: bool,
    limit: u32,
    issued_loads: u64,
    applied_load: u64,
}

pub struct SyncCoordinator {
    store: Arc<dyn MemoStore>,
    freshness: Duration,
    cache: Mutex<CacheState>,
}

impl SyncCoordinator {
    pub fn new(store: Arc<dyn MemoStore>) -> Self {
        Self::with_freshness(store, FRESHNESS_WINDOW)
    }

    pub fn with_freshness(store: Arc<dyn MemoStore>, freshness: Duration) -> Self {
        Self {
            store,
            freshness,
            cache: Mutex::new(CacheState {
                snapshot: None,
                invalidated: false,
                limit: DEFAULT_LOAD_LIMIT,
                issued_loads: 0,
                applied_load: 0,
            }),
        }
    }

    /// Fetches up to `limit` memos and replaces the cached collection.
    ///
    /// Fails with [`SyncError::Superseded`] when a load issued later has already
    /// landed; the returned data would be older than what the cache holds.
    pub async fn load(&self, limit: u32) -> Result<MemoSnapshot, SyncError> {
        let ticket = {
            let mut cache = self.cache.lock().await;
            cache.limit = limit;
            cache.issued_loads += 1;
            cache.issued_loads
        };

        let response = match self
            .store
            .list_memos(&ListMemosQuery::with_limit(limit))
            .await
        {
            Ok(response) => response,
            Err(err) => {
                let cache = self.cache.lock().await;
                if ticket < cache.applied_load {
                    debug!(ticket, applied = cache.applied_load, "ignoring failure of superseded load");
                    return Err(SyncError::Superseded {
                        ticket,
                        applied: cache.applied_load,
                    });
                }
                warn!(limit, "memo load failed: {err}");
                return Err(err);
            }
        };

        let snapshot = MemoSnapshot {
            total_items: response.total_items(),
            memos: response.memos.into(),
            fetched_at: Instant::now(),
        };

        let mut cache = self.cache.lock().await;
        // An older load finishing late must not overwrite a newer collection,
        // neither here nor in the caller's view.
        if ticket <= cache.applied_load {
            debug!(ticket, applied = cache.applied_load, "dropping superseded load");
            return Err(SyncError::Superseded {
                ticket,
                applied: cache.applied_load,
            });
        }
        cache.applied_load = ticket;
        cache.snapshot = Some(snapshot.clone());
        cache.invalidated = false;
        info!(count = snapshot.memos.len(), limit, "memo collection loaded");
        Ok(snapshot)
    }

    /// Returns the cached collection while it is fresh, otherwise loads it.
    pub async fn read(&self, limit: u32) -> Result<MemoSnapshot, SyncError> {
        if let Some(snapshot) = self.fresh_snapshot(limit).await {
            return Ok(snapshot);
        }
        self.load(limit).await
    }

    pub async fn cached(&self) -> Option<MemoSnapshot> {
        self.cache.lock().await.snapshot.clone()
    }

    /// True when the next `read(limit)` would go to the store.
    pub async fn is_stale(&self, limit: u32) -> bool {
        self.fresh_snapshot(limit).await.is_none()
    }

    pub async fn invalidate(&self) {
        self.cache.lock().await.invalidated = true;
    }

    pub async fn memo(&self, memo_id: &MemoId) -> Result<Memo, SyncError> {
        self.store.get_memo(memo_id).await
    }

    pub async fn create(&self, draft: &CreateMemoDraft) -> Result<Mutation<Memo>, SyncError> {
        let created = self.store.create_memo(draft).await?;
        info!(memo_id = %created.memo_id, "memo created");
        let reload = self.invalidate_and_reload().await;
        Ok(Mutation {
            value: created,
            reload,
        })
    }

    pub async fn update_location(
        &self,
        memo_id: &MemoId,
        position: Coordinates,
    ) -> Result<Mutation<Memo>, SyncError> {
        let updated = self.store.update_location(memo_id, position).await?;
        info!(memo_id = %memo_id, "memo location updated");
        let reload = self.invalidate_and_reload().await;
        Ok(Mutation {
            value: updated,
            reload,
        })
    }

    pub async fn delete(&self, memo_id: &MemoId) -> Result<Mutation<()>, SyncError> {
        self.store.delete_memo(memo_id).await?;
        info!(memo_id = %memo_id, "memo deleted");
        let reload = self.invalidate_and_reload().await;
        Ok(Mutation { value: (), reload })
    }

    async fn fresh_snapshot(&self, limit: u32) -> Option<MemoSnapshot> {
        let cache = self.cache.lock().await;
        let snapshot = cache.snapshot.as_ref()?;
        if cache.invalidated || cache.limit != limit || snapshot.age() >= self.freshness {
            return None;
        }
        Some(snapshot.clone())
    }

    async fn invalidate_and_reload(&self) -> Result<MemoSnapshot, SyncError> {
        let limit = {
            let mut cache = self.cache.lock().await;
            cache.invalidated = true;
            cache.limit
        };
        self.load(limit).await
    }
}

#[cfg(test)]
#[path = "tests/sync_tests.rs"]
mod tests;
