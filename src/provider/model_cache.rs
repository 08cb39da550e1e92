use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::types::Model;

/// How long a fetched catalog stays fresh.
pub const MODEL_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Default)]
struct CacheEntry {
    models: Vec<Model>,
    expires_at: Option<Instant>,
}

/// Last fetched model catalog of one adapter.
///
/// Readers share the lock; a refresh takes it exclusively only to swap the
/// list. The network fetch itself happens outside the lock, so two callers that
/// both observe an expired entry may both fetch, and the last write wins.
#[derive(Debug)]
pub struct ModelCache {
    entry: RwLock<CacheEntry>,
    ttl: Duration,
}

impl ModelCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entry: RwLock::new(CacheEntry::default()),
            ttl,
        }
    }

    /// Returns a copy of the cached list while it is fresh and non-empty.
    pub async fn get(&self) -> Option<Vec<Model>> {
        let entry = self.entry.read().await;
        match entry.expires_at {
            Some(expires_at) if Instant::now() < expires_at && !entry.models.is_empty() => {
                Some(entry.models.clone())
            }
            _ => None,
        }
    }

    /// Replaces the list and restarts the TTL.
    pub async fn store(&self, models: Vec<Model>) {
        let mut entry = self.entry.write().await;
        entry.models = models;
        entry.expires_at = Some(Instant::now() + self.ttl);
    }
}

impl Default for ModelCache {
    fn default() -> Self {
        Self::new(MODEL_CACHE_TTL)
    }
}
