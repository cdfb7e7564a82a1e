//! Seen-token bookkeeping per feed source

use hcfd_core::{ChangeToken, FeedSource, SetStore, StoreResult};
use tracing::{debug, info};

/// Persisted set of already-processed change tokens, one set per source
pub struct DedupStore<'a> {
    store: &'a dyn SetStore,
}

impl<'a> DedupStore<'a> {
    pub fn new(store: &'a dyn SetStore) -> Self {
        Self { store }
    }

    pub async fn seen(&self, source: FeedSource, token: &ChangeToken) -> StoreResult<bool> {
        let seen = self
            .store
            .is_member(source.dedup_set(), token.as_str())
            .await?;
        debug!(%source, %token, seen, "Checked change token");
        Ok(seen)
    }

    pub async fn mark_seen(&self, source: FeedSource, token: &ChangeToken) -> StoreResult<()> {
        let inserted = self.store.add(source.dedup_set(), token.as_str()).await?;
        debug!(%source, %token, inserted, "Recorded change token");
        Ok(())
    }

    /// Forget every token recorded for `source`
    pub async fn reset(&self, source: FeedSource) -> StoreResult<()> {
        self.store.clear(source.dedup_set()).await?;
        info!(%source, "Change tokens reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    #[tokio::test]
    async fn test_seen_after_mark() {
        let store = MemoryStore::new();
        let dedup = DedupStore::new(&store);
        let token = ChangeToken::from("20160607185000".to_string());

        assert!(!dedup.seen(FeedSource::Rainfall, &token).await.unwrap());
        dedup.mark_seen(FeedSource::Rainfall, &token).await.unwrap();
        assert!(dedup.seen(FeedSource::Rainfall, &token).await.unwrap());

        // Sources are independent
        assert!(!dedup.seen(FeedSource::Hazard, &token).await.unwrap());
        assert!(store.is_member("token0", "20160607185000").await.unwrap());
    }

    #[tokio::test]
    async fn test_reset_only_touches_one_source() {
        let store = MemoryStore::new();
        let dedup = DedupStore::new(&store);
        let rain = ChangeToken::from("20160607185000".to_string());
        let hazard = ChangeToken::from("20160601100000 20160602083000".to_string());

        dedup.mark_seen(FeedSource::Rainfall, &rain).await.unwrap();
        dedup.mark_seen(FeedSource::Hazard, &hazard).await.unwrap();
        dedup.reset(FeedSource::Rainfall).await.unwrap();

        assert!(!dedup.seen(FeedSource::Rainfall, &rain).await.unwrap());
        assert!(dedup.seen(FeedSource::Hazard, &hazard).await.unwrap());
    }
}
