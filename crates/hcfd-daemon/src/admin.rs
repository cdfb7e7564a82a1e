//! Operator commands against the shared store

use hcfd_core::{FeedSource, StoreConnector, StoreResult};
use hcfd_store::{DedupStore, SubscriberRegistry};

/// Forget recorded tokens so the current feed content is sent again
pub async fn reset_tokens(store: &dyn StoreConnector, sources: &[FeedSource]) -> StoreResult<()> {
    let session = store.open().await?;
    let dedup = DedupStore::new(session.as_ref());
    for source in sources {
        dedup.reset(*source).await?;
    }
    Ok(())
}

pub async fn subscriber_count(store: &dyn StoreConnector) -> StoreResult<u64> {
    let session = store.open().await?;
    SubscriberRegistry::new(session.as_ref()).count().await
}
