//! Subscriber registry over the `user` set

use hcfd_core::{SetStore, StoreError, StoreResult};

/// Set holding every registered subscriber id
pub const SUBSCRIBER_SET: &str = "user";

pub struct SubscriberRegistry<'a> {
    store: &'a dyn SetStore,
}

impl<'a> SubscriberRegistry<'a> {
    pub fn new(store: &'a dyn SetStore) -> Self {
        Self { store }
    }

    /// Returns `true` when the subscriber was not registered before
    pub async fn add(&self, id: &str) -> StoreResult<bool> {
        if id.trim().is_empty() {
            return Err(StoreError::InvalidMember(id.to_string()));
        }
        self.store.add(SUBSCRIBER_SET, id).await
    }

    pub async fn remove(&self, id: &str) -> StoreResult<bool> {
        self.store.remove(SUBSCRIBER_SET, id).await
    }

    pub async fn is_member(&self, id: &str) -> StoreResult<bool> {
        self.store.is_member(SUBSCRIBER_SET, id).await
    }

    /// Every subscriber, sorted by id
    pub async fn all(&self) -> StoreResult<Vec<String>> {
        self.store.members(SUBSCRIBER_SET).await
    }

    pub async fn count(&self) -> StoreResult<u64> {
        self.store.count(SUBSCRIBER_SET).await
    }
}
