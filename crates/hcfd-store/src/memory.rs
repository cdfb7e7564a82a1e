//! In-memory set store for tests and dry runs

use hcfd_core::{SetStore, StoreConnector, StoreError, StoreResult};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Store operations that can be made to fail on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Open,
    IsMember,
    Add,
    Remove,
    Members,
    Count,
    Clear,
}

#[derive(Default)]
struct Shared {
    sets: RwLock<HashMap<String, BTreeSet<String>>>,
    failing: std::sync::RwLock<HashSet<StoreOp>>,
    open_sessions: AtomicUsize,
    total_sessions: AtomicUsize,
}

/// Cloneable handle to a shared in-memory set store
#[derive(Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call of `op` fail with `StoreError::Unavailable`
    pub fn fail_on(&self, op: StoreOp) {
        self.shared
            .failing
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(op);
    }

    pub fn recover(&self, op: StoreOp) {
        self.shared
            .failing
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&op);
    }

    /// Sessions opened and not yet dropped
    pub fn open_sessions(&self) -> usize {
        self.shared.open_sessions.load(Ordering::SeqCst)
    }

    /// Sessions opened over the store's lifetime
    pub fn total_sessions(&self) -> usize {
        self.shared.total_sessions.load(Ordering::SeqCst)
    }

    fn check(&self, op: StoreOp) -> StoreResult<()> {
        let failing = self
            .shared
            .failing
            .read()
            .unwrap_or_else(|e| e.into_inner());
        if failing.contains(&op) {
            return Err(StoreError::Unavailable(format!("{:?} disabled", op)));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SetStore for MemoryStore {
    async fn is_member(&self, set: &str, member: &str) -> StoreResult<bool> {
        self.check(StoreOp::IsMember)?;
        let sets = self.shared.sets.read().await;
        Ok(sets.get(set).map_or(false, |s| s.contains(member)))
    }

    async fn add(&self, set: &str, member: &str) -> StoreResult<bool> {
        self.check(StoreOp::Add)?;
        let mut sets = self.shared.sets.write().await;
        Ok(sets
            .entry(set.to_string())
            .or_default()
            .insert(member.to_string()))
    }

    async fn remove(&self, set: &str, member: &str) -> StoreResult<bool> {
        self.check(StoreOp::Remove)?;
        let mut sets = self.shared.sets.write().await;
        Ok(sets.get_mut(set).map_or(false, |s| s.remove(member)))
    }

    async fn members(&self, set: &str) -> StoreResult<Vec<String>> {
        self.check(StoreOp::Members)?;
        let sets = self.shared.sets.read().await;
        Ok(sets
            .get(set)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn count(&self, set: &str) -> StoreResult<u64> {
        self.check(StoreOp::Count)?;
        let sets = self.shared.sets.read().await;
        Ok(sets.get(set).map_or(0, |s| s.len() as u64))
    }

    async fn clear(&self, set: &str) -> StoreResult<()> {
        self.check(StoreOp::Clear)?;
        self.shared.sets.write().await.remove(set);
        Ok(())
    }
}

/// Session handle counting itself in and out of the store
pub struct MemorySession {
    store: MemoryStore,
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.store
            .shared
            .open_sessions
            .fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl SetStore for MemorySession {
    async fn is_member(&self, set: &str, member: &str) -> StoreResult<bool> {
        self.store.is_member(set, member).await
    }

    async fn add(&self, set: &str, member: &str) -> StoreResult<bool> {
        self.store.add(set, member).await
    }

    async fn remove(&self, set: &str, member: &str) -> StoreResult<bool> {
        self.store.remove(set, member).await
    }

    async fn members(&self, set: &str) -> StoreResult<Vec<String>> {
        self.store.members(set).await
    }

    async fn count(&self, set: &str) -> StoreResult<u64> {
        self.store.count(set).await
    }

    async fn clear(&self, set: &str) -> StoreResult<()> {
        self.store.clear(set).await
    }
}

#[async_trait::async_trait]
impl StoreConnector for MemoryStore {
    async fn open(&self) -> StoreResult<Box<dyn SetStore>> {
        self.check(StoreOp::Open)?;
        self.shared.open_sessions.fetch_add(1, Ordering::SeqCst);
        self.shared.total_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            store: self.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_operations() {
        let store = MemoryStore::new();

        assert!(store.add("user", "U1").await.unwrap());
        assert!(!store.add("user", "U1").await.unwrap());
        assert!(store.add("user", "U2").await.unwrap());

        assert!(store.is_member("user", "U1").await.unwrap());
        assert!(!store.is_member("token0", "U1").await.unwrap());
        assert_eq!(store.count("user").await.unwrap(), 2);
        assert_eq!(store.members("user").await.unwrap(), vec!["U1", "U2"]);

        assert!(store.remove("user", "U1").await.unwrap());
        assert!(!store.remove("user", "U1").await.unwrap());

        store.clear("user").await.unwrap();
        assert_eq!(store.count("user").await.unwrap(), 0);
        assert!(store.members("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sessions_are_released_on_drop() {
        let store = MemoryStore::new();

        let session = store.open().await.unwrap();
        session.add("token0", "20160607185000").await.unwrap();
        assert_eq!(store.open_sessions(), 1);

        drop(session);
        assert_eq!(store.open_sessions(), 0);
        assert_eq!(store.total_sessions(), 1);
        assert!(store.is_member("token0", "20160607185000").await.unwrap());
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = MemoryStore::new();
        store.fail_on(StoreOp::IsMember);

        let result = store.is_member("token0", "x").await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert!(store.add("token0", "x").await.is_ok());

        store.recover(StoreOp::IsMember);
        assert!(store.is_member("token0", "x").await.unwrap());

        store.fail_on(StoreOp::Open);
        assert!(store.open().await.is_err());
        assert_eq!(store.open_sessions(), 0);
    }
}
