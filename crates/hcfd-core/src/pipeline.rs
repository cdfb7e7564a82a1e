use chrono::{DateTime, Utc};
use std::sync::Mutex;

use crate::{DeliveryResult, FeedSource, FetchResult, StoreResult};

/// Fetches raw feed documents
#[async_trait::async_trait]
pub trait TelemetryClient: Send + Sync {
    async fn fetch(&self, source: FeedSource) -> FetchResult<Vec<u8>>;
}

/// Named string sets in the external key/value store
#[async_trait::async_trait]
pub trait SetStore: Send + Sync {
    async fn is_member(&self, set: &str, member: &str) -> StoreResult<bool>;

    /// Returns `true` when the member was newly inserted
    async fn add(&self, set: &str, member: &str) -> StoreResult<bool>;

    /// Returns `true` when the member was present
    async fn remove(&self, set: &str, member: &str) -> StoreResult<bool>;

    async fn members(&self, set: &str) -> StoreResult<Vec<String>>;

    async fn count(&self, set: &str) -> StoreResult<u64>;

    async fn clear(&self, set: &str) -> StoreResult<()>;
}

/// Opens a scoped store session; the session is released when dropped
#[async_trait::async_trait]
pub trait StoreConnector: Send + Sync {
    async fn open(&self) -> StoreResult<Box<dyn SetStore>>;
}

/// Outbound "send text to recipient" operation
#[async_trait::async_trait]
pub trait MessageGateway: Send + Sync {
    fn name(&self) -> &str;

    async fn send_text(&self, recipient: &str, text: &str) -> DeliveryResult<()>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a settable instant
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
