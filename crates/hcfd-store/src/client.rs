//! Database client and per-cycle session management

use crate::schema::CREATE_SETS_TABLE;
use crate::{DbError, DbResult};
use hcfd_core::{SetStore, StoreConnector, StoreError, StoreResult};
use sqlx::mysql::{MySql, MySqlPool, MySqlPoolOptions};
use sqlx::pool::PoolConnection;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Pool sizing for the set store; one connection is held per poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 4,
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

/// MySQL-backed set store
#[derive(Clone)]
pub struct DbClient {
    pool: MySqlPool,
}

impl DbClient {
    pub async fn new(database_url: &str) -> DbResult<Self> {
        Self::connect(database_url, PoolSettings::default()).await
    }

    pub async fn connect(database_url: &str, settings: PoolSettings) -> DbResult<Self> {
        if settings.max_connections == 0 {
            return Err(DbError::ConfigError(
                "max_connections must be at least 1".to_string(),
            ));
        }
        let pool = MySqlPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect(database_url)
            .await?;

        debug!(max_connections = settings.max_connections, "Store pool ready");
        Ok(Self { pool })
    }

    pub async fn ping(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Create the sets table if it does not exist yet
    pub async fn ensure_schema(&self) -> DbResult<()> {
        sqlx::query(CREATE_SETS_TABLE).execute(&self.pool).await?;
        info!("Set storage schema ready");
        Ok(())
    }

    /// Check out one pooled connection for the duration of a cycle
    pub async fn session(&self) -> DbResult<DbSession> {
        let conn = self.pool.acquire().await?;
        debug!("Store session opened");
        Ok(DbSession {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait::async_trait]
impl StoreConnector for DbClient {
    async fn open(&self) -> StoreResult<Box<dyn SetStore>> {
        let session = self.session().await.map_err(StoreError::from)?;
        Ok(Box::new(session))
    }
}

/// One checked-out connection; returned to the pool on drop
pub struct DbSession {
    pub(crate) conn: Mutex<PoolConnection<MySql>>,
}

impl Drop for DbSession {
    fn drop(&mut self) {
        debug!("Store session released");
    }
}
