//! Set operations over a checked-out database session

use crate::{DbError, DbResult, DbSession};
use hcfd_core::{SetStore, StoreError, StoreResult};
use tracing::{debug, instrument};

impl DbSession {
    #[instrument(skip(self))]
    pub async fn set_contains(&self, set: &str, member: &str) -> DbResult<bool> {
        let mut conn = self.conn.lock().await;
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM hcfd_sets
            WHERE set_name = ? AND member = ?
            "#,
        )
        .bind(set)
        .bind(member)
        .fetch_one(&mut **conn)
        .await?;

        Ok(count > 0)
    }

    #[instrument(skip(self))]
    pub async fn set_insert(&self, set: &str, member: &str) -> DbResult<bool> {
        let mut conn = self.conn.lock().await;
        let result = sqlx::query(
            r#"
            INSERT IGNORE INTO hcfd_sets (set_name, member)
            VALUES (?, ?)
            "#,
        )
        .bind(set)
        .bind(member)
        .execute(&mut **conn)
        .await?;

        let inserted = result.rows_affected() > 0;
        debug!("Inserted into {}: {} (new: {})", set, member, inserted);
        Ok(inserted)
    }

    #[instrument(skip(self))]
    pub async fn set_delete(&self, set: &str, member: &str) -> DbResult<bool> {
        let mut conn = self.conn.lock().await;
        let result = sqlx::query("DELETE FROM hcfd_sets WHERE set_name = ? AND member = ?")
            .bind(set)
            .bind(member)
            .execute(&mut **conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    pub async fn set_members(&self, set: &str) -> DbResult<Vec<String>> {
        let mut conn = self.conn.lock().await;
        let members: Vec<String> = sqlx::query_scalar(
            "SELECT member FROM hcfd_sets WHERE set_name = ? ORDER BY member",
        )
        .bind(set)
        .fetch_all(&mut **conn)
        .await?;

        debug!("Retrieved {} members of {}", members.len(), set);
        Ok(members)
    }

    #[instrument(skip(self))]
    pub async fn set_count(&self, set: &str) -> DbResult<u64> {
        let mut conn = self.conn.lock().await;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM hcfd_sets WHERE set_name = ?")
            .bind(set)
            .fetch_one(&mut **conn)
            .await?;

        u64::try_from(count).map_err(|_| DbError::ConfigError(format!("negative count {}", count)))
    }

    #[instrument(skip(self))]
    pub async fn set_clear(&self, set: &str) -> DbResult<u64> {
        let mut conn = self.conn.lock().await;
        let result = sqlx::query("DELETE FROM hcfd_sets WHERE set_name = ?")
            .bind(set)
            .execute(&mut **conn)
            .await?;

        let deleted = result.rows_affected();
        debug!("Cleared {} members from {}", deleted, set);
        Ok(deleted)
    }
}

#[async_trait::async_trait]
impl SetStore for DbSession {
    async fn is_member(&self, set: &str, member: &str) -> StoreResult<bool> {
        self.set_contains(set, member).await.map_err(StoreError::from)
    }

    async fn add(&self, set: &str, member: &str) -> StoreResult<bool> {
        self.set_insert(set, member).await.map_err(StoreError::from)
    }

    async fn remove(&self, set: &str, member: &str) -> StoreResult<bool> {
        self.set_delete(set, member).await.map_err(StoreError::from)
    }

    async fn members(&self, set: &str) -> StoreResult<Vec<String>> {
        self.set_members(set).await.map_err(StoreError::from)
    }

    async fn count(&self, set: &str) -> StoreResult<u64> {
        self.set_count(set).await.map_err(StoreError::from)
    }

    async fn clear(&self, set: &str) -> StoreResult<()> {
        self.set_clear(set).await.map(|_| ()).map_err(StoreError::from)
    }
}
