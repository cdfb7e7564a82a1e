//! Persisted set storage for subscribers and seen change tokens
//!
//! Backs the `user`, `token0` and `token1` sets. The MySQL client is used in
//! production; the in-memory store serves tests and dry runs.

pub mod client;
pub mod dedup;
pub mod memory;
pub mod queries;
pub mod registry;
pub mod schema;

pub use client::*;
pub use dedup::*;
pub use memory::*;
pub use registry::*;

use hcfd_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

pub type DbResult<T> = Result<T, DbError>;

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::ConnectionError(
                e @ (sqlx::Error::Io(_)
                | sqlx::Error::PoolTimedOut
                | sqlx::Error::PoolClosed
                | sqlx::Error::Tls(_)),
            ) => StoreError::Unavailable(e.to_string()),
            DbError::ConnectionError(e) => StoreError::Command(e.to_string()),
            DbError::ConfigError(msg) => StoreError::Unavailable(msg),
        }
    }
}
