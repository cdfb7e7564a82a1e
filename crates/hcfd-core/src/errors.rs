//! Error taxonomy shared across the poll pipeline

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP error: {0}")]
    Status(u16),

    #[error("Empty response body")]
    EmptyBody,

    #[error("Invalid endpoint: {0}")]
    Endpoint(String),
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed document: {0}")]
    Malformed(String),

    #[error("Invalid timestamp in {field}: {value:?}")]
    Timestamp { field: &'static str, value: String },

    #[error("Invalid value for {element}: {value:?}")]
    Value { element: String, value: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store command failed: {0}")]
    Command(String),

    #[error("Invalid member: {0:?}")]
    InvalidMember(String),
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Gateway rejected message to {recipient}: {reason}")]
    Rejected { recipient: String, reason: String },

    #[error("Gateway transport error: {0}")]
    Transport(String),
}

pub type FetchResult<T> = Result<T, FetchError>;
pub type ParseResult<T> = Result<T, ParseError>;
pub type StoreResult<T> = Result<T, StoreError>;
pub type DeliveryResult<T> = Result<T, DeliveryError>;
