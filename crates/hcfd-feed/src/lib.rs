//! Weather feed access and evaluation
//!
//! This crate fetches the CWB open-data documents and turns them into
//! alert fragments plus change tokens:
//! - `client` - HTTP telemetry client for both feed endpoints
//! - `rainfall` - station rainfall parsing and threshold classification
//! - `hazard` - hazard bulletin parsing, expiry filtering and rendering

pub mod client;
pub mod hazard;
pub mod rainfall;

pub use client::*;
pub use hazard::*;
pub use rainfall::*;

use chrono::{DateTime, FixedOffset};
use hcfd_core::{ParseError, ParseResult};

/// Decode feed bytes into one of the raw document shapes
pub(crate) fn decode_document<T>(bytes: &[u8]) -> ParseResult<T>
where
    T: serde::de::DeserializeOwned,
{
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ParseError::Malformed(format!("document is not UTF-8: {}", e)))?;
    quick_xml::de::from_str(text).map_err(|e| ParseError::Malformed(e.to_string()))
}

pub(crate) fn parse_timestamp(field: &'static str, value: &str) -> ParseResult<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value.trim()).map_err(|_| ParseError::Timestamp {
        field,
        value: value.to_string(),
    })
}
