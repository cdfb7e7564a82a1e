//! Core data types for feed readings and change detection

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Second-precision layout shared by every change token
pub const TOKEN_FORMAT: &str = "%Y%m%d%H%M%S";

/// Zero window in `TOKEN_FORMAT`, recorded while every region is quiet
pub const NO_BULLETIN_TOKEN: &str = "00010101000000 00010101000000";

/// Upstream weather document endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSource {
    Rainfall,
    Hazard,
}

impl FeedSource {
    pub const ALL: [FeedSource; 2] = [FeedSource::Rainfall, FeedSource::Hazard];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedSource::Rainfall => "rainfall",
            FeedSource::Hazard => "hazard",
        }
    }

    /// Name of the persisted set holding this source's seen tokens
    pub fn dedup_set(&self) -> &'static str {
        match self {
            FeedSource::Rainfall => "token0",
            FeedSource::Hazard => "token1",
        }
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rainfall measurement kinds the alerting cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    TenMinute,
    Hourly,
}

impl ElementKind {
    /// Map a feed `elementName` onto a kind; other elements are ignored
    pub fn from_feed_name(name: &str) -> Option<Self> {
        match name {
            "MIN_10" => Some(ElementKind::TenMinute),
            "RAIN" => Some(ElementKind::Hourly),
            _ => None,
        }
    }

    /// Label used in rendered alert text
    pub fn label(&self) -> &'static str {
        match self {
            ElementKind::TenMinute => "十分鐘雨量",
            ElementKind::Hourly => "一小時雨量",
        }
    }
}

/// Negative (or non-numeric) values mean the station reported no data
pub fn is_sentinel(value: f64) -> bool {
    !(value >= 0.0)
}

/// One weather station's current rainfall measurement
#[derive(Debug, Clone, PartialEq)]
pub struct StationReading {
    pub station: String,
    pub station_id: String,

    /// City/region tag (`CITY` parameter in the feed)
    pub region: String,

    pub observed_at: DateTime<FixedOffset>,

    /// Raw values, sentinels included
    pub elements: BTreeMap<ElementKind, f64>,
}

impl StationReading {
    /// Measured value for `kind`, `None` when absent or a sentinel
    pub fn value(&self, kind: ElementKind) -> Option<f64> {
        self.elements
            .get(&kind)
            .copied()
            .filter(|v| !is_sentinel(*v))
    }
}

/// Validity window of a hazard bulletin, in the feed's declared offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

/// One hazard bulletin for a region
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HazardAnnouncement {
    pub region: String,
    pub geocode: String,
    pub phenomenon: String,
    pub severity: String,
    /// `None` when the region currently carries no bulletin
    pub validity: Option<ValidityWindow>,
    pub affected_areas: Vec<String>,
}

impl HazardAnnouncement {
    /// Non-empty phenomenon and a window ending strictly after `now`
    pub fn is_actionable<Z: TimeZone>(&self, now: &DateTime<Z>) -> bool {
        if self.phenomenon.is_empty() {
            return false;
        }
        match &self.validity {
            Some(window) => window.end.with_timezone(&Utc) > now.with_timezone(&Utc),
            None => false,
        }
    }
}

/// Fingerprint of the feed content already processed for one source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeToken(String);

impl ChangeToken {
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Token for a non-empty hazard document carrying no bulletin window
    pub fn no_bulletin() -> Self {
        Self(NO_BULLETIN_TOKEN.to_string())
    }

    /// Token for a single observation instant, rendered in `tz`
    pub fn from_instant(instant: &DateTime<FixedOffset>, tz: Tz) -> Self {
        Self(instant.with_timezone(&tz).format(TOKEN_FORMAT).to_string())
    }

    /// Token for a validity window: `start end`, both rendered in `tz`
    pub fn from_window(window: &ValidityWindow, tz: Tz) -> Self {
        Self(format!(
            "{} {}",
            window.start.with_timezone(&tz).format(TOKEN_FORMAT),
            window.end.with_timezone(&tz).format(TOKEN_FORMAT)
        ))
    }

    /// An empty token means nothing relevant was observed
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ChangeToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ChangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of evaluating one feed document
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Evaluation {
    /// Ready-to-send alert bodies, in delivery order
    pub fragments: Vec<String>,
    pub token: ChangeToken,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn test_sentinel_values() {
        assert!(is_sentinel(-1.0));
        assert!(is_sentinel(-998.0));
        assert!(is_sentinel(f64::NAN));
        assert!(!is_sentinel(0.0));
        assert!(!is_sentinel(12.5));
    }

    #[test]
    fn test_reading_value_hides_sentinel() {
        let mut elements = BTreeMap::new();
        elements.insert(ElementKind::TenMinute, -998.0);
        elements.insert(ElementKind::Hourly, 4.5);
        let reading = StationReading {
            station: "新竹".to_string(),
            station_id: "467571".to_string(),
            region: "新竹縣".to_string(),
            observed_at: at("2016-06-07T18:50:00+08:00"),
            elements,
        };

        assert_eq!(reading.value(ElementKind::TenMinute), None);
        assert_eq!(reading.value(ElementKind::Hourly), Some(4.5));
    }

    #[test]
    fn test_token_formats_in_zone() {
        let tz: Tz = "Asia/Taipei".parse().unwrap();
        let token = ChangeToken::from_instant(&at("2016-06-07T10:50:00Z"), tz);
        assert_eq!(token.as_str(), "20160607185000");

        let window = ValidityWindow {
            start: at("2016-06-01T10:00:00+08:00"),
            end: at("2016-06-02T08:30:00+08:00"),
        };
        let token = ChangeToken::from_window(&window, tz);
        assert_eq!(token.as_str(), "20160601100000 20160602083000");

        assert!(!ChangeToken::no_bulletin().is_empty());
        assert_ne!(token, ChangeToken::no_bulletin());
    }

    #[test]
    fn test_actionable_is_strict() {
        let end = at("2016-06-02T08:30:00+08:00");
        let announcement = HazardAnnouncement {
            region: "新竹市".to_string(),
            phenomenon: "豪雨".to_string(),
            severity: "特報".to_string(),
            validity: Some(ValidityWindow {
                start: at("2016-06-01T10:00:00+08:00"),
                end,
            }),
            ..Default::default()
        };

        assert!(!announcement.is_actionable(&end));
        assert!(announcement.is_actionable(&(end - chrono::Duration::seconds(1))));

        let quiet = HazardAnnouncement {
            phenomenon: String::new(),
            ..announcement.clone()
        };
        assert!(!quiet.is_actionable(&(end - chrono::Duration::hours(1))));
    }

    #[test]
    fn test_feed_source_serde() {
        let json = serde_json::to_string(&FeedSource::Hazard).unwrap();
        assert_eq!(json, r#""hazard""#);
        assert_eq!(FeedSource::Rainfall.dedup_set(), "token0");
        assert_eq!(FeedSource::Hazard.dedup_set(), "token1");
    }
}
