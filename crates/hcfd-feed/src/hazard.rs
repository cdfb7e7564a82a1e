//! Hazard warning parsing, expiry filtering and rendering

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use hcfd_core::{ChangeToken, Evaluation, HazardAnnouncement, ParseResult, ValidityWindow};
use serde::Deserialize;
use tracing::debug;

use crate::{decode_document, parse_timestamp};

/// Layout of validity times in rendered bulletins
const DISPLAY_FORMAT: &str = "%m/%d %H:%M";

#[derive(Debug, Deserialize)]
struct RawHazardDocument {
    dataset: RawDataset,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDataset {
    #[serde(rename = "location")]
    locations: Vec<RawRegion>,
}

#[derive(Debug, Deserialize)]
struct RawRegion {
    #[serde(rename = "locationName")]
    name: String,

    #[serde(default)]
    geocode: String,

    #[serde(rename = "hazardConditions", default)]
    conditions: RawConditions,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConditions {
    /// One entry per concurrent bulletin
    #[serde(rename = "hazards")]
    hazards: Vec<RawHazards>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawHazards {
    info: RawInfo,

    #[serde(rename = "validTime")]
    valid_time: Option<RawValidTime>,

    hazard: Option<RawHazardDetail>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawInfo {
    phenomena: String,
    significance: String,
}

#[derive(Debug, Deserialize)]
struct RawValidTime {
    #[serde(rename = "startTime")]
    start: String,

    #[serde(rename = "endTime")]
    end: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawHazardDetail {
    info: RawDetailInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDetailInfo {
    #[serde(rename = "affectedAreas")]
    affected_areas: RawAffectedAreas,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAffectedAreas {
    #[serde(rename = "location")]
    locations: Vec<RawArea>,
}

#[derive(Debug, Deserialize)]
struct RawArea {
    #[serde(rename = "locationName")]
    name: String,
}

impl RawRegion {
    /// One announcement per bulletin; a quiet region yields a single
    /// announcement without phenomenon or window
    fn into_announcements(self) -> ParseResult<Vec<HazardAnnouncement>> {
        let region = self.name.trim().to_string();
        let geocode = self.geocode.trim().to_string();

        if self.conditions.hazards.is_empty() {
            return Ok(vec![HazardAnnouncement {
                region,
                geocode,
                ..Default::default()
            }]);
        }

        self.conditions
            .hazards
            .into_iter()
            .map(|hazards| hazards.into_announcement(&region, &geocode))
            .collect()
    }
}

impl RawHazards {
    fn into_announcement(self, region: &str, geocode: &str) -> ParseResult<HazardAnnouncement> {
        let validity = match self.valid_time {
            Some(window) => Some(ValidityWindow {
                start: parse_timestamp("startTime", &window.start)?,
                end: parse_timestamp("endTime", &window.end)?,
            }),
            None => None,
        };

        let affected_areas = self
            .hazard
            .map(|detail| {
                detail
                    .info
                    .affected_areas
                    .locations
                    .into_iter()
                    .map(|area| area.name.trim().to_string())
                    .filter(|name| !name.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(HazardAnnouncement {
            region: region.to_string(),
            geocode: geocode.to_string(),
            phenomenon: self.info.phenomena.trim().to_string(),
            severity: self.info.significance.trim().to_string(),
            validity,
            affected_areas,
        })
    }
}

/// Parse a hazard warning document into announcements, in document order
pub fn parse_hazards(bytes: &[u8]) -> ParseResult<Vec<HazardAnnouncement>> {
    let document: RawHazardDocument = decode_document(bytes)?;
    let mut announcements = Vec::new();
    for region in document.dataset.locations {
        announcements.extend(region.into_announcements()?);
    }
    Ok(announcements)
}

/// Consolidates actionable hazard bulletins into a single alert fragment
#[derive(Debug, Clone)]
pub struct HazardEvaluator {
    /// Empty means every region
    targets: Vec<String>,
    tz: Tz,
}

impl HazardEvaluator {
    pub fn new(targets: Vec<String>, tz: Tz) -> Self {
        Self { targets, tz }
    }

    /// Parse and evaluate a raw hazard document against `now`
    pub fn evaluate(&self, bytes: &[u8], now: DateTime<Utc>) -> ParseResult<Evaluation> {
        let announcements = parse_hazards(bytes)?;
        Ok(self.evaluate_announcements(&announcements, now))
    }

    pub fn evaluate_announcements(
        &self,
        announcements: &[HazardAnnouncement],
        now: DateTime<Utc>,
    ) -> Evaluation {
        // The first bulletin with a window drives the token even when it is
        // no longer actionable, so clearances register as a change too.
        let token = if announcements.is_empty() {
            ChangeToken::empty()
        } else {
            announcements
                .iter()
                .find_map(|a| a.validity.as_ref())
                .map(|window| ChangeToken::from_window(window, self.tz))
                .unwrap_or_else(ChangeToken::no_bulletin)
        };

        let now = now.with_timezone(&self.tz);
        let rendered: Vec<String> = announcements
            .iter()
            .filter(|a| a.is_actionable(&now))
            .filter(|a| self.matches(&a.region))
            .filter_map(|a| self.render(a))
            .collect();

        debug!(
            total = announcements.len(),
            actionable = rendered.len(),
            token = %token,
            "Evaluated hazard bulletins"
        );

        let fragments = if rendered.is_empty() {
            Vec::new()
        } else {
            vec![rendered.join("\n")]
        };

        Evaluation { fragments, token }
    }

    fn matches(&self, region: &str) -> bool {
        self.targets.is_empty() || self.targets.iter().any(|t| t == region)
    }

    /// Render one bulletin; `None` when it has no validity window
    pub fn render(&self, announcement: &HazardAnnouncement) -> Option<String> {
        let window = announcement.validity.as_ref()?;
        Some(format!(
            "【{}】{}{}\n {} ~\n {}\n影響地區：{}\n",
            announcement.region,
            announcement.phenomenon,
            announcement.severity,
            window.start.with_timezone(&self.tz).format(DISPLAY_FORMAT),
            window.end.with_timezone(&self.tz).format(DISPLAY_FORMAT),
            announcement.affected_areas.join(" "),
        ))
    }
}
