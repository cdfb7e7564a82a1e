//! Rainfall observation parsing and threshold classification

use chrono_tz::Tz;
use hcfd_core::{ChangeToken, ElementKind, Evaluation, ParseError, ParseResult, StationReading};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::Write;
use tracing::debug;

use crate::{decode_document, parse_timestamp};

/// Parameter carrying the station's city/region tag
const REGION_PARAMETER: &str = "CITY";

#[derive(Debug, Deserialize)]
struct RawRainfallDocument {
    #[serde(rename = "location", default)]
    locations: Vec<RawStation>,
}

#[derive(Debug, Deserialize)]
struct RawStation {
    #[serde(rename = "locationName")]
    name: String,

    #[serde(rename = "stationId", default)]
    station_id: String,

    time: RawObsTime,

    #[serde(rename = "weatherElement", default)]
    elements: Vec<RawElement>,

    #[serde(rename = "parameter", default)]
    parameters: Vec<RawParameter>,
}

#[derive(Debug, Deserialize)]
struct RawObsTime {
    #[serde(rename = "obsTime")]
    obs_time: String,
}

#[derive(Debug, Deserialize)]
struct RawElement {
    #[serde(rename = "elementName")]
    name: String,

    #[serde(rename = "elementValue")]
    value: RawElementValue,
}

#[derive(Debug, Deserialize)]
struct RawElementValue {
    value: String,
}

#[derive(Debug, Deserialize)]
struct RawParameter {
    #[serde(rename = "parameterName")]
    name: String,

    #[serde(rename = "parameterValue", default)]
    value: String,
}

impl RawStation {
    fn into_reading(self) -> ParseResult<StationReading> {
        let observed_at = parse_timestamp("obsTime", &self.time.obs_time)?;

        let mut elements = BTreeMap::new();
        for element in self.elements {
            let Some(kind) = ElementKind::from_feed_name(element.name.trim()) else {
                continue;
            };
            let value = element
                .value
                .value
                .trim()
                .parse::<f64>()
                .map_err(|_| ParseError::Value {
                    element: element.name.clone(),
                    value: element.value.value.clone(),
                })?;
            elements.insert(kind, value);
        }

        let region = self
            .parameters
            .iter()
            .find(|p| p.name.trim() == REGION_PARAMETER)
            .map(|p| p.value.trim().to_string())
            .unwrap_or_default();

        Ok(StationReading {
            station: self.name.trim().to_string(),
            station_id: self.station_id.trim().to_string(),
            region,
            observed_at,
            elements,
        })
    }
}

/// Parse a rainfall observation document into station readings
pub fn parse_rainfall(bytes: &[u8]) -> ParseResult<Vec<StationReading>> {
    let document: RawRainfallDocument = decode_document(bytes)?;
    document
        .locations
        .into_iter()
        .map(RawStation::into_reading)
        .collect()
}

/// Alert thresholds in millimetres, compared inclusively
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RainThresholds {
    pub ten_minute_mm: f64,
    pub hourly_mm: f64,
}

impl RainThresholds {
    pub fn for_kind(&self, kind: ElementKind) -> f64 {
        match kind {
            ElementKind::TenMinute => self.ten_minute_mm,
            ElementKind::Hourly => self.hourly_mm,
        }
    }
}

/// Turns rainfall readings for the target regions into alert fragments
#[derive(Debug, Clone)]
pub struct RainfallEvaluator {
    targets: Vec<String>,
    thresholds: RainThresholds,
    tz: Tz,
}

impl RainfallEvaluator {
    pub fn new(targets: Vec<String>, thresholds: RainThresholds, tz: Tz) -> Self {
        Self {
            targets,
            thresholds,
            tz,
        }
    }

    /// Parse and evaluate a raw rainfall document
    pub fn evaluate(&self, bytes: &[u8]) -> ParseResult<Evaluation> {
        let readings = parse_rainfall(bytes)?;
        Ok(self.evaluate_readings(&readings))
    }

    pub fn evaluate_readings(&self, readings: &[StationReading]) -> Evaluation {
        let mut fragments = Vec::new();
        let mut latest = None;

        for reading in readings
            .iter()
            .filter(|r| self.targets.iter().any(|t| *t == r.region))
        {
            debug!(
                station = %reading.station,
                region = %reading.region,
                observed_at = %reading.observed_at,
                "Matched rainfall station"
            );

            if let Some(fragment) = self.classify(reading) {
                fragments.push(fragment);
            }

            latest = match latest {
                Some(current) if current >= reading.observed_at => Some(current),
                _ => Some(reading.observed_at),
            };
        }

        let token = latest
            .map(|at| ChangeToken::from_instant(&at, self.tz))
            .unwrap_or_else(ChangeToken::empty);

        Evaluation { fragments, token }
    }

    /// Render a fragment if any non-sentinel element reaches its threshold
    fn classify(&self, reading: &StationReading) -> Option<String> {
        let mut lines = String::new();
        for kind in [ElementKind::TenMinute, ElementKind::Hourly] {
            match reading.value(kind) {
                Some(value) if value >= self.thresholds.for_kind(kind) => {
                    let _ = writeln!(lines, "{}：{:.1}", kind.label(), value);
                }
                Some(value) => debug!(station = %reading.station, "{}：{:.2}", kind.label(), value),
                None => debug!(station = %reading.station, "{}：-", kind.label()),
            }
        }

        if lines.is_empty() {
            return None;
        }
        Some(format!("【{}】豪大雨警報\n{}", reading.station, lines))
    }
}
