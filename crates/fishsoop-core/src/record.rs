// crates/fishsoop-core/src/record.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use fishsoop_bucket::ObjectLocation;
use once_cell::sync::Lazy;
use regex::Regex;

/// Attribute names read from a sensor record.
pub mod attrs {
    pub const PROGRAMME_NAME: &str = "programme_name";
    pub const VESSEL_NAME: &str = "vessel_name";
    pub const VESSEL_ID: &str = "vessel_id";
    pub const VESSEL_EMAIL: &str = "vessel_email";
    pub const MOANA_SERIAL_NUMBER: &str = "moana_serial_number";
    pub const EMAIL_FREQUENCY: &str = "email_frequency";
    pub const EMAIL_STATUS: &str = "email_status";
    pub const RAW_DATA_FILENAME: &str = "raw_data_filename";
}

static SERIAL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"MOANA_(\d{4})_").expect("serial pattern is valid"));

/// Four-digit sensor serial embedded in a Moana file name.
pub fn serial_from_name(name: &str) -> Option<&str> {
    SERIAL_PATTERN
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Programme {
    FishSoop,
    Other,
}

impl Programme {
    pub fn from_attribute(value: Option<&str>) -> Self {
        match value {
            Some("Fish-Soop") => Programme::FishSoop,
            _ => Programme::Other,
        }
    }
}

/// One quality-accepted measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub temperature: f64,
    pub depth: f64,
    pub qc_flag: i64,
    pub phase: Option<String>,
}

/// Extracted deployment: attributes plus the samples that passed quality control.
#[derive(Debug, Clone)]
pub struct SensorRecord {
    pub source: ObjectLocation,
    pub attributes: BTreeMap<String, String>,
    pub samples: Vec<Sample>,
}

impl SensorRecord {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn programme(&self) -> Programme {
        Programme::from_attribute(self.attribute(attrs::PROGRAMME_NAME))
    }

    /// Name logged when the send workflow reports on this record.
    pub fn raw_filename(&self) -> &str {
        self.attribute(attrs::RAW_DATA_FILENAME)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.source.file_name())
    }

    pub fn serial_number(&self) -> Option<&str> {
        serial_from_name(self.source.file_name())
    }

    /// Near-real-time emailing switched on for this vessel.
    pub fn email_enabled(&self) -> bool {
        self.attribute(attrs::EMAIL_FREQUENCY) == Some("nrt")
            && self.attribute(attrs::EMAIL_STATUS) == Some("on")
    }

    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let min = self.samples.iter().map(|s| s.time).min()?;
        let max = self.samples.iter().map(|s| s.time).max()?;
        Some((min, max))
    }

    /// File name without its final extension.
    pub fn stem(&self) -> &str {
        file_stem(self.source.file_name())
    }
}

pub fn file_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}
