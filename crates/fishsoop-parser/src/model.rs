use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Canonical sample column names shared by every consumer of a parsed export.
pub mod columns {
    pub const DATETIME: &str = "DATETIME";
    pub const LATITUDE: &str = "LATITUDE";
    pub const LONGITUDE: &str = "LONGITUDE";
    pub const TEMPERATURE: &str = "TEMPERATURE";
    pub const DEPTH: &str = "DEPTH";
    pub const QC_FLAG: &str = "QC_FLAG";
    pub const PHASE: &str = "PHASE";

    pub const REQUIRED: [&str; 6] = [DATETIME, LATITUDE, LONGITUDE, TEMPERATURE, DEPTH, QC_FLAG];
}

/// One quality-controlled deployment: global attributes plus the full sample table.
///
/// `samples` carries every row of the source file, including the ones whose
/// quality flag marks them as bad. `DATETIME` is a UTC microsecond datetime column.
#[derive(Debug, Clone)]
pub struct QcFileData {
    pub attributes: BTreeMap<String, String>,
    pub samples: DataFrame,
}

impl QcFileData {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckUnitStatus {
    pub battery_percent: f64,
    pub upload_time: NaiveDateTime,
}
