//! Fleet metadata sheet mapping sensors and deck units to vessels.

use serde::Deserialize;

const ACTIVE: &str = "Active";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FleetEntry {
    #[serde(rename = "Mangopare serial number")]
    pub sensor_serial: String,
    #[serde(rename = "Deck unit serial number", default)]
    pub deck_unit_serial: String,
    #[serde(rename = "Vessel name")]
    pub vessel_name: String,
    #[serde(rename = "Active/Terminated")]
    pub status: String,
}

impl FleetEntry {
    pub fn is_active(&self) -> bool {
        self.status.trim() == ACTIVE
    }
}

pub fn strip_leading_zeros(serial: &str) -> &str {
    serial.trim().trim_start_matches('0')
}

#[derive(Debug, Clone, Default)]
pub struct FleetRegistry {
    entries: Vec<FleetEntry>,
}

impl FleetRegistry {
    /// The first line of the sheet is a banner above the real header.
    pub fn parse(content: &str) -> Result<Self, csv::Error> {
        let body = content.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(body.as_bytes());
        let entries = reader
            .deserialize()
            .collect::<Result<Vec<FleetEntry>, _>>()?;
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[FleetEntry] {
        &self.entries
    }

    pub fn active_entry_for_sensor(&self, sensor: &str) -> Option<&FleetEntry> {
        let wanted = strip_leading_zeros(sensor);
        self.entries
            .iter()
            .find(|e| e.is_active() && strip_leading_zeros(&e.sensor_serial) == wanted)
    }

    pub fn active_entry_for_deck_unit(&self, deck_unit: &str) -> Option<&FleetEntry> {
        let wanted = strip_leading_zeros(deck_unit);
        self.entries.iter().find(|e| {
            e.is_active()
                && !e.deck_unit_serial.is_empty()
                && strip_leading_zeros(&e.deck_unit_serial) == wanted
        })
    }

    /// Active sensor serials fitted to the vessel, without leading zeros.
    pub fn active_sensors(&self, vessel_name: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.is_active() && e.vessel_name == vessel_name)
            .map(|e| strip_leading_zeros(&e.sensor_serial).to_string())
            .collect()
    }
}
