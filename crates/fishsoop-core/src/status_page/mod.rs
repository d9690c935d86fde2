// crates/fishsoop-core/src/status_page/mod.rs

mod table;

pub use table::{Cell, CellClass, StatusRow, StatusTable, DATE_FORMAT};

use std::collections::BTreeSet;

use bytes::Bytes;
use chrono::NaiveDate;
use fishsoop_bucket::{BucketError, BucketStore, ObjectLocation};
use fishsoop_parser::DeckUnitStatus;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::StatusPageConfig;
use crate::context::JobContext;
use crate::error::{JobError, Result};
use crate::event::StorageEvent;
use crate::fleet::{strip_leading_zeros, FleetRegistry};

pub const PAGE_TITLE: &str = "FishSOOP Monitoring";

static KEY_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{2})(\d{2})(\d{2})").expect("date pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StatusPageOutcome {
    Updated { vessel: String },
    VesselNotFound { serial: String },
    Ignored { reason: String },
}

/// Sensor serial from the first key segment, without leading zeros.
pub fn sensor_from_key(key: &str) -> Option<&str> {
    let serial = strip_leading_zeros(key.split('/').next().unwrap_or(""));
    (!serial.is_empty()).then_some(serial)
}

/// Date of the first `YYMMDD` run in the key.
pub fn date_from_key(key: &str) -> Option<NaiveDate> {
    let caps = KEY_DATE.captures(key)?;
    let part = |idx: usize| caps.get(idx).and_then(|m| m.as_str().parse::<u32>().ok());
    let year = 2000 + part(1)? as i32;
    NaiveDate::from_ymd_opt(year, part(2)?, part(3)?)
}

/// Sorted, de-duplicated serial list, numeric serials in numeric order.
pub fn sensor_list(event_sensor: &str, active: &[String]) -> String {
    let unique: BTreeSet<&str> = std::iter::once(event_sensor)
        .chain(active.iter().map(String::as_str))
        .collect();
    let mut serials: Vec<&str> = unique.into_iter().collect();
    serials.sort_by_key(|serial| (serial.parse::<u64>().unwrap_or(u64::MAX), serial.to_string()));
    serials.join(", ")
}

/// New data from a sensor: rewrite the vessel's row and move it to the top.
pub fn apply_sensor_upload(
    table: &mut StatusTable,
    vessel: &str,
    sensors: &str,
    last_data: NaiveDate,
    today: NaiveDate,
) {
    let last_date = last_data.format(DATE_FORMAT).to_string();
    let (deck_unit, battery, last_comm) = match table.find(vessel) {
        Some(row) => (row.deck_unit.clone(), row.battery.clone(), row.last_comm.clone()),
        None => (
            Cell::plain("Unknown"),
            Cell::plain("NA"),
            Cell::plain(last_date.clone()),
        ),
    };
    table.upsert_front(StatusRow {
        vessel: Cell::plain(vessel),
        sensors: Cell::plain(sensors),
        last_data: Cell::plain(last_date),
        deck_unit,
        battery,
        last_comm,
    });
    table.recolor_dates(today);
}

/// Deck unit report: refresh the unit's cells on an existing row. Returns false when the
/// vessel has no row yet.
pub fn apply_deck_unit_status(
    table: &mut StatusTable,
    vessel: &str,
    deck_unit: &str,
    status: &DeckUnitStatus,
    today: NaiveDate,
) -> bool {
    let Some(row) = table.find_mut(vessel) else {
        return false;
    };
    let comm_date = status.upload_time.date();
    row.deck_unit = Cell::plain(deck_unit);
    row.battery = Cell {
        value: format!("{:.1}", status.battery_percent),
        class: CellClass::for_battery(status.battery_percent),
    };
    row.last_comm = Cell {
        value: comm_date.format(DATE_FORMAT).to_string(),
        class: CellClass::for_last_comm((today - comm_date).num_days()),
    };
    true
}

async fn load_table(store: &dyn BucketStore, location: &ObjectLocation) -> Result<StatusTable> {
    match store.get_object(location).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(BucketError::NotFound(_)) => {
            info!(%location, "no status table yet, starting empty");
            Ok(StatusTable::default())
        }
        Err(err) => Err(err.into()),
    }
}

async fn save_table(
    store: &dyn BucketStore,
    config: &StatusPageConfig,
    table: &StatusTable,
) -> Result<()> {
    let json = serde_json::to_vec_pretty(table)?;
    let html = table.render_html(PAGE_TITLE)?;
    store
        .put_object(&config.table, Bytes::from(json), "application/json")
        .await?;
    store
        .put_object(
            &config.page,
            Bytes::from(html),
            "text/html; charset=utf-8",
        )
        .await?;
    info!(page = %config.page, rows = table.rows.len(), "status page updated");
    Ok(())
}

async fn load_fleet(store: &dyn BucketStore, location: &ObjectLocation) -> Result<FleetRegistry> {
    let bytes = store.get_object(location).await?;
    let content = String::from_utf8_lossy(&bytes);
    Ok(FleetRegistry::parse(&content)?)
}

/// A quality-controlled file landed for a sensor.
pub async fn update_for_sensor_upload(
    ctx: &JobContext,
    event: &StorageEvent,
    today: NaiveDate,
) -> Result<StatusPageOutcome> {
    let config = &ctx.config.status_page;
    let location = event.object_location()?;
    let sensor = sensor_from_key(&location.key).ok_or_else(|| {
        JobError::InvalidEvent(format!("no sensor number in key {}", location.key))
    })?;

    let fleet = load_fleet(ctx.store.as_ref(), &config.fleet_metadata).await?;
    let Some(entry) = fleet.active_entry_for_sensor(sensor) else {
        info!(sensor, "no active vessel for sensor");
        return Ok(StatusPageOutcome::VesselNotFound {
            serial: sensor.to_string(),
        });
    };
    let vessel = entry.vessel_name.clone();
    let sensors = sensor_list(sensor, &fleet.active_sensors(&vessel));
    let last_data = date_from_key(&location.key).ok_or_else(|| {
        JobError::Processing(format!("error extracting date from file name {}", location.key))
    })?;

    let mut table = load_table(ctx.store.as_ref(), &config.table).await?;
    apply_sensor_upload(&mut table, &vessel, &sensors, last_data, today);
    save_table(ctx.store.as_ref(), config, &table).await?;

    Ok(StatusPageOutcome::Updated { vessel })
}

/// A deck unit uploaded its `<du>/....csv` status report.
pub async fn update_for_deck_unit_upload(
    ctx: &JobContext,
    event: &StorageEvent,
    today: NaiveDate,
) -> Result<StatusPageOutcome> {
    let config = &ctx.config.status_page;
    let location = event.object_location()?;
    if !location.key.to_ascii_lowercase().ends_with(".csv") {
        warn!(%location, "deck unit object is not a CSV file");
        return Ok(StatusPageOutcome::Ignored {
            reason: format!("{} is not a CSV file", location.key),
        });
    }
    let deck_unit = location.key.split('/').next().unwrap_or("").to_string();

    let bytes = ctx.store.get_object(&location).await?;
    let status = fishsoop_parser::parse_deck_unit_status(&String::from_utf8_lossy(&bytes))?;

    let fleet = load_fleet(ctx.store.as_ref(), &config.fleet_metadata).await?;
    let Some(entry) = fleet.active_entry_for_deck_unit(&deck_unit) else {
        warn!(deck_unit = %deck_unit, "boat name not found for deck unit");
        return Ok(StatusPageOutcome::VesselNotFound { serial: deck_unit });
    };
    let vessel = entry.vessel_name.clone();

    let mut table = load_table(ctx.store.as_ref(), &config.table).await?;
    if !apply_deck_unit_status(&mut table, &vessel, &deck_unit, &status, today) {
        warn!(vessel = %vessel, "vessel not in existing status table");
        return Ok(StatusPageOutcome::Ignored {
            reason: format!("{vessel} has no status row"),
        });
    }
    save_table(ctx.store.as_ref(), config, &table).await?;

    Ok(StatusPageOutcome::Updated { vessel })
}

