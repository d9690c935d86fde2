// crates/fishsoop-core/src/status_page/table.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{JobError, Result};
use crate::templates::HtmlTemplate;

/// Display format of every date cell.
pub const DATE_FORMAT: &str = "%d %b %Y";

/// Colour class of a cell: black, orange or red.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellClass {
    K1,
    O1,
    R1,
}

impl CellClass {
    /// Data recency: fresh within 14 days, stale within 30.
    pub fn for_data_age(days: i64) -> Self {
        if days > 30 {
            CellClass::R1
        } else if days > 14 {
            CellClass::O1
        } else {
            CellClass::K1
        }
    }

    pub fn for_battery(percent: f64) -> Self {
        if percent < 60.0 {
            CellClass::R1
        } else if percent < 80.0 {
            CellClass::O1
        } else {
            CellClass::K1
        }
    }

    pub fn for_last_comm(days: i64) -> Self {
        if days > 14 {
            CellClass::R1
        } else if days > 2 {
            CellClass::O1
        } else {
            CellClass::K1
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub value: String,
    pub class: CellClass,
}

impl Cell {
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            class: CellClass::K1,
        }
    }

    fn as_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.value.trim(), DATE_FORMAT).ok()
    }
}

/// One vessel line of the monitoring page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRow {
    pub vessel: Cell,
    pub sensors: Cell,
    pub last_data: Cell,
    pub deck_unit: Cell,
    pub battery: Cell,
    pub last_comm: Cell,
}

impl StatusRow {
    fn cells_mut(&mut self) -> [&mut Cell; 6] {
        [
            &mut self.vessel,
            &mut self.sensors,
            &mut self.last_data,
            &mut self.deck_unit,
            &mut self.battery,
            &mut self.last_comm,
        ]
    }

    fn cells(&self) -> [&Cell; 6] {
        [
            &self.vessel,
            &self.sensors,
            &self.last_data,
            &self.deck_unit,
            &self.battery,
            &self.last_comm,
        ]
    }
}

const HEADERS: [&str; 6] = [
    "Boat Name",
    "Sensor SN",
    "Last Data",
    "DU Number",
    "Battery (%)",
    "Last Comm",
];

const PAGE_STYLE: &str = r#"<style>
body { font-family: sans-serif; }
table { border-collapse: collapse; }
th, td { border: 1px solid #999; padding: 4px 12px; text-align: left; }
.k1 { color: #000000; }
.o1 { color: #e67e00; }
.r1 { color: #cc0000; }
</style>"#;

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{{title}}</title>
{{{style}}}
</head>
<body>
<h1 style="font-size: 24px; font-weight: bold;">{{title}}</h1><br><br>
<table>
<tr>{{#each headers}}<th>{{this}}</th>{{/each}}</tr>
{{#each rows}}
<tr>{{#each this}}<td><span class="{{class}}">{{value}}</span></td>{{/each}}</tr>
{{/each}}
</table>
</body>
</html>
"#;

/// Ordered rows, most recently updated vessel first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTable {
    pub rows: Vec<StatusRow>,
}

impl StatusTable {
    pub fn find(&self, vessel: &str) -> Option<&StatusRow> {
        self.rows.iter().find(|row| row.vessel.value == vessel)
    }

    pub fn find_mut(&mut self, vessel: &str) -> Option<&mut StatusRow> {
        self.rows.iter_mut().find(|row| row.vessel.value == vessel)
    }

    /// Replaces any row for the same vessel and moves it to the top.
    pub fn upsert_front(&mut self, row: StatusRow) {
        self.rows.retain(|existing| existing.vessel.value != row.vessel.value);
        self.rows.insert(0, row);
    }

    /// Re-colours every date-valued cell by its age relative to `today`.
    pub fn recolor_dates(&mut self, today: NaiveDate) {
        for row in &mut self.rows {
            for cell in row.cells_mut() {
                if let Some(date) = cell.as_date() {
                    cell.class = CellClass::for_data_age((today - date).num_days());
                }
            }
        }
    }

    pub fn render_html(&self, title: &str) -> Result<String> {
        let page = HtmlTemplate::new(PAGE_TEMPLATE).map_err(|err| JobError::Render(err.to_string()))?;
        let rows: Vec<[&Cell; 6]> = self.rows.iter().map(StatusRow::cells).collect();
        page.render(&PageContext {
            title,
            style: PAGE_STYLE,
            headers: &HEADERS,
            rows,
        })
        .map_err(|err| JobError::Render(err.to_string()))
    }
}

#[derive(Serialize)]
struct PageContext<'a> {
    title: &'a str,
    style: &'static str,
    headers: &'static [&'static str],
    rows: Vec<[&'a Cell; 6]>,
}
