mod common;
mod deck_unit;
mod qc_export;

pub use deck_unit::DeckUnitStatusParser;
pub use qc_export::QcExportParser;

pub(crate) use common::{parse_optional_f64, parse_required_i64, parse_timestamp};
