pub mod errors;
pub mod formats;
pub mod model;

pub use errors::ParserError;
pub use formats::{DeckUnitStatusParser, QcExportParser};
pub use model::{columns, DeckUnitStatus, QcFileData};

/// Parse a quality-controlled sensor export.
pub fn parse_qc_file(content: &str) -> Result<QcFileData, ParserError> {
    QcExportParser.parse(content)
}

/// Parse a deck unit status upload.
pub fn parse_deck_unit_status(content: &str) -> Result<DeckUnitStatus, ParserError> {
    DeckUnitStatusParser.parse(content)
}

#[cfg(test)]
mod tests;
