use chrono::NaiveDateTime;

use crate::errors::ParserError;
use crate::model::DeckUnitStatus;

use super::parse_optional_f64;

const BATTERY_LABEL: &str = "Deck unit battery percent";
const UPLOAD_TIME_LABEL: &str = "Upload time";
const UPLOAD_TIME_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Reader for the `label,value` status CSV a deck unit uploads after each
/// communication window. Only the battery level and the upload time are used.
pub struct DeckUnitStatusParser;

impl DeckUnitStatusParser {
    const NAME: &'static str = "DECK_UNIT_STATUS";

    pub fn parse(&self, content: &str) -> Result<DeckUnitStatus, ParserError> {
        let mut battery_percent = None;
        let mut upload_time = None;

        for (idx, line) in content.lines().enumerate() {
            let mut fields = line.split(',');
            let label = fields.next().unwrap_or_default().trim();
            let value = fields.next().unwrap_or_default().trim();

            if label == BATTERY_LABEL {
                battery_percent = parse_optional_f64(Self::NAME, value, idx + 1, BATTERY_LABEL)?;
            } else if label == UPLOAD_TIME_LABEL {
                let parsed = NaiveDateTime::parse_from_str(value, UPLOAD_TIME_FORMAT).map_err(
                    |err| ParserError::DataRow {
                        parser: Self::NAME,
                        line_index: idx + 1,
                        message: format!("invalid upload time '{value}': {err}"),
                    },
                )?;
                upload_time = Some(parsed);
            }
        }

        let upload_time = upload_time.ok_or_else(|| ParserError::Validation {
            parser: Self::NAME,
            message: format!("'{UPLOAD_TIME_LABEL}' row not found"),
        })?;

        Ok(DeckUnitStatus {
            battery_percent: battery_percent.unwrap_or(0.0),
            upload_time,
        })
    }
}
