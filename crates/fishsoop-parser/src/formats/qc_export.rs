use std::collections::BTreeMap;

use csv::{ReaderBuilder, StringRecord, Trim};
use polars::prelude::*;

use crate::errors::ParserError;
use crate::model::{columns, QcFileData};

use super::{parse_optional_f64, parse_required_i64, parse_timestamp};

/// Reader for the quality-controlled export written by the QC stage.
///
/// The file starts with one `name,value` attribute per line, terminated by a
/// blank line, followed by a CSV sample table with the columns in
/// [`columns::REQUIRED`] and an optional `PHASE` column.
pub struct QcExportParser;

impl Default for QcExportParser {
    fn default() -> Self {
        Self
    }
}

#[derive(Debug, Clone, Copy)]
struct ColumnIndexes {
    datetime: usize,
    latitude: usize,
    longitude: usize,
    temperature: usize,
    depth: usize,
    qc_flag: usize,
    phase: Option<usize>,
}

#[derive(Default)]
struct SampleColumns {
    datetime: Vec<i64>,
    latitude: Vec<Option<f64>>,
    longitude: Vec<Option<f64>>,
    temperature: Vec<Option<f64>>,
    depth: Vec<Option<f64>>,
    qc_flag: Vec<i64>,
    phase: Vec<Option<String>>,
}

impl QcExportParser {
    const NAME: &'static str = "QC_EXPORT";

    pub fn parse(&self, content: &str) -> Result<QcFileData, ParserError> {
        let lines: Vec<&str> = content.lines().collect();
        let Some(separator) = lines.iter().position(|line| line.trim().is_empty()) else {
            return Err(ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: "attribute block is not terminated by a blank line".to_string(),
            });
        };

        let attributes = Self::parse_attributes(&lines[..separator])?;

        let table_offset = separator + 1;
        let table = lines[table_offset..].join("\n");
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(table.as_bytes());

        let headers = reader
            .headers()
            .map_err(|source| ParserError::Csv {
                parser: Self::NAME,
                source,
            })?
            .clone();
        let indexes = Self::classify_headers(&headers)?;

        let mut samples = SampleColumns::default();
        for (row_index, record) in reader.records().enumerate() {
            let record = record.map_err(|source| ParserError::Csv {
                parser: Self::NAME,
                source,
            })?;
            // 1-based file line: attribute block, blank line, table header, then rows.
            let line_index = table_offset + row_index + 2;
            Self::push_row(&mut samples, &indexes, &record, line_index)?;
        }

        if samples.datetime.is_empty() {
            return Err(ParserError::EmptyData { parser: Self::NAME });
        }

        let samples = Self::build_dataframe(samples, indexes.phase.is_some())?;
        Ok(QcFileData {
            attributes,
            samples,
        })
    }

    fn parse_attributes(lines: &[&str]) -> Result<BTreeMap<String, String>, ParserError> {
        let mut attributes = BTreeMap::new();
        for line in lines {
            let Some((name, value)) = line.split_once(',') else {
                return Err(ParserError::InvalidHeader {
                    parser: Self::NAME,
                    message: format!("attribute line '{}' has no value", line.trim()),
                });
            };
            let name = name.trim();
            if name.is_empty() {
                return Err(ParserError::InvalidHeader {
                    parser: Self::NAME,
                    message: "attribute line has an empty name".to_string(),
                });
            }
            let value = value.trim().trim_matches('"').trim();
            attributes.insert(name.to_string(), value.to_string());
        }

        if attributes.is_empty() {
            return Err(ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: "file has no attribute block".to_string(),
            });
        }
        Ok(attributes)
    }

    fn classify_headers(headers: &StringRecord) -> Result<ColumnIndexes, ParserError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|header| header.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: format!("missing required column '{name}'"),
            })
        };

        let mut required = [0usize; columns::REQUIRED.len()];
        for (slot, name) in required.iter_mut().zip(columns::REQUIRED) {
            *slot = require(name)?;
        }
        let [datetime, latitude, longitude, temperature, depth, qc_flag] = required;

        Ok(ColumnIndexes {
            datetime,
            latitude,
            longitude,
            temperature,
            depth,
            qc_flag,
            phase: find(columns::PHASE),
        })
    }

    fn push_row(
        samples: &mut SampleColumns,
        indexes: &ColumnIndexes,
        record: &StringRecord,
        line_index: usize,
    ) -> Result<(), ParserError> {
        let field = |index: usize| Self::field(record, index, line_index);

        samples
            .datetime
            .push(parse_timestamp(Self::NAME, field(indexes.datetime)?, line_index)?);
        samples.latitude.push(parse_optional_f64(
            Self::NAME,
            field(indexes.latitude)?,
            line_index,
            columns::LATITUDE,
        )?);
        samples.longitude.push(parse_optional_f64(
            Self::NAME,
            field(indexes.longitude)?,
            line_index,
            columns::LONGITUDE,
        )?);
        samples.temperature.push(parse_optional_f64(
            Self::NAME,
            field(indexes.temperature)?,
            line_index,
            columns::TEMPERATURE,
        )?);
        samples.depth.push(parse_optional_f64(
            Self::NAME,
            field(indexes.depth)?,
            line_index,
            columns::DEPTH,
        )?);
        samples.qc_flag.push(parse_required_i64(
            Self::NAME,
            field(indexes.qc_flag)?,
            line_index,
            columns::QC_FLAG,
        )?);
        if let Some(phase_index) = indexes.phase {
            let phase = field(phase_index)?.trim();
            samples
                .phase
                .push((!phase.is_empty()).then(|| phase.to_string()));
        }
        Ok(())
    }

    fn field(
        record: &StringRecord,
        index: usize,
        line_index: usize,
    ) -> Result<&str, ParserError> {
        record.get(index).ok_or_else(|| ParserError::DataRow {
            parser: Self::NAME,
            line_index,
            message: format!(
                "expected at least {} fields, found {}",
                index + 1,
                record.len()
            ),
        })
    }

    fn build_dataframe(samples: SampleColumns, with_phase: bool) -> Result<DataFrame, ParserError> {
        let datetime = Series::new(columns::DATETIME.into(), samples.datetime)
            .cast(&DataType::Datetime(
                TimeUnit::Microseconds,
                Some(TimeZone::UTC),
            ))
            .map_err(|err| ParserError::Validation {
                parser: Self::NAME,
                message: format!("failed to cast datetime column: {err}"),
            })?;

        let mut cols: Vec<Column> = vec![
            datetime.into(),
            Series::new(columns::LATITUDE.into(), samples.latitude).into(),
            Series::new(columns::LONGITUDE.into(), samples.longitude).into(),
            Series::new(columns::TEMPERATURE.into(), samples.temperature).into(),
            Series::new(columns::DEPTH.into(), samples.depth).into(),
            Series::new(columns::QC_FLAG.into(), samples.qc_flag).into(),
        ];
        if with_phase {
            cols.push(Series::new(columns::PHASE.into(), samples.phase).into());
        }

        DataFrame::new(cols).map_err(|err| ParserError::Validation {
            parser: Self::NAME,
            message: format!("failed to construct sample dataframe: {err}"),
        })
    }
}
