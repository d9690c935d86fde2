// crates/fishsoop-core/src/extractor.rs

use bytes::Bytes;
use chrono::DateTime;
use fishsoop_bucket::{BucketStore, ObjectLocation};
use fishsoop_parser::{columns, QcFileData};
use polars::prelude::*;
use tracing::{info, warn};

use crate::artifact::{content_type_for, ArtifactKind, ReportArtifact};
use crate::error::{JobError, Result};
use crate::record::{file_stem, serial_from_name, Sample, SensorRecord};

/// Preamble rows of the CSV extract, paired with the attribute each one reads.
const EXPORT_PREAMBLE: [&str; 10] = [
    "Moana serial number",
    "Download time",
    "Deck unit serial number",
    "Moana calibration date",
    "Moana Battery",
    "Date quality controlled",
    "Vessel Name",
    "Vessel ID",
    "Cellular upload position",
    "Deck unit battery voltage",
];

const QC_FLAG_KEY: &str = "QC_FLAG Key, 1=good 2=probably good 3=probably bad 4=bad";

const EXPORT_HEADER: [&str; 6] = [
    "DATETIME [UTC]",
    "LATITUDE",
    "LONGITUDE",
    "TEMPERATURE [degC]",
    "DEPTH [m]",
    "QC_FLAG",
];

#[derive(Debug, Clone)]
pub struct Extraction {
    pub record: SensorRecord,
    pub csv_extract: Option<ReportArtifact>,
    /// Rows in the source file before quality filtering.
    pub total_samples: usize,
}

pub struct DataExtractor<'a> {
    store: &'a dyn BucketStore,
    artifact_bucket: &'a str,
    accepted_flags: &'a [i64],
}

impl<'a> DataExtractor<'a> {
    pub fn new(store: &'a dyn BucketStore, artifact_bucket: &'a str, accepted_flags: &'a [i64]) -> Self {
        Self {
            store,
            artifact_bucket,
            accepted_flags,
        }
    }

    pub async fn extract(&self, source: &ObjectLocation, save_csv: bool) -> Result<Extraction> {
        let bytes = self.store.get_object(source).await?;
        let content = std::str::from_utf8(&bytes).map_err(|err| {
            JobError::Processing(format!("{source} is not valid UTF-8: {err}"))
        })?;
        let data = fishsoop_parser::parse_qc_file(content)?;
        let total_samples = data.samples.height();

        let csv_extract = if save_csv {
            Some(self.save_csv_extract(source, &data).await?)
        } else {
            None
        };

        let filtered = quality_filter(&data.samples, self.accepted_flags)?;
        let samples = samples_from_frame(&filtered)?;
        info!(
            %source,
            total = total_samples,
            kept = samples.len(),
            "extracted quality-controlled samples"
        );

        Ok(Extraction {
            record: SensorRecord {
                source: source.clone(),
                attributes: data.attributes,
                samples,
            },
            csv_extract,
            total_samples,
        })
    }

    async fn save_csv_extract(
        &self,
        source: &ObjectLocation,
        data: &QcFileData,
    ) -> Result<ReportArtifact> {
        let file_name = source.file_name();
        let serial = serial_from_name(file_name).ok_or_else(|| {
            JobError::Processing(format!("no MOANA serial number in file name {file_name}"))
        })?;
        let name = format!("{}.csv", file_stem(file_name));
        let location = ObjectLocation::new(self.artifact_bucket, format!("{serial}/{name}"));

        let body = render_csv_extract(data)?;
        self.store
            .put_object(&location, Bytes::from(body), content_type_for(&name))
            .await?;
        info!(%location, "saved CSV extract");

        Ok(ReportArtifact {
            kind: ArtifactKind::CsvExtract,
            name,
            location,
        })
    }
}

/// Keeps rows with an accepted quality flag and every numeric value present.
pub fn quality_filter(df: &DataFrame, accepted_flags: &[i64]) -> PolarsResult<DataFrame> {
    let qc = df.column(columns::QC_FLAG)?.i64()?;
    let latitude = df.column(columns::LATITUDE)?.f64()?;
    let longitude = df.column(columns::LONGITUDE)?.f64()?;
    let temperature = df.column(columns::TEMPERATURE)?.f64()?;
    let depth = df.column(columns::DEPTH)?.f64()?;

    let keep: Vec<bool> = (0..df.height())
        .map(|idx| {
            let accepted = qc
                .get(idx)
                .map(|flag| accepted_flags.contains(&flag))
                .unwrap_or(false);
            accepted
                && [&latitude, &longitude, &temperature, &depth]
                    .iter()
                    .all(|column| column.get(idx).map(|v| !v.is_nan()).unwrap_or(false))
        })
        .collect();

    let mask_series = Series::new("keep".into(), keep);
    let mask = mask_series.bool()?;
    df.filter(mask)
}

pub fn samples_from_frame(df: &DataFrame) -> Result<Vec<Sample>> {
    let datetime = df.column(columns::DATETIME)?.datetime()?;
    let latitude = df.column(columns::LATITUDE)?.f64()?;
    let longitude = df.column(columns::LONGITUDE)?.f64()?;
    let temperature = df.column(columns::TEMPERATURE)?.f64()?;
    let depth = df.column(columns::DEPTH)?.f64()?;
    let qc = df.column(columns::QC_FLAG)?.i64()?;
    let phase = match df.column(columns::PHASE) {
        Ok(column) => Some(column.str()?),
        Err(_) => None,
    };

    let mut samples = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let (Some(micros), Some(lat), Some(lon), Some(temp), Some(dep), Some(flag)) = (
            datetime.get(idx),
            latitude.get(idx),
            longitude.get(idx),
            temperature.get(idx),
            depth.get(idx),
            qc.get(idx),
        ) else {
            warn!(row = idx, "skipping incomplete sample");
            continue;
        };
        let time = DateTime::from_timestamp_micros(micros).ok_or_else(|| {
            JobError::Processing(format!("timestamp out of range in row {idx}"))
        })?;
        samples.push(Sample {
            time,
            latitude: lat,
            longitude: lon,
            temperature: temp,
            depth: dep,
            qc_flag: flag,
            phase: phase
                .and_then(|column| column.get(idx))
                .map(str::to_string),
        });
    }
    Ok(samples)
}

/// CSV extract of every row, good or bad, with the metadata preamble.
pub fn render_csv_extract(data: &QcFileData) -> Result<Vec<u8>> {
    let mut out = String::new();
    for label in EXPORT_PREAMBLE {
        let attribute = label.replace(' ', "_").to_lowercase();
        let value = data
            .attribute(&attribute)
            .filter(|value| !value.is_empty())
            .unwrap_or("NA");
        out.push_str(&format!("{label}, {value}\n"));
    }
    out.push_str(QC_FLAG_KEY);
    out.push_str("\n\n");

    let df = &data.samples;
    let datetime = df.column(columns::DATETIME)?.datetime()?;
    let latitude = df.column(columns::LATITUDE)?.f64()?;
    let longitude = df.column(columns::LONGITUDE)?.f64()?;
    let temperature = df.column(columns::TEMPERATURE)?.f64()?;
    let depth = df.column(columns::DEPTH)?.f64()?;
    let qc = df.column(columns::QC_FLAG)?.i64()?;

    let mut writer = csv::Writer::from_writer(out.into_bytes());
    writer.write_record(EXPORT_HEADER)?;
    for idx in 0..df.height() {
        let time = datetime
            .get(idx)
            .and_then(DateTime::from_timestamp_micros)
            .map(|t| t.format("%Y-%m-%dT%H:%M:%S").to_string())
            .unwrap_or_default();
        writer.write_record([
            time,
            fixed(latitude.get(idx), 6),
            fixed(longitude.get(idx), 6),
            fixed(temperature.get(idx), 2),
            fixed(depth.get(idx), 1),
            qc.get(idx).map(|flag| flag.to_string()).unwrap_or_default(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|err| JobError::Processing(format!("failed to finish CSV extract: {err}")))
}

fn fixed(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) if !v.is_nan() => format!("{v:.precision$}"),
        _ => String::new(),
    }
}
