// crates/fishsoop-core/src/render.rs

use std::fmt::Write;

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use fishsoop_bucket::{BucketStore, ObjectLocation};
use tracing::info;

use crate::artifact::{ArtifactKind, ReportArtifact};
use crate::error::{JobError, Result};
use crate::record::{Programme, SensorRecord};
use crate::stats::{nan_max, nan_min, PlotStatistics};
use crate::templates::escape;

/// Turns a record into a figure. Implementations only produce bytes; storage is handled by
/// [`publish_report`].
pub trait ReportRenderer: Send + Sync {
    fn extension(&self) -> &'static str;
    fn content_type(&self) -> &'static str;
    fn render(&self, record: &SensorRecord, stats: &PlotStatistics) -> Result<Vec<u8>>;
}

/// Renders the record and uploads it as `{artifact_bucket}/{serial}/{stem}_plot.{ext}`.
pub async fn publish_report(
    store: &dyn BucketStore,
    renderer: &dyn ReportRenderer,
    artifact_bucket: &str,
    record: &SensorRecord,
) -> Result<ReportArtifact> {
    let serial = record.serial_number().ok_or_else(|| {
        JobError::Render(format!(
            "no MOANA serial number in file name {}",
            record.source.file_name()
        ))
    })?;
    let stats = PlotStatistics::from_samples(&record.samples)
        .ok_or_else(|| JobError::Render("record has no plottable samples".into()))?;

    let body = renderer.render(record, &stats)?;
    let name = format!("{}_plot.{}", record.stem(), renderer.extension());
    let location = ObjectLocation::new(artifact_bucket, format!("{serial}/{name}"));
    store
        .put_object(&location, Bytes::from(body), renderer.content_type())
        .await?;
    info!(%location, "uploaded plot");

    Ok(ReportArtifact {
        kind: ArtifactKind::Plot,
        name,
        location,
    })
}

/// Colour scale bounds; a flat series is widened by one degree either side.
pub fn colour_range(temperatures: &[f64]) -> Option<(f64, f64)> {
    let min = nan_min(temperatures)?;
    let max = nan_max(temperatures)?;
    if min == max {
        Some((min - 1.0, max + 1.0))
    } else {
        Some((min, max))
    }
}

pub fn plot_title(programme: &Programme, serial: &str) -> String {
    let sensor = match programme {
        Programme::FishSoop => "Moana",
        Programme::Other => "Mangopare",
    };
    format!("{sensor} Sensor Measurements, SN #{serial}")
}

// Thermal palette stops, cold to warm.
const PALETTE: [(u8, u8, u8); 6] = [
    (4, 35, 51),
    (44, 56, 139),
    (120, 72, 140),
    (190, 90, 96),
    (240, 143, 44),
    (232, 250, 91),
];

fn palette_colour(fraction: f64) -> String {
    let t = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
    let scaled = t * (PALETTE.len() - 1) as f64;
    let lower = (scaled.floor() as usize).min(PALETTE.len() - 2);
    let local = scaled - lower as f64;
    let (r0, g0, b0) = PALETTE[lower];
    let (r1, g1, b1) = PALETTE[lower + 1];
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * local).round() as u8;
    format!("#{:02x}{:02x}{:02x}", mix(r0, r1), mix(g0, g1), mix(b0, b1))
}

/// Depth-time scatter coloured by temperature, with a position inset and statistics caption.
#[derive(Debug, Clone)]
pub struct SvgReportRenderer {
    pub width: f64,
    pub height: f64,
}

impl Default for SvgReportRenderer {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 480.0,
        }
    }
}

struct Frame {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

impl Frame {
    fn x(&self, fraction: f64) -> f64 {
        self.left + fraction * self.width
    }

    fn y(&self, fraction: f64) -> f64 {
        self.top + fraction * self.height
    }
}

impl ReportRenderer for SvgReportRenderer {
    fn extension(&self) -> &'static str {
        "svg"
    }

    fn content_type(&self) -> &'static str {
        "image/svg+xml"
    }

    fn render(&self, record: &SensorRecord, stats: &PlotStatistics) -> Result<Vec<u8>> {
        let samples = &record.samples;
        let temperatures: Vec<f64> = samples.iter().map(|s| s.temperature).collect();
        let depths: Vec<f64> = samples.iter().map(|s| s.depth).collect();
        let (vmin, vmax) = colour_range(&temperatures)
            .ok_or_else(|| JobError::Render("no temperatures to colour".into()))?;
        let depth_limit = nan_max(&depths).unwrap_or(0.0) + 5.0;

        // 10% padding either side of the deployment
        let span = (stats.time_max - stats.time_min).max(Duration::minutes(1));
        let pad = span / 10;
        let t0 = stats.time_min - pad;
        let t1 = stats.time_max + pad;
        let t_span = (t1 - t0).num_milliseconds() as f64;
        let time_fraction = |t: DateTime<Utc>| (t - t0).num_milliseconds() as f64 / t_span;

        let main = Frame {
            left: 70.0,
            top: 50.0,
            width: self.width * 0.58,
            height: self.height - 150.0,
        };
        let inset = Frame {
            left: main.left + main.width + 90.0,
            top: 50.0,
            width: self.width - (main.left + main.width + 90.0) - 30.0,
            height: self.height - 150.0,
        };

        let serial = record.serial_number().unwrap_or("unknown");
        let title = plot_title(&record.programme(), serial);

        let mut svg = String::new();
        let fmt_err = |_| JobError::Render("failed to write SVG".into());
        writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif" font-size="12">"#,
            w = self.width,
            h = self.height
        )
        .map_err(fmt_err)?;
        writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#).map_err(fmt_err)?;
        writeln!(
            svg,
            r#"<text x="{}" y="28" font-size="16" font-weight="bold">{}</text>"#,
            main.left,
            escape(&title)
        )
        .map_err(fmt_err)?;

        // main panel
        writeln!(
            svg,
            r##"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="none" stroke="#333"/>"##,
            main.left, main.top, main.width, main.height
        )
        .map_err(fmt_err)?;
        for tick in 0..=4 {
            let fraction = tick as f64 / 4.0;
            let depth = depth_limit * fraction;
            writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" text-anchor="end">{:.0}</text>"#,
                main.left - 6.0,
                main.y(fraction) + 4.0,
                depth
            )
            .map_err(fmt_err)?;
            let ticks_ms = (t_span * fraction) as i64;
            let at = t0 + Duration::milliseconds(ticks_ms);
            writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="10">{}</text>"#,
                main.x(fraction),
                main.top + main.height + 16.0,
                at.format("%d-%m-%y:%H:%M")
            )
            .map_err(fmt_err)?;
        }
        writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">Date (d-m-y:H:M UTC)</text>"#,
            main.x(0.5),
            main.top + main.height + 34.0
        )
        .map_err(fmt_err)?;
        writeln!(
            svg,
            r#"<text transform="translate(22,{:.1}) rotate(-90)" text-anchor="middle">Depth (m)</text>"#,
            main.y(0.5)
        )
        .map_err(fmt_err)?;

        for sample in samples {
            let colour = palette_colour((sample.temperature - vmin) / (vmax - vmin));
            writeln!(
                svg,
                r#"<circle cx="{:.1}" cy="{:.1}" r="3" fill="{}"/>"#,
                main.x(time_fraction(sample.time)),
                main.y(sample.depth / depth_limit),
                colour
            )
            .map_err(fmt_err)?;
        }

        // colour bar
        let bar_x = main.left + main.width + 12.0;
        for step in 0..20 {
            let fraction = step as f64 / 20.0;
            writeln!(
                svg,
                r#"<rect x="{:.1}" y="{:.1}" width="14" height="{:.2}" fill="{}"/>"#,
                bar_x,
                main.y(1.0 - fraction - 0.05),
                main.height / 20.0 + 0.5,
                palette_colour(fraction + 0.025)
            )
            .map_err(fmt_err)?;
        }
        writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-size="10">{:.1}</text><text x="{:.1}" y="{:.1}" font-size="10">{:.1}</text>"#,
            bar_x + 18.0,
            main.top + 8.0,
            vmax,
            bar_x + 18.0,
            main.top + main.height,
            vmin
        )
        .map_err(fmt_err)?;
        writeln!(
            svg,
            r#"<text transform="translate({:.1},{:.1}) rotate(90)" text-anchor="middle">Temperature (&#176;C)</text>"#,
            bar_x + 56.0,
            main.y(0.5)
        )
        .map_err(fmt_err)?;

        // position inset
        let longitudes: Vec<f64> = samples.iter().map(|s| s.longitude.rem_euclid(360.0)).collect();
        let latitudes: Vec<f64> = samples.iter().map(|s| s.latitude).collect();
        let grid = 0.1;
        let lon0 = nan_min(&longitudes).unwrap_or(0.0) - grid;
        let lon1 = nan_max(&longitudes).unwrap_or(0.0) + grid;
        let lat0 = nan_min(&latitudes).unwrap_or(0.0) - grid;
        let lat1 = nan_max(&latitudes).unwrap_or(0.0) + grid;
        writeln!(
            svg,
            r##"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="#eef4f8" stroke="#333"/>"##,
            inset.left, inset.top, inset.width, inset.height
        )
        .map_err(fmt_err)?;
        for (lon, lat) in longitudes.iter().zip(&latitudes) {
            writeln!(
                svg,
                r##"<circle cx="{:.1}" cy="{:.1}" r="2" fill="#c0392b"/>"##,
                inset.x((lon - lon0) / (lon1 - lon0)),
                inset.y((lat1 - lat) / (lat1 - lat0))
            )
            .map_err(fmt_err)?;
        }
        writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="10">{:.2}&#176;E to {:.2}&#176;E, {:.2}&#176; to {:.2}&#176;</text>"#,
            inset.x(0.5),
            inset.top + inset.height + 16.0,
            lon0,
            lon1,
            lat0,
            lat1
        )
        .map_err(fmt_err)?;

        // caption
        let caption = [
            format!("Average fishing depth: {:.1} m", stats.mean_depth),
            format!("Average fishing temperature: {:.2} &#176;C", stats.mean_temp),
            format!("Min fishing temperature: {:.2} &#176;C", stats.min_temp),
            format!("Max fishing temperature: {:.2} &#176;C", stats.max_temp),
            format!("Data filename: {}", escape(record.source.file_name())),
        ];
        for (line, text) in caption.iter().enumerate() {
            writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" font-size="11">{}</text>"#,
                inset.left,
                self.height - 78.0 + line as f64 * 14.0,
                text
            )
            .map_err(fmt_err)?;
        }
        svg.push_str("</svg>\n");

        Ok(svg.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::TimeZone;

    use super::*;
    use crate::record::Sample;

    fn record(programme: &str, temperatures: &[f64]) -> SensorRecord {
        let start = Utc.with_ymd_and_hms(2024, 1, 10, 6, 0, 0).unwrap();
        let samples = temperatures
            .iter()
            .enumerate()
            .map(|(idx, &temperature)| Sample {
                time: start + Duration::minutes(5 * idx as i64),
                latitude: -35.1,
                longitude: 150.8,
                temperature,
                depth: 10.0 * idx as f64,
                qc_flag: 1,
                phase: Some("D".into()),
            })
            .collect();
        let mut attributes = BTreeMap::new();
        attributes.insert("programme_name".to_string(), programme.to_string());
        SensorRecord {
            source: ObjectLocation::new("qc", "0028/MOANA_0028_15_240110093012_qc.nc"),
            attributes,
            samples,
        }
    }

    #[test]
    fn flat_series_widens_colour_range() {
        assert_eq!(colour_range(&[12.0, 12.0]), Some((11.0, 13.0)));
        assert_eq!(colour_range(&[12.0, f64::NAN, 14.5]), Some((12.0, 14.5)));
        assert_eq!(colour_range(&[]), None);
    }

    #[test]
    fn svg_carries_title_points_and_caption() {
        let record = record("Fish-Soop", &[14.0, 13.5, 12.75]);
        let stats = PlotStatistics::from_samples(&record.samples).unwrap();
        let svg = SvgReportRenderer::default().render(&record, &stats).unwrap();
        let svg = String::from_utf8(svg).unwrap();

        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Moana Sensor Measurements, SN #0028"));
        assert!(svg.contains("Data filename: MOANA_0028_15_240110093012_qc.nc"));
        assert!(svg.contains("Average fishing temperature: 13.42"));
        assert_eq!(svg.matches(r#"r="3""#).count(), 3);
    }

    #[test]
    fn caption_escapes_file_name() {
        let mut record = record("Fish-Soop", &[14.0, 13.5]);
        record.source = ObjectLocation::new("qc", "0028/MOANA_0028_15_240110093012_<A&B>.nc");
        let stats = PlotStatistics::from_samples(&record.samples).unwrap();
        let svg = SvgReportRenderer::default().render(&record, &stats).unwrap();
        let svg = String::from_utf8(svg).unwrap();

        assert!(svg.contains("Data filename: MOANA_0028_15_240110093012_&lt;A&amp;B&gt;.nc"));
        assert!(!svg.contains("<A&B>"));
    }

    #[test]
    fn non_fishsoop_records_use_mangopare_title() {
        let record = record("Mangopare", &[14.0]);
        let stats = PlotStatistics::from_samples(&record.samples).unwrap();
        let svg = SvgReportRenderer::default().render(&record, &stats).unwrap();
        assert!(String::from_utf8(svg)
            .unwrap()
            .contains("Mangopare Sensor Measurements, SN #0028"));
    }
}
