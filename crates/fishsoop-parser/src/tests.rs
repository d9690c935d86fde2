use std::fs;
use std::path::PathBuf;

use crate::errors::ParserError;
use crate::model::columns;
use crate::{parse_deck_unit_status, parse_qc_file};

fn fixture(path: &str) -> String {
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let full_path = base.join("tests/data").join(path);
    fs::read_to_string(&full_path)
        .unwrap_or_else(|err| panic!("failed to read fixture {}: {}", full_path.display(), err))
}

#[test]
fn parses_qc_export_attributes_and_samples() {
    let content = fixture("MOANA_0028_15_240110093012_qc.csv");
    let parsed = parse_qc_file(&content).expect("qc export parse failed");

    assert_eq!(parsed.attribute("programme_name"), Some("Fish-Soop"));
    assert_eq!(parsed.attribute("vessel_name"), Some("Southern Endeavour"));
    assert_eq!(
        parsed.attribute("vessel_email"),
        Some("skipper@endeavour.example.com, not-an-email, ops@endeavour.example.com")
    );
    assert_eq!(parsed.samples.height(), 7);
    assert!(parsed.samples.column(columns::PHASE).is_ok());

    let names: Vec<&str> = parsed
        .samples
        .get_column_names()
        .iter()
        .map(|name| name.as_str())
        .collect();
    assert_eq!(&names[..6], &columns::REQUIRED);

    let temperature = parsed.samples.column(columns::TEMPERATURE).unwrap().f64().unwrap();
    assert_eq!(temperature.get(0), Some(17.82));
    assert_eq!(temperature.get(5), None);

    let flags = parsed.samples.column(columns::QC_FLAG).unwrap().i64().unwrap();
    assert_eq!(flags.get(0), Some(4));
    assert_eq!(flags.get(3), Some(2));
}

#[test]
fn qc_export_without_phase_column_is_accepted() {
    let content = "vessel_name,Kestrel\n\nDATETIME,LATITUDE,LONGITUDE,TEMPERATURE,DEPTH,QC_FLAG\n2024-02-01T00:00:00Z,-40.0,170.0,12.0,10.0,1.0\n";
    let parsed = parse_qc_file(content).expect("parse without phase");
    assert!(parsed.samples.column(columns::PHASE).is_err());
    assert_eq!(parsed.samples.height(), 1);
}

#[test]
fn qc_export_requires_attribute_terminator() {
    let content = "vessel_name,Kestrel\nDATETIME,LATITUDE\n";
    let err = parse_qc_file(content).expect_err("missing blank line must fail");
    assert!(matches!(err, ParserError::FormatMismatch { .. }));
}

#[test]
fn qc_export_reports_missing_columns() {
    let content = "vessel_name,Kestrel\n\nDATETIME,LATITUDE,LONGITUDE,TEMPERATURE,QC_FLAG\n";
    let err = parse_qc_file(content).expect_err("missing depth column must fail");
    match err {
        ParserError::FormatMismatch { reason, .. } => assert!(reason.contains("DEPTH")),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn qc_export_rejects_bad_timestamp_with_line_number() {
    let content = "vessel_name,Kestrel\n\nDATETIME,LATITUDE,LONGITUDE,TEMPERATURE,DEPTH,QC_FLAG\nyesterday,-40.0,170.0,12.0,10.0,1\n";
    let err = parse_qc_file(content).expect_err("bad timestamp must fail");
    match err {
        ParserError::DataRow { line_index, .. } => assert_eq!(line_index, 4),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn qc_export_without_rows_is_empty() {
    let content = "vessel_name,Kestrel\n\nDATETIME,LATITUDE,LONGITUDE,TEMPERATURE,DEPTH,QC_FLAG\n";
    let err = parse_qc_file(content).expect_err("empty table must fail");
    assert!(matches!(err, ParserError::EmptyData { .. }));
}

#[test]
fn parses_deck_unit_status() {
    let content = fixture("du_status_0102.csv");
    let status = parse_deck_unit_status(&content).expect("deck unit parse failed");
    assert_eq!(status.battery_percent, 73.5);
    assert_eq!(
        status.upload_time.format("%d %b %Y").to_string(),
        "10 Jan 2024"
    );
}

#[test]
fn deck_unit_status_requires_upload_time() {
    let err = parse_deck_unit_status("Deck unit battery percent,90\n")
        .expect_err("missing upload time must fail");
    assert!(matches!(err, ParserError::Validation { .. }));
}
