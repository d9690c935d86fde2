mod common;

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use fishsoop_bucket::ObjectLocation;
use fishsoop_core::dispatch::{check_policy, handle_event, process_file, DispatchSkip, JobStatus};
use fishsoop_core::event::StorageEvent;
use fishsoop_core::ledger::Ledger;
use fishsoop_core::mailer::DisabledTransport;
use fishsoop_core::{JobContext, JobError};

use common::{
    context, qc_file, record, source_location, test_config, RecordingTransport, LEDGER_HEADER,
};

fn seed(store: &fishsoop_bucket::MemoryBucketStore, vessel_email: &str, good: usize) {
    store.insert(source_location(), qc_file(vessel_email, good), "text/csv");
    store.insert(
        ObjectLocation::new("fishsoop-email", "ledger.csv"),
        LEDGER_HEADER,
        "text/csv",
    );
}

#[test]
fn cutoff_is_inclusive() {
    let at_cutoff = record("a@x.com", 5);
    assert_eq!(
        check_policy(&at_cutoff, 5),
        Some(DispatchSkip::BelowCutoff {
            samples: 5,
            cutoff: 5
        })
    );
    assert_eq!(check_policy(&record("a@x.com", 6), 5), None);
}

#[test]
fn email_toggles_must_both_be_on() {
    let mut paused = record("a@x.com", 10);
    paused
        .attributes
        .insert("email_status".to_string(), "off".to_string());
    assert!(matches!(
        check_policy(&paused, 5),
        Some(DispatchSkip::EmailDisabled { .. })
    ));
}

#[tokio::test]
async fn fishsoop_record_is_emailed_to_valid_vessel_addresses() {
    let (ctx, store, transport) = context(test_config());
    seed(&store, "a@x.com, not-an-email, b@y.com", 10);
    let now = Utc.with_ymd_and_hms(2024, 1, 10, 10, 0, 0).unwrap();

    let report = process_file(&ctx, &source_location(), now).await.unwrap();

    assert_eq!(report.status, JobStatus::Success, "{report:?}");
    assert_eq!(report.samples, Some(10));
    assert_eq!(
        report.artifacts,
        vec![
            "MOANA_0028_15_240110093012_qc.csv",
            "MOANA_0028_15_240110093012_qc_plot.svg"
        ]
    );

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec!["a@x.com", "b@y.com"]);
    assert_eq!(sent[0].attachments.len(), 2);

    let csv = store
        .contents(&ObjectLocation::new(
            "fishsoop-email",
            "0028/MOANA_0028_15_240110093012_qc.csv",
        ))
        .unwrap();
    let csv = String::from_utf8(csv.to_vec()).unwrap();
    assert!(csv.starts_with("Moana serial number, 28\n"));
    assert!(csv.contains("Vessel Name, Southern Endeavour\n"));
    assert!(csv.contains("Moana calibration date, NA\n"));
    assert!(csv.contains("DATETIME [UTC],LATITUDE,LONGITUDE,TEMPERATURE [degC],DEPTH [m],QC_FLAG\n"));
    assert!(
        csv.contains("2024-01-10T07:00:00,-35.200000,150.900000,30.00,1.0,4"),
        "rejected rows stay in the CSV extract"
    );

    let entries = Ledger::new(&store, &ctx.config.notify.ledger)
        .entries()
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].recipients, "a@x.com, b@y.com");
}

#[tokio::test]
async fn record_at_cutoff_is_skipped_before_rendering() {
    let (ctx, store, transport) = context(test_config());
    seed(&store, "a@x.com", 5);

    let report = process_file(&ctx, &source_location(), Utc::now()).await.unwrap();

    assert_eq!(report.status, JobStatus::Skipped);
    assert_eq!(report.samples, Some(5));
    assert!(transport.sent().is_empty());
    assert!(store
        .contents(&ObjectLocation::new(
            "fishsoop-email",
            "0028/MOANA_0028_15_240110093012_qc_plot.svg"
        ))
        .is_none());
}

#[tokio::test]
async fn one_sample_above_cutoff_is_emailed() {
    let (ctx, store, transport) = context(test_config());
    seed(&store, "a@x.com", 6);

    let report = process_file(&ctx, &source_location(), Utc::now()).await.unwrap();

    assert_eq!(report.status, JobStatus::Success);
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test]
async fn plots_are_attached_only_when_enabled() {
    let mut config = test_config();
    config.notify.email_plot = false;
    let (ctx, store, transport) = context(config);
    seed(&store, "a@x.com", 8);

    process_file(&ctx, &source_location(), Utc::now()).await.unwrap();

    let sent = transport.sent();
    assert_eq!(sent[0].attachments.len(), 1);
    assert_eq!(
        sent[0].attachments[0].filename,
        "MOANA_0028_15_240110093012_qc.csv"
    );
}

#[tokio::test]
async fn unreadable_source_is_reported_as_failed() {
    let (ctx, _store, transport) = context(test_config());

    let report = process_file(&ctx, &source_location(), Utc::now()).await.unwrap();

    assert_eq!(report.status, JobStatus::Failed);
    assert!(report.reason.unwrap().contains("not found"));
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn event_without_records_is_invalid() {
    let (ctx, _store, _transport) = context(test_config());
    let event = StorageEvent::from_json(r#"{"Records": []}"#).unwrap();

    let result = handle_event(&ctx, &event, Utc::now()).await;

    assert!(matches!(result, Err(JobError::InvalidEvent(_))));
}

#[tokio::test]
async fn event_drives_the_whole_workflow() {
    let (ctx, store, transport) = context(test_config());
    seed(&store, "crew@vessel.example.com", 7);
    let event = StorageEvent::from_json(
        r#"{"Records":[{"s3":{"bucket":{"name":"fishsoop-moana-qc1"},"object":{"key":"0028/MOANA_0028_15_240110093012_qc.csv"}}}]}"#,
    )
    .unwrap();

    let report = handle_event(&ctx, &event, Utc::now()).await.unwrap();

    assert_eq!(report.status, JobStatus::Success);
    assert_eq!(transport.sent()[0].to, vec!["crew@vessel.example.com"]);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["status"], "success");
    assert_eq!(json["notification"]["outcome"], "sent");
}

struct BrokenRenderer;

impl fishsoop_core::render::ReportRenderer for BrokenRenderer {
    fn extension(&self) -> &'static str {
        "png"
    }

    fn content_type(&self) -> &'static str {
        "image/png"
    }

    fn render(
        &self,
        _record: &fishsoop_core::record::SensorRecord,
        _stats: &fishsoop_core::stats::PlotStatistics,
    ) -> fishsoop_core::Result<Vec<u8>> {
        Err(JobError::Render("no backend".into()))
    }
}

#[tokio::test]
async fn plot_failure_still_emails_the_extract() {
    let (ctx, store, transport) = context(test_config());
    let ctx = ctx.with_renderer(std::sync::Arc::new(BrokenRenderer));
    seed(&store, "a@x.com", 10);
    let now = Utc.with_ymd_and_hms(2024, 1, 10, 10, 0, 0).unwrap();

    let report = process_file(&ctx, &source_location(), now).await.unwrap();

    assert_eq!(report.status, JobStatus::Success, "{report:?}");
    assert_eq!(report.artifacts, vec!["MOANA_0028_15_240110093012_qc.csv"]);
    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].attachments.len(), 1);
    assert_eq!(sent[0].attachments[0].filename, "MOANA_0028_15_240110093012_qc.csv");
}

#[tokio::test]
async fn dry_run_writes_nothing_and_real_run_still_sends() {
    let (_, store, _) = context(test_config());
    seed(&store, "a@x.com", 10);
    let now = Utc.with_ymd_and_hms(2024, 1, 10, 10, 0, 0).unwrap();
    let extract = ObjectLocation::new("fishsoop-email", "0028/MOANA_0028_15_240110093012_qc.csv");
    let ledger_location = ObjectLocation::new("fishsoop-email", "ledger.csv");

    let dry = JobContext::new(test_config(), Arc::new(store.clone()), Arc::new(DisabledTransport))
        .with_dry_run();
    let report = process_file(&dry, &source_location(), now).await.unwrap();

    assert_eq!(report.status, JobStatus::Skipped, "{report:?}");
    let notification = report.notification.unwrap();
    assert_eq!(notification.outcome, "dry_run");
    assert_eq!(notification.recipients, vec!["a@x.com"]);
    assert!(store.contents(&extract).is_none(), "dry run artifacts stay staged");
    assert_eq!(
        store.contents(&ledger_location).unwrap(),
        LEDGER_HEADER.as_bytes()
    );

    let transport = RecordingTransport::default();
    let real = JobContext::new(test_config(), Arc::new(store.clone()), Arc::new(transport.clone()));
    let report = process_file(&real, &source_location(), now).await.unwrap();

    assert_eq!(report.status, JobStatus::Success, "{report:?}");
    assert_eq!(transport.sent().len(), 1);
    assert!(store.contents(&extract).is_some());
    let entries = Ledger::new(&store, &ledger_location).entries().await.unwrap();
    assert_eq!(entries.len(), 1);
}
