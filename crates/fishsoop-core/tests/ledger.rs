mod common;

use chrono::{TimeZone, Utc};
use fishsoop_bucket::{MemoryBucketStore, ObjectLocation};
use fishsoop_core::ledger::{parse_ledger, Ledger, LedgerEntry};
use fishsoop_core::NotifyError;

use common::LEDGER_HEADER;

fn location() -> ObjectLocation {
    ObjectLocation::new("fishsoop-email", "fishsoop_emails_sent.csv")
}

fn entry(attachments: &[&str], plots: &[&str]) -> LedgerEntry {
    let owned = |values: &[&str]| values.iter().map(|v| v.to_string()).collect::<Vec<_>>();
    LedgerEntry::new(
        Utc.with_ymd_and_hms(2024, 1, 10, 9, 45, 0).unwrap(),
        &owned(&["a@x.com", "b@y.com"]),
        &owned(attachments),
        &owned(plots),
        &owned(&["fishsoop@unsw.edu.au"]),
        "fishsoop@unsw.edu.au",
        &owned(&["fishsoop@unsw.edu.au"]),
    )
}

#[tokio::test]
async fn create_writes_header_only_ledger() {
    let store = MemoryBucketStore::new();
    let location = location();
    Ledger::new(&store, &location).create().await.unwrap();

    let contents = store.contents(&location).unwrap();
    assert_eq!(contents, LEDGER_HEADER);
    assert!(Ledger::new(&store, &location).entries().await.unwrap().is_empty());
}

#[tokio::test]
async fn create_refuses_to_overwrite_history() {
    let store = MemoryBucketStore::new();
    let location = location();
    let history = format!("{LEDGER_HEADER}2024-01-01 00:00:00 UTC,a@x.com,old.csv,,,,\n");
    store.insert(location.clone(), history.clone(), "text/csv");

    let result = Ledger::new(&store, &location).create().await;

    assert!(matches!(result, Err(NotifyError::LedgerCreateConflict(_))));
    assert_eq!(store.contents(&location).unwrap(), history.as_str());
}

#[tokio::test]
async fn append_preserves_existing_rows() {
    let store = MemoryBucketStore::new();
    let location = location();
    let ledger = Ledger::new(&store, &location);
    ledger.create().await.unwrap();

    ledger
        .append(&entry(&["MOANA_0028_15_qc.csv"], &["MOANA_0028_15_qc_plot.svg"]))
        .await
        .unwrap();
    ledger.append(&entry(&["MOANA_0031_2_qc.csv"], &[])).await.unwrap();

    let entries = ledger.entries().await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].datetime, "2024-01-10 09:45:00 UTC");
    assert_eq!(entries[0].recipients, "a@x.com, b@y.com");
    assert_eq!(entries[0].plots, "MOANA_0028_15_qc_plot.svg");
    assert_eq!(entries[1].attachments, "MOANA_0031_2_qc.csv");

    let raw = String::from_utf8(store.contents(&location).unwrap().to_vec()).unwrap();
    assert!(raw.starts_with(LEDGER_HEADER));
    assert_eq!(raw.lines().count(), 3);
}

#[tokio::test]
async fn duplicates_match_either_column_and_multi_valued_cells() {
    let store = MemoryBucketStore::new();
    let location = location();
    let history = format!(
        "{LEDGER_HEADER}2024-01-01 00:00:00 UTC,a@x.com,\"first.csv, second.csv\",old_plot.svg,,,\n"
    );
    store.insert(location.clone(), history, "text/csv");
    let ledger = Ledger::new(&store, &location);

    let candidates = vec![
        "second.csv".to_string(),
        "old_plot.svg".to_string(),
        "fresh.csv".to_string(),
    ];
    let duplicates = ledger.find_duplicates(&candidates).await.unwrap();

    assert_eq!(duplicates, vec!["second.csv", "old_plot.svg"]);
    assert!(ledger
        .find_duplicates(&["fresh.csv".to_string()])
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn missing_ledger_is_a_read_failure() {
    let store = MemoryBucketStore::new();
    let location = location();
    let result = Ledger::new(&store, &location)
        .find_duplicates(&["fresh.csv".to_string()])
        .await;
    assert!(matches!(result, Err(NotifyError::LedgerRead { .. })));
}

#[test]
fn index_prefixed_rows_are_accepted() {
    let raw = format!(
        "{LEDGER_HEADER}0,2024-01-01 00:00:00 UTC,a@x.com,old.csv,old_plot.svg,fishsoop@unsw.edu.au,fishsoop@unsw.edu.au,['fishsoop@unsw.edu.au']\n"
    );
    let entries = parse_ledger(raw.as_bytes()).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].attachments, "old.csv");
    assert_eq!(entries[0].plots, "old_plot.svg");
    assert_eq!(entries[0].reply_to, "['fishsoop@unsw.edu.au']");
}
