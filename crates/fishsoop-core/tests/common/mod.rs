#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use fishsoop_bucket::{MemoryBucketStore, ObjectLocation};
use fishsoop_core::mailer::{MailTransport, OutboundMessage, TransportError};
use fishsoop_core::record::{Sample, SensorRecord};
use fishsoop_core::{FishsoopConfig, JobContext};

pub const LEDGER_HEADER: &str = "Datetime,Recipients,Attachments,Plots,BCC,From,Replyto\n";

/// Captures outgoing mail instead of delivering it.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
    fail: bool,
}

impl RecordingTransport {
    pub fn failing() -> Self {
        Self {
            sent: Arc::default(),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        if self.fail {
            return Err(TransportError::Smtp("connection refused".into()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

pub fn sample(minutes: i64, temperature: f64, depth: f64, phase: Option<&str>) -> Sample {
    let start = Utc.with_ymd_and_hms(2024, 1, 10, 6, 0, 0).unwrap();
    Sample {
        time: start + Duration::minutes(minutes),
        latitude: -35.1,
        longitude: 150.8,
        temperature,
        depth,
        qc_flag: 1,
        phase: phase.map(str::to_string),
    }
}

pub fn fishsoop_attributes(vessel_email: &str) -> BTreeMap<String, String> {
    [
        ("programme_name", "Fish-Soop"),
        ("vessel_name", "Southern Endeavour"),
        ("vessel_id", "FV-0421"),
        ("vessel_email", vessel_email),
        ("moana_serial_number", "28"),
        ("email_frequency", "nrt"),
        ("email_status", "on"),
        ("raw_data_filename", "MOANA_0028_15_240110093012.csv"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

pub fn source_location() -> ObjectLocation {
    ObjectLocation::new("fishsoop-moana-qc1", "0028/MOANA_0028_15_240110093012_qc.csv")
}

pub fn record(vessel_email: &str, samples: usize) -> SensorRecord {
    SensorRecord {
        source: source_location(),
        attributes: fishsoop_attributes(vessel_email),
        samples: (0..samples)
            .map(|idx| sample(5 * idx as i64, 14.0 + idx as f64 * 0.1, 10.0 + idx as f64, Some("D")))
            .collect(),
    }
}

/// Quality-controlled export with `good` accepted rows followed by one rejected row.
pub fn qc_file(vessel_email: &str, good: usize) -> String {
    let mut content = String::new();
    for (name, value) in fishsoop_attributes(vessel_email) {
        content.push_str(&format!("{name},\"{value}\"\n"));
    }
    content.push('\n');
    content.push_str("DATETIME,LATITUDE,LONGITUDE,TEMPERATURE,DEPTH,QC_FLAG,PHASE\n");
    for idx in 0..good {
        content.push_str(&format!(
            "2024-01-10T06:{:02}:00,-35.10{idx},150.81{idx},{:.2},{:.1},1,D\n",
            idx * 5,
            15.0 + idx as f64 * 0.25,
            20.0 + idx as f64 * 2.0
        ));
    }
    content.push_str("2024-01-10T07:00:00,-35.2,150.9,30.00,1.0,4,U\n");
    content
}

pub fn test_config() -> FishsoopConfig {
    let mut config = FishsoopConfig::default();
    config.notify.ledger = ObjectLocation::new("fishsoop-email", "ledger.csv");
    config
}

pub fn context(config: FishsoopConfig) -> (JobContext, MemoryBucketStore, RecordingTransport) {
    let store = MemoryBucketStore::new();
    let transport = RecordingTransport::default();
    let ctx = JobContext::new(config, Arc::new(store.clone()), Arc::new(transport.clone()));
    (ctx, store, transport)
}
