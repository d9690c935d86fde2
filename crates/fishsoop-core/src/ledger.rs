// crates/fishsoop-core/src/ledger.rs

use bytes::Bytes;
use chrono::{DateTime, Utc};
use fishsoop_bucket::{BucketError, BucketStore, ObjectLocation};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::NotifyError;

pub const LEDGER_COLUMNS: [&str; 7] = [
    "Datetime",
    "Recipients",
    "Attachments",
    "Plots",
    "BCC",
    "From",
    "Replyto",
];

const LEDGER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";
const LIST_SEPARATOR: &str = ", ";

/// One successful send. Multi-valued cells are joined with `", "`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    #[serde(rename = "Datetime")]
    pub datetime: String,
    #[serde(rename = "Recipients")]
    pub recipients: String,
    #[serde(rename = "Attachments")]
    pub attachments: String,
    #[serde(rename = "Plots")]
    pub plots: String,
    #[serde(rename = "BCC")]
    pub bcc: String,
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "Replyto")]
    pub reply_to: String,
}

impl LedgerEntry {
    pub fn new(
        sent_at: DateTime<Utc>,
        recipients: &[String],
        attachments: &[String],
        plots: &[String],
        bcc: &[String],
        from: &str,
        reply_to: &[String],
    ) -> Self {
        Self {
            datetime: sent_at.format(LEDGER_TIME_FORMAT).to_string(),
            recipients: recipients.join(LIST_SEPARATOR),
            attachments: attachments.join(LIST_SEPARATOR),
            plots: plots.join(LIST_SEPARATOR),
            bcc: bcc.join(LIST_SEPARATOR),
            from: from.to_string(),
            reply_to: reply_to.join(LIST_SEPARATOR),
        }
    }

    /// Every artifact identifier this entry records as sent.
    pub fn sent_identifiers(&self) -> impl Iterator<Item = &str> {
        split_cell(&self.attachments).chain(split_cell(&self.plots))
    }
}

fn split_cell(cell: &str) -> impl Iterator<Item = &str> {
    cell.split(',').map(str::trim).filter(|value| !value.is_empty())
}

/// Parses ledger CSV. Rows written with a leading index column are accepted.
pub fn parse_ledger(content: &[u8]) -> Result<Vec<LedgerEntry>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content);
    let headers = reader.headers()?.clone();

    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record?;
        let record = if record.len() == headers.len() + 1 {
            record.iter().skip(1).collect::<csv::StringRecord>()
        } else {
            record
        };
        entries.push(record.deserialize(Some(&headers))?);
    }
    Ok(entries)
}

/// Send history stored as CSV at a single object location.
pub struct Ledger<'a> {
    store: &'a dyn BucketStore,
    location: &'a ObjectLocation,
}

impl<'a> Ledger<'a> {
    pub fn new(store: &'a dyn BucketStore, location: &'a ObjectLocation) -> Self {
        Self { store, location }
    }

    pub fn location(&self) -> &ObjectLocation {
        self.location
    }

    /// Writes a header-only ledger. Never overwrites existing history.
    pub async fn create(&self) -> Result<(), NotifyError> {
        let exists = self
            .store
            .exists(self.location)
            .await
            .map_err(|err| self.write_error(err))?;
        if exists {
            warn!(ledger = %self.location, "refusing to create ledger over existing object");
            return Err(NotifyError::LedgerCreateConflict(self.location.clone()));
        }

        let header = format!("{}\n", LEDGER_COLUMNS.join(","));
        self.store
            .put_object(self.location, Bytes::from(header), "text/csv")
            .await
            .map_err(|err| self.write_error(err))?;
        info!(ledger = %self.location, "created empty ledger");
        Ok(())
    }

    pub async fn entries(&self) -> Result<Vec<LedgerEntry>, NotifyError> {
        let bytes = self
            .store
            .get_object(self.location)
            .await
            .map_err(|err| self.read_error(err))?;
        parse_ledger(&bytes).map_err(|err| self.read_error(err))
    }

    /// Candidates already recorded in any entry's Attachments or Plots column.
    pub async fn find_duplicates(&self, candidates: &[String]) -> Result<Vec<String>, NotifyError> {
        let entries = self.entries().await?;
        Ok(candidates
            .iter()
            .filter(|candidate| {
                entries
                    .iter()
                    .any(|entry| entry.sent_identifiers().any(|sent| sent == candidate.as_str()))
            })
            .cloned()
            .collect())
    }

    /// Appends one row, keeping the existing content byte-for-byte.
    pub async fn append(&self, entry: &LedgerEntry) -> Result<(), NotifyError> {
        let mut content = match self.store.get_object(self.location).await {
            Ok(bytes) => bytes.to_vec(),
            Err(BucketError::NotFound(_)) => format!("{}\n", LEDGER_COLUMNS.join(",")).into_bytes(),
            Err(err) => return Err(self.write_error(err)),
        };
        if !content.is_empty() && !content.ends_with(b"\n") {
            content.push(b'\n');
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(content);
        writer.serialize(entry).map_err(|err| self.write_error(err))?;
        let content = writer
            .into_inner()
            .map_err(|err| self.write_error(err))?;

        self.store
            .put_object(self.location, Bytes::from(content), "text/csv")
            .await
            .map_err(|err| self.write_error(err))
    }

    fn read_error(&self, err: impl std::fmt::Display) -> NotifyError {
        NotifyError::LedgerRead {
            location: self.location.clone(),
            message: err.to_string(),
        }
    }

    fn write_error(&self, err: impl std::fmt::Display) -> NotifyError {
        NotifyError::LedgerWrite {
            location: self.location.clone(),
            message: err.to_string(),
        }
    }
}
