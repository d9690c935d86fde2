//! Object-created notifications delivered by the storage service.

use fishsoop_bucket::ObjectLocation;
use serde::Deserialize;

use crate::error::{JobError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct StorageEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<EventRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
    pub bucket: BucketEntity,
    pub object: ObjectEntity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BucketEntity {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectEntity {
    pub key: String,
}

impl StorageEvent {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|err| JobError::InvalidEvent(err.to_string()))
    }

    /// Location of the first record's object. Keys are used as delivered.
    pub fn object_location(&self) -> Result<ObjectLocation> {
        let record = self
            .records
            .first()
            .ok_or_else(|| JobError::InvalidEvent("event carries no records".into()))?;
        let S3Entity { bucket, object } = &record.s3;
        if bucket.name.is_empty() || object.key.is_empty() {
            return Err(JobError::InvalidEvent(
                "event record is missing a bucket name or object key".into(),
            ));
        }
        Ok(ObjectLocation::new(bucket.name.clone(), object.key.clone()))
    }
}
