use std::fmt;
use std::str::FromStr;

use crate::BucketError;

/// A bucket/key pair, written as `s3://bucket/key` in configuration and logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Last path segment of the key.
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

impl FromStr for ObjectLocation {
    type Err = BucketError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let rest = trimmed
            .strip_prefix("s3://")
            .ok_or_else(|| BucketError::InvalidLocation(trimmed.to_string()))?;
        let (bucket, key) = rest
            .split_once('/')
            .ok_or_else(|| BucketError::InvalidLocation(trimmed.to_string()))?;
        if bucket.is_empty() || key.is_empty() {
            return Err(BucketError::InvalidLocation(trimmed.to_string()));
        }
        Ok(Self::new(bucket, key))
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

impl<'de> serde::Deserialize<'de> for ObjectLocation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl serde::Serialize for ObjectLocation {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_s3_urls() {
        let location: ObjectLocation = "s3://fishsoop-email/fishsoop_emails_sent.csv"
            .parse()
            .unwrap();
        assert_eq!(location.bucket, "fishsoop-email");
        assert_eq!(location.key, "fishsoop_emails_sent.csv");
        assert_eq!(
            location.to_string(),
            "s3://fishsoop-email/fishsoop_emails_sent.csv"
        );
    }

    #[test]
    fn keeps_nested_keys_intact() {
        let location: ObjectLocation = "s3://fishsoop-moana-qc1/0028/MOANA_0028_15_240110093012_qc.csv"
            .parse()
            .unwrap();
        assert_eq!(location.key, "0028/MOANA_0028_15_240110093012_qc.csv");
        assert_eq!(location.file_name(), "MOANA_0028_15_240110093012_qc.csv");
    }

    #[test]
    fn rejects_locations_without_a_key() {
        for raw in ["fishsoop-email/a.csv", "s3://fishsoop-email", "s3://fishsoop-email/", "s3:///a.csv"] {
            assert!(raw.parse::<ObjectLocation>().is_err(), "{raw} should be rejected");
        }
    }
}
