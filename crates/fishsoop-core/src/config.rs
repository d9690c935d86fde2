// crates/fishsoop-core/src/config.rs

use std::path::Path;

use fishsoop_bucket::{ObjectLocation, S3Config};
use serde::Deserialize;
use tracing::debug;

use crate::error::{JobError, Result};

const FISHSOOP_ADDRESS: &str = "fishsoop@unsw.edu.au";

fn fishsoop_address() -> String {
    FISHSOOP_ADDRESS.to_string()
}

fn fishsoop_list() -> Vec<String> {
    vec![fishsoop_address()]
}

fn default_artifact_bucket() -> String {
    "fishsoop-email".to_string()
}

fn default_ledger() -> ObjectLocation {
    ObjectLocation::new("fishsoop-email", "fishsoop_emails_sent.csv")
}

fn default_cutoff() -> usize {
    5
}

fn default_accepted_flags() -> Vec<i64> {
    vec![1, 2]
}

fn default_true() -> bool {
    true
}

fn default_smtp_port() -> u16 {
    587
}

/// Settings for every FishSOOP job, loaded once per invocation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FishsoopConfig {
    pub storage: S3Config,
    pub notify: NotifyConfig,
    pub smtp: SmtpConfig,
    pub status_page: StatusPageConfig,
    pub daily_summary: DailySummaryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    /// Bucket receiving plots and CSV extracts, keyed `{serial}/{name}`.
    #[serde(default = "default_artifact_bucket")]
    pub artifact_bucket: String,
    /// Fixed recipients; when empty the record's vessel email is used.
    #[serde(default)]
    pub email_to: Vec<String>,
    #[serde(default = "fishsoop_address")]
    pub email_from: String,
    #[serde(default = "fishsoop_list")]
    pub reply_to: Vec<String>,
    #[serde(default = "fishsoop_list")]
    pub bcc: Vec<String>,
    #[serde(default = "fishsoop_list")]
    pub default_recipients: Vec<String>,
    #[serde(default = "default_ledger")]
    pub ledger: ObjectLocation,
    #[serde(default)]
    pub create_ledger: bool,
    /// Records with this many samples or fewer are not emailed.
    #[serde(default = "default_cutoff")]
    pub cutoff: usize,
    #[serde(default = "default_accepted_flags")]
    pub accepted_qc_flags: Vec<i64>,
    #[serde(default = "default_true")]
    pub email_plot: bool,
    #[serde(default = "default_true")]
    pub email_raw_data: bool,
    #[serde(default = "default_true")]
    pub plot_data: bool,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            artifact_bucket: default_artifact_bucket(),
            email_to: Vec::new(),
            email_from: fishsoop_address(),
            reply_to: fishsoop_list(),
            bcc: fishsoop_list(),
            default_recipients: fishsoop_list(),
            ledger: default_ledger(),
            create_ledger: false,
            cutoff: default_cutoff(),
            accepted_qc_flags: default_accepted_flags(),
            email_plot: true,
            email_raw_data: true,
            plot_data: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_smtp_port(),
            username: None,
            password: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StatusPageConfig {
    pub page: ObjectLocation,
    /// JSON model the page is rendered from.
    pub table: ObjectLocation,
    pub fleet_metadata: ObjectLocation,
}

impl Default for StatusPageConfig {
    fn default() -> Self {
        Self {
            page: ObjectLocation::new("fishsoop-webstats", "fishsoop-web-stats.html"),
            table: ObjectLocation::new("fishsoop-webstats", "fishsoop-web-stats.json"),
            fleet_metadata: ObjectLocation::new(
                "fishsoop-qc-tools",
                "Trial_fisherman_database_ausTest.csv",
            ),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DailySummaryConfig {
    /// `chrono` format string expanded with the report date.
    pub status_file: String,
    pub failures_file_name: String,
    pub recipients: Vec<String>,
    pub email_from: String,
    pub reply_to: Vec<String>,
    pub bcc: Vec<String>,
}

impl Default for DailySummaryConfig {
    fn default() -> Self {
        Self {
            status_file: "s3://fishsoop-moana-qc1/status-files/status_file_%y%m%d.csv".to_string(),
            failures_file_name: "failed_files_%y%m%d.csv".to_string(),
            recipients: fishsoop_list(),
            email_from: fishsoop_address(),
            reply_to: Vec::new(),
            bcc: Vec::new(),
        }
    }
}

impl FishsoopConfig {
    /// Reads the optional TOML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|err| {
                    JobError::Config(format!("cannot read {}: {err}", path.display()))
                })?;
                Self::from_toml(&raw)?
            }
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|err| JobError::Config(err.to_string()))
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok().filter(|v| !v.is_empty()));
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("FISHSOOP_SMTP_HOST") {
            self.smtp.host = host;
        }
        if let Some(port) = lookup("FISHSOOP_SMTP_PORT").and_then(|p| p.parse().ok()) {
            self.smtp.port = port;
        }
        if let Some(username) = lookup("FISHSOOP_SMTP_USERNAME") {
            self.smtp.username = Some(username);
        }
        if let Some(password) = lookup("FISHSOOP_SMTP_PASSWORD") {
            self.smtp.password = Some(password);
        }
        if let Some(region) = lookup("S3_REGION") {
            self.storage.region = region;
        }
        if let Some(endpoint) = lookup("S3_ENDPOINT_URL") {
            self.storage.endpoint = Some(endpoint);
        }
        if let Some(key) = lookup("S3_ACCESS_KEY_ID") {
            self.storage.access_key_id = Some(key);
        }
        if let Some(secret) = lookup("S3_SECRET_ACCESS_KEY") {
            self.storage.secret_access_key = Some(secret);
        }
        if let Some(flag) = lookup("S3_FORCE_PATH_STYLE") {
            self.storage.force_path_style = matches!(flag.as_str(), "1" | "true" | "TRUE");
        }
        debug!(smtp_host = %self.smtp.host, region = %self.storage.region, "configuration resolved");
    }
}
