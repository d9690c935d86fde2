// crates/fishsoop-core/src/dispatch.rs

use chrono::{DateTime, Utc};
use fishsoop_bucket::ObjectLocation;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::context::JobContext;
use crate::error::{JobError, NotifyError};
use crate::event::StorageEvent;
use crate::extractor::DataExtractor;
use crate::message::MessageTemplates;
use crate::notifier::{NotificationManager, NotificationRequest, NotifySettings, NotifyOutcome};
use crate::recipients::recipients_for;
use crate::record::{attrs, SensorRecord};
use crate::render::publish_report;

/// Why a record is not emailed before any artifact is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchSkip {
    EmailDisabled { frequency: String, status: String },
    BelowCutoff { samples: usize, cutoff: usize },
}

impl std::fmt::Display for DispatchSkip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchSkip::EmailDisabled { frequency, status } => write!(
                f,
                "email not enabled (email_frequency={frequency}, email_status={status})"
            ),
            DispatchSkip::BelowCutoff { samples, cutoff } => write!(
                f,
                "{samples} quality samples is at or below the cutoff of {cutoff}"
            ),
        }
    }
}

/// Records with `cutoff` samples or fewer are treated as a splashed sensor and not emailed.
pub fn check_policy(record: &SensorRecord, cutoff: usize) -> Option<DispatchSkip> {
    if !record.email_enabled() {
        return Some(DispatchSkip::EmailDisabled {
            frequency: record.attribute(attrs::EMAIL_FREQUENCY).unwrap_or("").to_string(),
            status: record.attribute(attrs::EMAIL_STATUS).unwrap_or("").to_string(),
        });
    }
    let samples = record.samples.len();
    if samples <= cutoff {
        return Some(DispatchSkip::BelowCutoff { samples, cutoff });
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Success,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationSummary {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recipients: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<&NotifyOutcome> for NotificationSummary {
    fn from(outcome: &NotifyOutcome) -> Self {
        match outcome {
            NotifyOutcome::Sent(sent) => Self {
                outcome: "sent",
                recipients: sent.recipients.clone(),
                attachments: sent.attachments.clone(),
                detail: (!sent.ledger_recorded).then(|| "ledger not updated".to_string()),
            },
            NotifyOutcome::DryRun(composed) => Self {
                outcome: "dry_run",
                recipients: composed.recipients.clone(),
                attachments: composed.attachments.clone(),
                detail: Some("email composed but not sent".to_string()),
            },
            NotifyOutcome::Skipped(reason) => Self {
                outcome: "skipped",
                recipients: Vec::new(),
                attachments: Vec::new(),
                detail: Some(reason.as_str().to_string()),
            },
            NotifyOutcome::Failed(err) => Self {
                outcome: err.kind(),
                recipients: Vec::new(),
                attachments: Vec::new(),
                detail: Some(err.to_string()),
            },
        }
    }
}

/// Result of one dispatcher run, printed by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobReport {
    pub source: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples: Option<usize>,
    pub artifacts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationSummary>,
}

impl JobReport {
    fn new(source: &ObjectLocation) -> Self {
        Self {
            source: source.to_string(),
            status: JobStatus::Success,
            reason: None,
            samples: None,
            artifacts: Vec::new(),
            notification: None,
        }
    }

    fn finish(mut self, status: JobStatus, reason: impl Into<String>) -> Self {
        self.status = status;
        self.reason = Some(reason.into());
        self
    }
}

/// Entry point for a storage notification naming one quality-controlled file.
pub async fn handle_event(
    ctx: &JobContext,
    event: &StorageEvent,
    now: DateTime<Utc>,
) -> Result<JobReport, JobError> {
    let source = event.object_location()?;
    info!(%source, "processing quality-controlled file");
    Ok(process_file(ctx, &source, now).await?)
}

/// Extract, filter, render and notify for one file. Failures other than a ledger creation
/// conflict end up in the returned report.
pub async fn process_file(
    ctx: &JobContext,
    source: &ObjectLocation,
    now: DateTime<Utc>,
) -> Result<JobReport, NotifyError> {
    let notify = &ctx.config.notify;
    let report = JobReport::new(source);

    let extractor = DataExtractor::new(
        ctx.store.as_ref(),
        &notify.artifact_bucket,
        &notify.accepted_qc_flags,
    );
    let extraction = match extractor.extract(source, notify.email_raw_data).await {
        Ok(extraction) => extraction,
        Err(err) => {
            error!(%source, error = %err, "send email failed");
            return Ok(report.finish(JobStatus::Failed, err.to_string()));
        }
    };
    let record = extraction.record;
    let mut report = JobReport {
        samples: Some(record.samples.len()),
        ..report
    };
    if let Some(csv) = &extraction.csv_extract {
        report.artifacts.push(csv.name.clone());
    }

    if let Some(skip) = check_policy(&record, notify.cutoff) {
        info!(%source, reason = %skip, "not emailing record");
        return Ok(report.finish(JobStatus::Skipped, skip.to_string()));
    }

    let plot = if notify.plot_data {
        match publish_report(
            ctx.store.as_ref(),
            ctx.renderer.as_ref(),
            &notify.artifact_bucket,
            &record,
        )
        .await
        {
            Ok(artifact) => {
                report.artifacts.push(artifact.name.clone());
                Some(artifact)
            }
            Err(err) => {
                warn!(%source, error = %err, "plot not produced");
                None
            }
        }
    } else {
        None
    };

    if !(notify.email_plot || notify.email_raw_data) {
        return Ok(report.finish(JobStatus::Skipped, "emailing disabled"));
    }

    let plots: Vec<String> = match (&plot, notify.email_plot) {
        (Some(artifact), true) => vec![artifact.name.clone()],
        _ => Vec::new(),
    };
    let attachments: Vec<String> = extraction
        .csv_extract
        .iter()
        .map(|artifact| artifact.name.clone())
        .collect();
    let recipients = recipients_for(&notify.email_to, &record, &notify.default_recipients);

    let templates = match MessageTemplates::new() {
        Ok(templates) => templates,
        Err(err) => return Ok(report.finish(JobStatus::Failed, err.to_string())),
    };
    let settings = NotifySettings {
        dry_run: ctx.dry_run,
        ..NotifySettings::from(notify)
    };
    let manager = NotificationManager::new(
        ctx.store.as_ref(),
        ctx.transport.as_ref(),
        &templates,
        &settings,
    );
    let outcome = manager
        .run(
            NotificationRequest {
                record: &record,
                recipients,
                attachments,
                plots,
            },
            now,
        )
        .await?;

    report.notification = Some(NotificationSummary::from(&outcome));
    let report = match &outcome {
        NotifyOutcome::Sent(_) => JobReport {
            status: JobStatus::Success,
            ..report
        },
        NotifyOutcome::DryRun(_) => report.finish(JobStatus::Skipped, "dry run, email not sent"),
        NotifyOutcome::Skipped(_) => report.finish(JobStatus::Skipped, "notification skipped"),
        NotifyOutcome::Failed(err) => report.finish(JobStatus::Failed, err.to_string()),
    };
    Ok(report)
}
