// crates/fishsoop-core/src/notifier.rs

use chrono::{DateTime, Utc};
use fishsoop_bucket::{BucketStore, ObjectLocation};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::artifact::{artifact_location, content_type_for};
use crate::config::NotifyConfig;
use crate::error::NotifyError;
use crate::ledger::{Ledger, LedgerEntry};
use crate::mailer::{MailAttachment, MailTransport, OutboundMessage};
use crate::message::{MessageContext, MessageTemplates, FALLBACK_RECIPIENT_WARNING};
use crate::record::SensorRecord;

/// Sender identity and ledger placement shared by every notification of a run.
#[derive(Debug, Clone)]
pub struct NotifySettings {
    pub from: String,
    pub reply_to: Vec<String>,
    pub bcc: Vec<String>,
    pub default_recipients: Vec<String>,
    pub ledger: ObjectLocation,
    pub create_ledger: bool,
    pub artifact_bucket: String,
    /// Compose and log the email without sending it or touching the ledger.
    pub dry_run: bool,
}

impl From<&NotifyConfig> for NotifySettings {
    fn from(config: &NotifyConfig) -> Self {
        Self {
            from: config.email_from.clone(),
            reply_to: config.reply_to.clone(),
            bcc: config.bcc.clone(),
            default_recipients: config.default_recipients.clone(),
            ledger: config.ledger.clone(),
            create_ledger: config.create_ledger,
            artifact_bucket: config.artifact_bucket.clone(),
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotificationRequest<'a> {
    pub record: &'a SensorRecord,
    pub recipients: Vec<String>,
    pub attachments: Vec<String>,
    pub plots: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// An artifact of this request is already in the ledger.
    Duplicate,
    NoAttachments,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Duplicate => "duplicate",
            SkipReason::NoAttachments => "no_attachments",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentNotification {
    pub recipients: Vec<String>,
    pub attachments: Vec<String>,
    pub fallback_recipients: bool,
    /// False when no ledger row was written: a dry run, or a failed append after sending.
    pub ledger_recorded: bool,
}

#[derive(Debug)]
pub enum NotifyOutcome {
    Sent(SentNotification),
    /// Everything a real run would send, composed but not delivered.
    DryRun(SentNotification),
    Skipped(SkipReason),
    Failed(NotifyError),
}

impl NotifyOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, NotifyOutcome::Sent(_))
    }
}

pub struct NotificationManager<'a> {
    store: &'a dyn BucketStore,
    transport: &'a dyn MailTransport,
    templates: &'a MessageTemplates,
    settings: &'a NotifySettings,
}

impl<'a> NotificationManager<'a> {
    pub fn new(
        store: &'a dyn BucketStore,
        transport: &'a dyn MailTransport,
        templates: &'a MessageTemplates,
        settings: &'a NotifySettings,
    ) -> Self {
        Self {
            store,
            transport,
            templates,
            settings,
        }
    }

    fn ledger(&self) -> Ledger<'_> {
        Ledger::new(self.store, &self.settings.ledger)
    }

    /// Sends at most one email for the request and records it.
    ///
    /// Only a ledger creation problem is returned as `Err`; every other failure is reported as
    /// [`NotifyOutcome::Failed`] after being logged.
    pub async fn run(
        &self,
        request: NotificationRequest<'_>,
        now: DateTime<Utc>,
    ) -> Result<NotifyOutcome, NotifyError> {
        if self.settings.create_ledger {
            self.ledger().create().await?;
        }

        let raw_filename = request.record.raw_filename().to_string();
        match self.deliver(request, now).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                error!(file = %raw_filename, error = %err, "email not sent");
                Ok(NotifyOutcome::Failed(err))
            }
        }
    }

    async fn deliver(
        &self,
        request: NotificationRequest<'_>,
        now: DateTime<Utc>,
    ) -> Result<NotifyOutcome, NotifyError> {
        let NotificationRequest {
            record,
            recipients,
            attachments,
            plots,
        } = request;

        let mut context = MessageContext::from_record(record)?;
        let fallback = recipients.is_empty();
        let recipients = if fallback {
            warn!(file = %record.raw_filename(), "no recipients found, sending to default email");
            context.email_error = FALLBACK_RECIPIENT_WARNING.to_string();
            self.settings.default_recipients.clone()
        } else {
            recipients
        };
        let rendered = self.templates.render(&context)?;

        let attachments = non_empty(attachments);
        let plots = non_empty(plots);
        let mut all_attachments = attachments.clone();
        for plot in &plots {
            if !all_attachments.contains(plot) {
                all_attachments.push(plot.clone());
            }
        }

        let ledger = self.ledger();
        let duplicates = ledger.find_duplicates(&all_attachments).await?;
        if !duplicates.is_empty() {
            info!(
                file = %record.raw_filename(),
                ledger = %ledger.location(),
                duplicates = ?duplicates,
                "email not sent, artifacts already in ledger"
            );
            return Ok(NotifyOutcome::Skipped(SkipReason::Duplicate));
        }
        if all_attachments.is_empty() {
            info!(file = %record.raw_filename(), "email not sent, no attachments found");
            return Ok(NotifyOutcome::Skipped(SkipReason::NoAttachments));
        }

        let mut mail_attachments = Vec::with_capacity(all_attachments.len());
        for name in &all_attachments {
            mail_attachments.push(self.fetch_attachment(name).await?);
        }

        let message = OutboundMessage {
            from: self.settings.from.clone(),
            reply_to: self.settings.reply_to.clone(),
            to: recipients.clone(),
            bcc: self.settings.bcc.clone(),
            subject: rendered.subject,
            text: rendered.text,
            html: rendered.html,
            attachments: mail_attachments,
        };
        if self.settings.dry_run {
            info!(
                to = ?message.to,
                bcc = ?message.bcc,
                subject = %message.subject,
                attachments = ?all_attachments,
                "dry run, email not sent"
            );
            return Ok(NotifyOutcome::DryRun(SentNotification {
                recipients,
                attachments: all_attachments,
                fallback_recipients: fallback,
                ledger_recorded: false,
            }));
        }

        info!(recipients = ?recipients, attachments = ?all_attachments, "emailing sensor data");
        self.transport
            .send(&message)
            .await
            .map_err(|err| NotifyError::SendTransport(err.to_string()))?;

        let entry = LedgerEntry::new(
            now,
            &recipients,
            &attachments,
            &plots,
            &self.settings.bcc,
            &self.settings.from,
            &self.settings.reply_to,
        );
        let ledger_recorded = match ledger.append(&entry).await {
            Ok(()) => true,
            Err(err) => {
                error!(ledger = %ledger.location(), error = %err, "email sent but ledger not updated");
                false
            }
        };

        Ok(NotifyOutcome::Sent(SentNotification {
            recipients,
            attachments: all_attachments,
            fallback_recipients: fallback,
            ledger_recorded,
        }))
    }

    async fn fetch_attachment(&self, name: &str) -> Result<MailAttachment, NotifyError> {
        let unavailable = |message: String| NotifyError::ArtifactUnavailable {
            name: name.to_string(),
            message,
        };
        let location = artifact_location(&self.settings.artifact_bucket, name)
            .ok_or_else(|| unavailable("name does not carry a serial folder".into()))?;
        let body = self
            .store
            .get_object(&location)
            .await
            .map_err(|err| unavailable(err.to_string()))?;
        Ok(MailAttachment {
            filename: name.to_string(),
            content_type: content_type_for(name).to_string(),
            body: body.to_vec(),
        })
    }
}

fn non_empty(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .filter(|value| !value.trim().is_empty())
        .collect()
}
