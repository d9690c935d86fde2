// crates/fishsoop-core/src/daily_summary.rs

use std::collections::BTreeSet;
use std::fmt::Write;

use chrono::NaiveDate;
use fishsoop_bucket::ObjectLocation;
use serde::Serialize;
use tracing::{error, info};

use crate::context::JobContext;
use crate::error::{JobError, NotifyError, Result};
use crate::mailer::{MailAttachment, OutboundMessage};
use crate::templates::{TemplateSet, BODY_STYLE};

const SUBJECT_TEMPLATE: &str = "FishSOOP Processing Daily Update: {{report_date}}";

const HTML_TEMPLATE: &str = r#"<html>
<head>
{{{style}}}
</head>
<body>

<p>Yesterday's file processing statistics: </p>

<table>
    <thead><tr><th>Status</th></tr></thead>
    <tbody>
    <tr><td style="font-weight: bold;">Report Date: </td><td> {{report_date}}</td></tr>
    <tr><td style="font-weight: bold;">Number of received files: </td><td>{{received}}</td></tr>
    <tr><td style="font-weight: bold;">Number of successfully processed files: </td><td>{{succeeded}}</td></tr>
    <tr><td style="font-weight: bold;">Number of failed files: </td><td> {{failed}}</td></tr>
    <tr><td style="font-weight: bold;">Failed Moana Serial Numbers ([] if none): </td><td> {{failed_serials}}</td></tr>
    </tbody>
</table>
<p> A csv file of failed files is attached; if no files failed, no csv is attached.
If you have any questions or comments, please contact fishsoop@unsw.edu.au.  This
is an automatic email that is generated once per day (0 UTC).  The information contained in this
email message (including any attachments) is STRICTLY CONFIDENTIAL. If you are not the intended
recipient then please notify the sender immediately and then delete the e-mail.  Anyone other
than the intended recipient must not use, disclose, copy or distribute this message,
the information in it, or any attachments. </p>
</body>
</html>
"#;

const TEXT_TEMPLATE: &str = "Report Date: {{report_date}}
Number of received files: {{received}}
Number of successfully processed files: {{succeeded}}
Number of failed files: {{failed}}
Failed Moana Serial Numbers ([] if none): {{failed_serials}}
A csv file of failed files is attached; if no files failed, no csv is attached.
If you have any questions or comments, please contact fishsoop@unsw.edu.au.  This
is an automatic email that is generated once per day (0 UTC).  The information contained in this
email message (including any attachments) is STRICTLY CONFIDENTIAL. If you are not the intended
recipient then please notify the sender immediately and then delete the e-mail.  Anyone other
than the intended recipient must not use, disclose, copy or distribute this message,
the information in it, or any attachments.
";

const MOANA_MARKER: &str = "MOANA_";

/// Counts from one day's processing status file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub report_date: NaiveDate,
    pub received: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failed_serials: Vec<String>,
    /// Header plus failed rows, present only when something failed.
    #[serde(skip)]
    pub failures_csv: Option<Vec<u8>>,
}

#[derive(Serialize)]
struct SummaryContext {
    style: &'static str,
    report_date: String,
    received: usize,
    succeeded: usize,
    failed: usize,
    failed_serials: String,
}

fn column(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|header| header.trim() == name)
        .ok_or_else(|| JobError::Processing(format!("status file has no '{name}' column")))
}

/// Summarises Moana rows of a processing status file.
pub fn summarize(content: &[u8], report_date: NaiveDate) -> Result<DailySummary> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(content);
    let headers = reader.headers()?.clone();
    let filename_idx = column(&headers, "filename")?;
    let failed_idx = column(&headers, "failed")?;
    let saved_idx = column(&headers, "saved")?;
    let serial_idx = column(&headers, "moana_serial_number")?;

    let mut received = 0;
    let mut succeeded = 0;
    let mut failed_rows = Vec::new();
    let mut failed_serials = BTreeSet::new();

    for record in reader.records() {
        let record = record?;
        let field = |idx: usize| record.get(idx).unwrap_or("").trim();
        if !field(filename_idx).contains(MOANA_MARKER) {
            continue;
        }
        received += 1;
        if field(saved_idx) == "yes" {
            succeeded += 1;
        }
        if field(failed_idx) == "yes" {
            failed_serials.insert(field(serial_idx).to_string());
            failed_rows.push(record.clone());
        }
    }

    let failures_csv = if failed_rows.is_empty() {
        None
    } else {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&headers)?;
        for row in &failed_rows {
            writer.write_record(row)?;
        }
        Some(
            writer
                .into_inner()
                .map_err(|err| JobError::Processing(err.to_string()))?,
        )
    };

    Ok(DailySummary {
        report_date,
        received,
        succeeded,
        failed: failed_rows.len(),
        failed_serials: failed_serials.into_iter().collect(),
        failures_csv,
    })
}

/// Expands a `chrono` pattern, reporting bad patterns instead of panicking.
fn format_date(date: NaiveDate, pattern: &str) -> Result<String> {
    let mut out = String::new();
    write!(out, "{}", date.format(pattern))
        .map_err(|_| JobError::Config(format!("invalid date pattern '{pattern}'")))?;
    Ok(out)
}

impl DailySummary {
    pub fn serials_label(&self) -> String {
        format!("[{}]", self.failed_serials.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummaryReport {
    pub status_file: String,
    pub summary: DailySummary,
    pub recipients: Vec<String>,
    pub attachment: Option<String>,
    /// False for dry runs.
    pub sent: bool,
}

/// Reads the report date's status file and emails the summary.
pub async fn run_daily_summary(ctx: &JobContext, report_date: NaiveDate) -> Result<DailySummaryReport> {
    let config = &ctx.config.daily_summary;
    let status_file: ObjectLocation = format_date(report_date, &config.status_file)?.parse()?;
    info!(%status_file, "summarising processing status");

    let bytes = ctx.store.get_object(&status_file).await?;
    let summary = summarize(&bytes, report_date)?;

    let context = SummaryContext {
        style: BODY_STYLE,
        report_date: report_date.format("%d %b %y").to_string(),
        received: summary.received,
        succeeded: summary.succeeded,
        failed: summary.failed,
        failed_serials: summary.serials_label(),
    };
    let templates = TemplateSet::new(SUBJECT_TEMPLATE, HTML_TEMPLATE, TEXT_TEMPLATE)
        .map_err(|err| JobError::Processing(err.to_string()))?;
    let rendered = templates
        .render(&context)
        .map_err(|err| JobError::Processing(err.to_string()))?;

    let attachment_name = format_date(report_date, &config.failures_file_name)?;
    let attachments: Vec<MailAttachment> = summary
        .failures_csv
        .iter()
        .map(|body| MailAttachment {
            filename: attachment_name.clone(),
            content_type: "text/csv".to_string(),
            body: body.clone(),
        })
        .collect();

    let recipients = if config.recipients.is_empty() {
        ctx.config.notify.default_recipients.clone()
    } else {
        config.recipients.clone()
    };
    let message = OutboundMessage {
        from: config.email_from.clone(),
        reply_to: config.reply_to.clone(),
        to: recipients.clone(),
        bcc: config.bcc.clone(),
        subject: rendered.subject,
        text: rendered.text,
        html: rendered.html,
        attachments,
    };
    if ctx.dry_run {
        info!(
            to = ?message.to,
            subject = %message.subject,
            attachments = message.attachments.len(),
            "dry run, daily summary not sent"
        );
    } else {
        if let Err(err) = ctx.transport.send(&message).await {
            error!(error = %err, "daily summary email not sent");
            return Err(NotifyError::SendTransport(err.to_string()).into());
        }
        info!(received = summary.received, failed = summary.failed, "daily summary sent");
    }

    let attachment = summary.failures_csv.as_ref().map(|_| attachment_name);
    Ok(DailySummaryReport {
        status_file: status_file.to_string(),
        summary,
        recipients,
        attachment,
        sent: !ctx.dry_run,
    })
}
