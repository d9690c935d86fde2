// crates/fishsoop-core/src/mailer.rs

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::info;

use crate::config::SmtpConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct MailAttachment {
    pub filename: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

/// A fully composed email, independent of the transport that delivers it.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub from: String,
    pub reply_to: Vec<String>,
    pub to: Vec<String>,
    /// Envelope-only recipients.
    pub bcc: Vec<String>,
    pub subject: String,
    pub text: String,
    pub html: String,
    pub attachments: Vec<MailAttachment>,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid address '{address}': {message}")]
    Address { address: String, message: String },
    #[error("failed to build message: {0}")]
    Build(String),
    #[error("smtp error: {0}")]
    Smtp(String),
    #[error("mail delivery is disabled")]
    Disabled,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError>;
}

fn mailbox(address: &str) -> Result<Mailbox, TransportError> {
    address
        .parse()
        .map_err(|e: lettre::address::AddressError| TransportError::Address {
            address: address.to_string(),
            message: e.to_string(),
        })
}

/// Builds the MIME message: mixed { alternative { text, html }, attachments.. }.
pub fn build_message(message: &OutboundMessage) -> Result<Message, TransportError> {
    let mut builder = Message::builder()
        .from(mailbox(&message.from)?)
        .subject(message.subject.clone());
    for address in &message.reply_to {
        builder = builder.reply_to(mailbox(address)?);
    }
    for address in &message.to {
        builder = builder.to(mailbox(address)?);
    }
    for address in &message.bcc {
        builder = builder.bcc(mailbox(address)?);
    }

    let mut body = MultiPart::mixed().multipart(MultiPart::alternative_plain_html(
        message.text.clone(),
        message.html.clone(),
    ));
    for attachment in &message.attachments {
        let content_type = ContentType::parse(&attachment.content_type)
            .map_err(|e| TransportError::Build(format!("{}: {e}", attachment.filename)))?;
        body = body.singlepart(
            Attachment::new(attachment.filename.clone()).body(attachment.body.clone(), content_type),
        );
    }

    builder
        .multipart(body)
        .map_err(|e| TransportError::Build(e.to_string()))
}

/// SMTP delivery with STARTTLS and optional credentials.
pub struct SmtpMailTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailTransport {
    pub fn new(config: &SmtpConfig) -> Result<Self, TransportError> {
        if config.host.is_empty() {
            return Err(TransportError::Smtp("SMTP host is not configured".into()));
        }
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e: lettre::transport::smtp::Error| TransportError::Smtp(e.to_string()))?
            .port(config.port);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }
        Ok(Self {
            mailer: builder.build(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        let email = build_message(message)?;
        self.mailer
            .send(email)
            .await
            .map_err(|e: lettre::transport::smtp::Error| TransportError::Smtp(e.to_string()))?;
        info!(
            recipients = message.to.len(),
            bcc = message.bcc.len(),
            attachments = message.attachments.len(),
            "email sent"
        );
        Ok(())
    }
}

/// Transport for jobs that never deliver mail. Any attempt to send is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledTransport;

#[async_trait]
impl MailTransport for DisabledTransport {
    async fn send(&self, _message: &OutboundMessage) -> Result<(), TransportError> {
        Err(TransportError::Disabled)
    }
}
