//! Receipt delivery over SMTP.
//!
//! [`dispatch`] is the boundary: whatever goes wrong inside a [`Mailer`] is
//! logged with its kind and handed back as a [`DeliveryOutcome`], never as an
//! error. There is no retry.

use std::path::PathBuf;

use async_trait::async_trait;
use lettre::{
    address::AddressError,
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::{self, authentication::Credentials},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::MailSettings;

pub const RECEIPT_SUBJECT: &str = "Your Medicine Order Receipt";
pub const RECEIPT_BODY: &str = "Please find your receipt attached.";
const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OutgoingMail {
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub attachment: PathBuf,
}

impl OutgoingMail {
    pub fn receipt(recipient: &str, attachment: PathBuf) -> Self {
        Self {
            recipient: recipient.to_string(),
            subject: RECEIPT_SUBJECT.to_string(),
            body: RECEIPT_BODY.to_string(),
            attachment,
        }
    }

    /// Base name of the attached file.
    pub fn attachment_name(&self) -> String {
        self.attachment
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "receipt.pdf".to_string())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryFailureKind {
    Address,
    Attachment,
    Compose,
    Rejected,
    Network,
}

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("invalid address {address}: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: AddressError,
    },

    #[error("failed to read attachment: {0}")]
    Attachment(#[from] std::io::Error),

    #[error("failed to compose message: {0}")]
    Compose(#[from] lettre::error::Error),

    #[error("invalid attachment content type: {0}")]
    ContentType(String),

    #[error("mail server rejected the message: {0}")]
    Rejected(#[source] smtp::Error),

    #[error("mail transport failed: {0}")]
    Network(#[source] smtp::Error),
}

impl From<smtp::Error> for DeliveryError {
    fn from(err: smtp::Error) -> Self {
        // Permanent 5xx replies cover authentication failures and refused recipients.
        if err.is_permanent() {
            Self::Rejected(err)
        } else {
            Self::Network(err)
        }
    }
}

impl DeliveryError {
    pub fn kind(&self) -> DeliveryFailureKind {
        match self {
            Self::InvalidAddress { .. } => DeliveryFailureKind::Address,
            Self::Attachment(_) => DeliveryFailureKind::Attachment,
            Self::Compose(_) | Self::ContentType(_) => DeliveryFailureKind::Compose,
            Self::Rejected(_) => DeliveryFailureKind::Rejected,
            Self::Network(_) => DeliveryFailureKind::Network,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DeliveryOutcome {
    Delivered,
    Failed {
        kind: DeliveryFailureKind,
        message: String,
    },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), DeliveryError>;
}

/// Sends `mail` once and reports how it went.
pub async fn dispatch(mailer: &dyn Mailer, mail: &OutgoingMail) -> DeliveryOutcome {
    match mailer.send(mail).await {
        Ok(()) => {
            tracing::info!("Receipt sent to {}", mail.recipient);
            DeliveryOutcome::Delivered
        }
        Err(err) => {
            let kind = err.kind();
            tracing::error!(?kind, "Email to {} failed: {}", mail.recipient, err);
            DeliveryOutcome::Failed {
                kind,
                message: err.to_string(),
            }
        }
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, DeliveryError> {
    address
        .trim()
        .parse()
        .map_err(|source| DeliveryError::InvalidAddress {
            address: address.to_string(),
            source,
        })
}

/// Builds the multipart message: plain-text body plus the PDF attachment.
pub fn compose_message(
    from: &Mailbox,
    mail: &OutgoingMail,
    attachment: Vec<u8>,
) -> Result<Message, DeliveryError> {
    let to = parse_mailbox(&mail.recipient)?;
    let pdf = ContentType::parse(PDF_CONTENT_TYPE)
        .map_err(|_| DeliveryError::ContentType(PDF_CONTENT_TYPE.to_string()))?;

    let message = Message::builder()
        .from(from.clone())
        .to(to)
        .subject(mail.subject.clone())
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(mail.body.clone()))
                .singlepart(Attachment::new(mail.attachment_name()).body(attachment, pdf)),
        )?;
    Ok(message)
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &MailSettings) -> Result<Self, DeliveryError> {
        let builder = if settings.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)?
        };
        let builder = builder.port(settings.port);
        let builder = if settings.has_credentials() {
            builder.credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
        } else {
            tracing::warn!("MAIL_USERNAME/MAIL_PASSWORD not set; receipt emails will be rejected");
            builder
        };

        Ok(Self {
            transport: builder.build(),
            from: parse_mailbox(&settings.from)?,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), DeliveryError> {
        let bytes = tokio::fs::read(&mail.attachment).await?;
        let message = compose_message(&self.from, mail, bytes)?;
        self.transport.send(message).await?;
        Ok(())
    }
}
