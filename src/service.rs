use crate::{
    config::{SenderCredentials, SmtpSettings},
    dto::{SendEmailRequest, SendEmailResponse},
    error::ErrorKind,
};

use async_trait::async_trait;
use lettre::message::header::{ContentType, ContentTypeErr};
use lettre::message::{Attachment, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use std::{path::Path, sync::Arc};

const OCTET_STREAM: &str = "application/octet-stream";

pub type MailerError = Box<dyn std::error::Error + Send + Sync>;

/// Delivers one already composed message.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &Message) -> Result<(), MailerError>;
}

/// STARTTLS submission to the configured relay. The transport pools its
/// connection, so a run of sends shares one authenticated session.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(
        settings: &SmtpSettings,
        credentials: Option<&SenderCredentials>,
    ) -> Result<Self, lettre::transport::smtp::Error> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.relay)?
            .port(settings.port)
            .timeout(Some(settings.timeout));

        if let Some(credentials) = credentials {
            builder = builder.credentials(Credentials::new(
                credentials.email.clone(),
                credentials.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &Message) -> Result<(), MailerError> {
        self.transport
            .send_raw(message.envelope(), &message.formatted())
            .await?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EmailServiceError {
    #[error("Sender credentials are not configured (SENDER_EMAIL / SENDER_PASSWORD)")]
    MissingCredentials,

    #[error("Invalid sender address: {0}")]
    InvalidSender(lettre::address::AddressError),

    #[error("Invalid recipient address: {0}")]
    InvalidRecipient(lettre::address::AddressError),

    #[error("Failed to read attachment: {0}")]
    AttachmentRead(std::io::Error),

    #[error("Invalid attachment content type: {0}")]
    ContentType(#[from] ContentTypeErr),

    #[error("Failed to build email message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("SMTP transport error after {sent} successful send(s): {source}")]
    Transport { sent: u32, source: MailerError },
}

impl EmailServiceError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingCredentials | Self::InvalidSender(_) => ErrorKind::Config,
            Self::InvalidRecipient(_) => ErrorKind::Validation,
            Self::AttachmentRead(_) => ErrorKind::Storage,
            Self::ContentType(_) | Self::MessageBuild(_) => ErrorKind::Compose,
            Self::Transport { .. } => ErrorKind::Transport,
        }
    }
}

/// Composes a message once and hands it to the mailer as many times as
/// requested.
pub struct EmailService {
    credentials: Option<SenderCredentials>,
    mailer: Arc<dyn Mailer>,
}

impl EmailService {
    pub fn new(credentials: Option<SenderCredentials>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            credentials,
            mailer,
        }
    }

    pub async fn send_email(
        &self,
        request: &SendEmailRequest,
    ) -> Result<SendEmailResponse, EmailServiceError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(EmailServiceError::MissingCredentials)?;

        let (email, attachment_skipped) = compose(credentials, request).await?;

        tracing::info!(
            "Sending email to '{}' with subject '{}' {} time(s)",
            request.recipient,
            request.subject,
            request.repeat
        );

        for copy in 1..=request.repeat {
            if let Err(source) = self.mailer.send(&email).await {
                tracing::error!(
                    "Sending to {} aborted at copy {copy}/{}: {source}",
                    request.recipient,
                    request.repeat
                );
                return Err(EmailServiceError::Transport {
                    sent: copy - 1,
                    source,
                });
            }
            tracing::info!(
                "Message to {} sent ({copy}/{})",
                request.recipient,
                request.repeat
            );
        }

        let mut message = format!(
            "Email sent to {} {} time(s).",
            request.recipient, request.repeat
        );
        if attachment_skipped {
            message.push_str(" The attachment could not be found and was left out.");
        }

        Ok(SendEmailResponse {
            message,
            sent: request.repeat,
            attachment_skipped,
        })
    }
}

/// Builds the message. A missing attachment file is left out rather than
/// failing the send; the second tuple field reports whether that happened.
async fn compose(
    credentials: &SenderCredentials,
    request: &SendEmailRequest,
) -> Result<(Message, bool), EmailServiceError> {
    let builder = Message::builder()
        .from(
            credentials
                .email
                .parse()
                .map_err(EmailServiceError::InvalidSender)?,
        )
        .to(request
            .recipient
            .parse()
            .map_err(EmailServiceError::InvalidRecipient)?)
        .subject(request.subject.clone());

    let attachment = match &request.attachment {
        Some(path) => read_attachment(path).await?,
        None => None,
    };
    let attachment_skipped = request.attachment.is_some() && attachment.is_none();

    let email = match attachment {
        Some(part) => builder.multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(request.body.clone()))
                .singlepart(part),
        )?,
        None => builder
            .header(ContentType::TEXT_PLAIN)
            .body(request.body.clone())?,
    };

    Ok((email, attachment_skipped))
}

async fn read_attachment(path: &Path) -> Result<Option<SinglePart>, EmailServiceError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(
                "Attachment {} does not exist, sending without it",
                path.display()
            );
            return Ok(None);
        }
        Err(e) => return Err(EmailServiceError::AttachmentRead(e)),
    };

    let file_name = path
        .file_name()
        .map_or_else(|| "attachment".to_string(), |n| n.to_string_lossy().into_owned());

    let guessed = mime_guess::from_path(path).first_or_octet_stream();
    let content_type = ContentType::parse(guessed.essence_str())
        .or_else(|_| ContentType::parse(OCTET_STREAM))?;

    Ok(Some(Attachment::new(file_name).body(bytes, content_type)))
}
