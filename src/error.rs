use axum::extract::multipart::MultipartError;

use crate::{service::EmailServiceError, upload::UploadError};

/// Problems with the submitted form. The display text is shown to the user
/// as is, so it must not carry anything beyond what they typed.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Recipient, subject and body are all required.")]
    MissingFields,

    #[error("Repeat must be a whole number, got '{0}'.")]
    InvalidRepeat(String),

    #[error("Repeat may not be larger than {0}.")]
    RepeatTooLarge(u32),

    #[error("The recipient address is not valid.")]
    InvalidRecipient,

    #[error("The form submission could not be read.")]
    MalformedForm(#[from] MultipartError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Config,
    Transport,
    Storage,
    Compose,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Dispatch(#[from] EmailServiceError),
}

impl SubmitError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Upload(_) => ErrorKind::Storage,
            Self::Dispatch(e) => e.kind(),
        }
    }

    /// Text safe to show in the browser. Details stay in the server log.
    pub fn user_message(&self) -> String {
        let text = match self {
            Self::Validation(e) => return e.to_string(),
            Self::Upload(_) => "The attachment could not be saved. Please try again.",
            Self::Dispatch(EmailServiceError::InvalidRecipient(_)) => {
                return ValidationError::InvalidRecipient.to_string();
            }
            Self::Dispatch(EmailServiceError::AttachmentRead(_)) => {
                "The attachment could not be read. Please try again."
            }
            Self::Dispatch(
                EmailServiceError::MissingCredentials | EmailServiceError::InvalidSender(_),
            ) => "Sending is not configured on the server. Check the sender credentials.",
            Self::Dispatch(EmailServiceError::Transport { .. }) => {
                "The mail server rejected the message or could not be reached. Please try again later."
            }
            Self::Dispatch(EmailServiceError::ContentType(_) | EmailServiceError::MessageBuild(_)) => {
                "The message could not be composed. Please check the form and try again."
            }
        };
        text.to_string()
    }
}
