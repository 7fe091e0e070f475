use serde::{Deserialize, Serialize};

use std::path::PathBuf;

use crate::error::ValidationError;

/// A file part received with the form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Raw form fields as submitted by the browser.
#[derive(Debug, Clone, Default)]
pub struct SubmissionForm {
    pub recipient: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub repeat: Option<String>,
    pub attachment: Option<UploadedFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendEmailRequest {
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub attachment: Option<PathBuf>,
    pub repeat: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendEmailResponse {
    pub message: String,
    pub sent: u32,
    pub attachment_skipped: bool,
}

fn required(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Longest slice of a rejected repeat value echoed back to the user.
const ECHO_LIMIT: usize = 32;

fn echo(raw: &str) -> String {
    if raw.chars().count() <= ECHO_LIMIT {
        return raw.to_string();
    }
    let mut shown: String = raw.chars().take(ECHO_LIMIT).collect();
    shown.push_str("...");
    shown
}

fn is_integer(raw: &str) -> bool {
    let digits = raw.strip_prefix(['-', '+']).unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Absent or blank means one copy. Anything below one is raised to one.
/// `max_repeat` of `None` means no upper bound beyond `u32::MAX`.
pub fn parse_repeat(raw: Option<&str>, max_repeat: Option<u32>) -> Result<u32, ValidationError> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(1);
    };

    let limit = max_repeat.unwrap_or(u32::MAX);

    let parsed: i64 = match raw.parse() {
        Ok(parsed) => parsed,
        // integers outside i64 still count as numbers
        Err(_) if is_integer(raw) && raw.starts_with('-') => return Ok(1),
        Err(_) if is_integer(raw) => return Err(ValidationError::RepeatTooLarge(limit)),
        Err(_) => return Err(ValidationError::InvalidRepeat(echo(raw))),
    };

    let clamped = parsed.max(1);
    if clamped > i64::from(limit) {
        return Err(ValidationError::RepeatTooLarge(limit));
    }

    u32::try_from(clamped).map_err(|_| ValidationError::RepeatTooLarge(limit))
}

impl SubmissionForm {
    /// Checks the text fields and the repeat count. The attachment, if any,
    /// is left for the caller to persist.
    pub fn validate(&self, max_repeat: Option<u32>) -> Result<SendEmailRequest, ValidationError> {
        let (Some(recipient), Some(subject), Some(body)) = (
            required(self.recipient.as_ref()),
            required(self.subject.as_ref()),
            required(self.body.as_ref()),
        ) else {
            return Err(ValidationError::MissingFields);
        };

        let repeat = parse_repeat(self.repeat.as_deref(), max_repeat)?;

        Ok(SendEmailRequest {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            attachment: None,
            repeat,
        })
    }
}
