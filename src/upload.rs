//! Persists uploaded attachments under a fixed directory.

use std::path::{Path, PathBuf};

use crate::dto::UploadedFile;

const FALLBACK_NAME: &str = "attachment";

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Failed to write upload to '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    /// Creates the upload directory if it does not exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes the file under its sanitized name and returns the full path.
    /// A file with the same name is replaced.
    pub async fn save(&self, file: &UploadedFile) -> Result<PathBuf, UploadError> {
        let path = self.dir.join(sanitize_filename(&file.file_name));

        tokio::fs::write(&path, &file.bytes)
            .await
            .map_err(|source| UploadError::Write {
                path: path.clone(),
                source,
            })?;

        tracing::info!(
            "Stored upload '{}' ({} bytes) at {}",
            file.file_name,
            file.bytes.len(),
            path.display()
        );
        Ok(path)
    }
}

/// Reduce a client supplied filename to a single safe path component.
///
/// Directory parts are dropped (both `/` and `\` count as separators),
/// Unicode is transliterated with `deunicode`, anything outside
/// `[A-Za-z0-9._-]` becomes `_`, runs of `_` and `.` collapse, and leading
/// or trailing dots and underscores are removed so the result can never be
/// hidden or climb out of the upload directory.
pub fn sanitize_filename(value: &str) -> String {
    let last_component = value.rsplit(['/', '\\']).next().unwrap_or_default();
    let transliterated = deunicode::deunicode(last_component);

    let mut out = String::with_capacity(transliterated.len());
    let mut last: Option<char> = None;

    for ch in transliterated.chars() {
        let mapped = if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.' {
            ch
        } else {
            '_'
        };

        if (mapped == '_' || mapped == '.') && last == Some(mapped) {
            continue;
        }
        out.push(mapped);
        last = Some(mapped);
    }

    while let Some(pos) = out.find("_.") {
        out.remove(pos);
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        return FALLBACK_NAME.to_string();
    }

    let (basename, ext) = match trimmed.rsplit_once('.') {
        Some((base, ext)) => (base, Some(ext)),
        None => (trimmed, None),
    };

    if is_reserved_device_name(basename) {
        return match ext {
            Some(ext) => format!("{basename}_.{ext}"),
            None => format!("{basename}_"),
        };
    }

    trimmed.to_string()
}

fn is_reserved_device_name(basename: &str) -> bool {
    let upper = basename.to_ascii_uppercase();
    matches!(upper.as_str(), "CON" | "PRN" | "AUX" | "NUL")
        || ((upper.starts_with("COM") || upper.starts_with("LPT"))
            && upper.len() == 4
            && upper[3..].chars().all(|c| ('1'..='9').contains(&c)))
}
