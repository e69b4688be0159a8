use thiserror::Error;

use crate::event::FileCandidate;
use crate::model::StagedFile;

pub const ALLOWED_MIME_TYPES: &[&str] = &["text/plain", "application/pdf"];

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StagingError {
    #[error("unsupported file type '{mime_type}'")]
    UnsupportedType { mime_type: String },
    #[error("file is {size} bytes, limit is {max}")]
    TooLarge { size: u64, max: u64 },
}

impl StagingError {
    pub fn user_message(&self, max_bytes: u64) -> String {
        match self {
            StagingError::UnsupportedType { .. } => "Only PDF or TXT files are allowed".to_string(),
            StagingError::TooLarge { .. } => {
                format!("File too large. Maximum: {}MB", max_bytes / MIB)
            }
        }
    }
}

/// Accepts a candidate if its declared type is allowed and it fits under
/// `max_bytes` (inclusive).
pub fn validate(candidate: FileCandidate, max_bytes: u64) -> Result<StagedFile, StagingError> {
    if !ALLOWED_MIME_TYPES.contains(&candidate.mime_type.as_str()) {
        return Err(StagingError::UnsupportedType {
            mime_type: candidate.mime_type,
        });
    }

    let size = candidate.content.len() as u64;
    if size > max_bytes {
        return Err(StagingError::TooLarge {
            size,
            max: max_bytes,
        });
    }

    Ok(StagedFile {
        name: candidate.name,
        mime_type: candidate.mime_type,
        size_bytes: size,
        content: candidate.content,
    })
}

#[allow(clippy::cast_precision_loss)]
pub fn format_file_size(bytes: u64) -> String {
    if bytes < KIB {
        format!("{bytes} B")
    } else if bytes < MIB {
        format!("{:.2} KB", bytes as f64 / KIB as f64)
    } else {
        format!("{:.2} MB", bytes as f64 / MIB as f64)
    }
}
