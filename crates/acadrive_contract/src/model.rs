use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const UPLOAD_LIMIT_MIB: u64 = 50;
pub const MAX_UPLOAD_BYTES: u64 = UPLOAD_LIMIT_MIB * 1024 * 1024;

/// Server-side metadata for one uploaded file. Read-only on this side:
/// records are replaced wholesale on every refetch, never merged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileRecord {
    pub id: i64,
    pub filename: String,
    pub subject: String,
    pub file_size: u64,
    pub file_url: String,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Stats {
    pub total_files: u64,
    pub total_subjects: u64,
    pub active_users: u64,
}

/// Optional narrowing applied to searches. Persists across queries until
/// changed; an empty string is treated as "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    pub subject: Option<String>,
    pub file_type: Option<String>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.subject.is_none() && self.file_type.is_none()
    }
}

/// One upload attempt: subject plus the file bytes, created at submit time
/// and discarded once the request resolves.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub subject: String,
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadRequest {
    pub fn new(
        subject: impl Into<String>,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            subject: subject.into().trim().to_string(),
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Local checks that must pass before any network activity.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.subject.trim().is_empty() {
            return Err(ApiError::Validation(
                "subject must not be empty".to_string(),
            ));
        }
        if self.file_name.trim().is_empty() {
            return Err(ApiError::Validation("a file is required".to_string()));
        }
        if self.size() > MAX_UPLOAD_BYTES {
            return Err(ApiError::SizeLimit {
                size: self.size(),
                limit_mib: UPLOAD_LIMIT_MIB,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_request() {
        let request = UploadRequest::new("Physics", "notes.pdf", "application/pdf", vec![1, 2, 3]);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn trims_subject_on_construction() {
        let request = UploadRequest::new("  Math  ", "a.txt", "text/plain", vec![0]);
        assert_eq!(request.subject, "Math");
    }

    #[test]
    fn rejects_blank_subject() {
        let request = UploadRequest::new("   ", "notes.pdf", "application/pdf", vec![1]);
        let err = request.validate().unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(err.is_local());
    }

    #[test]
    fn rejects_missing_file_name() {
        let request = UploadRequest::new("Physics", "", "application/pdf", vec![1]);
        assert!(matches!(
            request.validate().unwrap_err(),
            ApiError::Validation(_)
        ));
    }

    #[test]
    fn rejects_oversized_file() {
        let request = UploadRequest::new(
            "Physics",
            "huge.bin",
            "application/octet-stream",
            vec![0; (MAX_UPLOAD_BYTES + 1) as usize],
        );
        match request.validate().unwrap_err() {
            ApiError::SizeLimit { size, limit_mib } => {
                assert_eq!(size, MAX_UPLOAD_BYTES + 1);
                assert_eq!(limit_mib, 50);
            }
            other => panic!("expected SizeLimit, got {other:?}"),
        }
    }

    #[test]
    fn accepts_file_at_exact_limit() {
        let request = UploadRequest::new(
            "Physics",
            "full.bin",
            "application/octet-stream",
            vec![0; MAX_UPLOAD_BYTES as usize],
        );
        assert!(request.validate().is_ok());
    }
}
