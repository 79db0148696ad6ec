//! The immutable description of one scan request.

use crate::core::types::{ContentHash, ContentType, FileType};

use serde::{Deserialize, Serialize};

/// Context information for a scan request.
///
/// One instance is built per scan call and attached unchanged to the
/// [`ScanResult`](crate::core::ScanResult) it produces, so callers can
/// correlate verdicts with what was submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanContext {
    /// Name of the engine context (the registering application).
    pub app_name: String,

    /// Session that performed the scan. File scans open their own engine
    /// stream and carry no session id.
    pub session_id: Option<String>,

    /// Caller-supplied content name, or the file path.
    pub content_name: String,

    /// Kind of content submitted.
    pub content_type: ContentType,

    /// File classification; `Unknown` for strings and buffers.
    pub file_type: FileType,

    /// Content length in bytes as submitted to the engine.
    pub content_length: u64,

    /// Content digest, absent when hashing is disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<ContentHash>,
}

impl ScanContext {
    /// Creates a new context for the given content.
    pub fn new(
        app_name: impl Into<String>,
        content_name: impl Into<String>,
        content_type: ContentType,
        content_length: u64,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            session_id: None,
            content_name: content_name.into(),
            content_type,
            file_type: FileType::Unknown,
            content_length,
            content_hash: None,
        }
    }

    /// Sets the session id.
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Sets the file type.
    pub fn with_file_type(mut self, file_type: FileType) -> Self {
        self.file_type = file_type;
        self
    }

    /// Sets the content hash.
    pub fn with_content_hash(mut self, hash: Option<ContentHash>) -> Self {
        self.content_hash = hash;
        self
    }
}
