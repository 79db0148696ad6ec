//! Core types used throughout the scanbroker library.
//!
//! This module defines the normalized verdict, the content and file type
//! classifications, the content hash, and the engine result-code table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// `AMSI_RESULT_CLEAN`: known good, no detection found.
pub const RESULT_CLEAN: u32 = 0;

/// `AMSI_RESULT_NOT_DETECTED`: no detection, definitions may change.
pub const RESULT_NOT_DETECTED: u32 = 1;

/// `AMSI_RESULT_BLOCKED_BY_ADMIN_START`.
pub const RESULT_BLOCKED_BY_ADMIN_START: u32 = 0x4000;

/// `AMSI_RESULT_BLOCKED_BY_ADMIN_END`.
pub const RESULT_BLOCKED_BY_ADMIN_END: u32 = 0x4FFF;

/// `AMSI_RESULT_DETECTED`: every code at or above this value is malware.
pub const RESULT_DETECTED: u32 = 0x8000;

/// The normalized outcome of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The engine reported the content as known good.
    Clean,
    /// The engine found nothing, but its definitions may change.
    NotDetected,
    /// Content was blocked by administrator policy.
    BlockedByAdmin,
    /// The engine detected malware.
    Detected,
    /// The content was blocked before reaching the engine.
    Blocked,
    /// The file to scan does not exist.
    FileNotExists,
    /// The engine call failed or the request was unusable.
    ApplicationError,
}

impl Verdict {
    /// Classifies a raw engine result code.
    ///
    /// Only codes at or above [`RESULT_DETECTED`] are malware; everything in
    /// the admin block range is `BlockedByAdmin`; any other value below the
    /// detection threshold counts as not detected.
    pub fn from_result_code(code: u32) -> Self {
        match code {
            RESULT_CLEAN => Self::Clean,
            RESULT_BLOCKED_BY_ADMIN_START..=RESULT_BLOCKED_BY_ADMIN_END => Self::BlockedByAdmin,
            c if c >= RESULT_DETECTED => Self::Detected,
            _ => Self::NotDetected,
        }
    }

    /// Returns `true` if the content can be treated as safe.
    pub fn is_safe(&self) -> bool {
        matches!(self, Self::Clean | Self::NotDetected)
    }

    /// Returns `true` if this verdict ends a streaming scan early.
    pub fn is_decisive(&self) -> bool {
        matches!(self, Self::Detected | Self::BlockedByAdmin)
    }

    /// Returns `true` for verdicts worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ApplicationError)
    }

    /// Stable lowercase label used in logs and audit events.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::NotDetected => "not_detected",
            Self::BlockedByAdmin => "blocked_by_admin",
            Self::Detected => "detected",
            Self::Blocked => "blocked",
            Self::FileNotExists => "file_not_exists",
            Self::ApplicationError => "application_error",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of content a scan was asked to inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// A text string.
    String,
    /// An in-memory byte buffer.
    ByteArray,
    /// A file on disk.
    File,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::ByteArray => write!(f, "byte_array"),
            Self::File => write!(f, "file"),
        }
    }
}

/// File classification derived from magic bytes or the extension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    /// Not recognized, or not a file.
    #[default]
    Unknown,
    /// ZIP container.
    Zip,
    /// Standalone gzip stream.
    Gzip,
    /// POSIX tar archive.
    Tar,
    /// 7-Zip archive.
    SevenZip,
    /// RAR archive.
    Rar,
}

impl FileType {
    /// Returns `true` for archive kinds.
    pub fn is_archive(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Content digests kept for correlation and audit.
///
/// BLAKE3 is always present. MD5 and SHA-256 are filled in only when the
/// hasher was configured for them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash {
    /// BLAKE3 hash, lowercase hex.
    pub blake3: String,

    /// MD5 hash, lowercase hex.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,

    /// SHA-256 hash, lowercase hex.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl ContentHash {
    /// Creates a `ContentHash` with only BLAKE3.
    pub fn new(blake3: impl Into<String>) -> Self {
        Self {
            blake3: blake3.into(),
            md5: None,
            sha256: None,
        }
    }

    /// Returns the primary hash (BLAKE3).
    pub fn primary(&self) -> &str {
        &self.blake3
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blake3:{}", self.blake3)
    }
}

/// The detection engine the native context resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionEngine {
    /// Product name (e.g., "Windows Defender").
    pub name: String,

    /// Engine or signature version, if reported.
    pub version: Option<String>,
}

impl DetectionEngine {
    /// Creates a new `DetectionEngine`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }

    /// Sets the version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

impl fmt::Display for DetectionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{} {}", self.name, version),
            None => write!(f, "{}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_code_table() {
        assert_eq!(Verdict::from_result_code(0), Verdict::Clean);
        assert_eq!(Verdict::from_result_code(1), Verdict::NotDetected);
        assert_eq!(Verdict::from_result_code(2), Verdict::NotDetected);
        assert_eq!(Verdict::from_result_code(0x3FFF), Verdict::NotDetected);
        assert_eq!(Verdict::from_result_code(0x4000), Verdict::BlockedByAdmin);
        assert_eq!(Verdict::from_result_code(0x4FFF), Verdict::BlockedByAdmin);
        assert_eq!(Verdict::from_result_code(0x5000), Verdict::NotDetected);
        assert_eq!(Verdict::from_result_code(0x7FFF), Verdict::NotDetected);
        assert_eq!(Verdict::from_result_code(0x8000), Verdict::Detected);
        assert_eq!(Verdict::from_result_code(u32::MAX), Verdict::Detected);
    }

    #[test]
    fn test_verdict_predicates() {
        assert!(Verdict::Clean.is_safe());
        assert!(Verdict::NotDetected.is_safe());
        assert!(!Verdict::Blocked.is_safe());

        assert!(Verdict::Detected.is_decisive());
        assert!(Verdict::BlockedByAdmin.is_decisive());
        assert!(!Verdict::NotDetected.is_decisive());

        assert!(Verdict::ApplicationError.is_retryable());
        assert!(!Verdict::FileNotExists.is_retryable());
    }

    #[test]
    fn test_verdict_serde_name() {
        let json = serde_json::to_string(&Verdict::FileNotExists).unwrap();
        assert_eq!(json, "\"file_not_exists\"");
    }

    #[test]
    fn test_content_hash_display() {
        let hash = ContentHash::new("abc123");
        assert_eq!(format!("{}", hash), "blake3:abc123");
    }

    #[test]
    fn test_detection_engine_display() {
        let engine = DetectionEngine::new("Windows Defender").with_version("1.1.24");
        assert_eq!(engine.to_string(), "Windows Defender 1.1.24");
    }
}
