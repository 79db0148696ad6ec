//! Client configuration.
//!
//! The settings are plain data with serde support so a host can load them
//! from its own configuration files; the library never reads files itself.

use crate::core::error::ScanError;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default streaming block size (1 MiB).
pub const DEFAULT_BLOCK_SIZE: usize = 1024 * 1024;

/// Scanning configuration shared by every session of a client.
///
/// # Examples
///
/// ```rust
/// use scanbroker::core::ScanConfig;
/// use std::time::Duration;
///
/// let config = ScanConfig::new()
///     .with_retry(3, Duration::from_millis(250))
///     .with_block_size(512 * 1024)
///     .with_blocked_extension("exe");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Skip computing content hashes.
    pub skip_content_hashing: bool,

    /// Maximum scan attempts; `None` means a single attempt.
    pub scan_retry_max_attempts: Option<u32>,

    /// Pause between attempts.
    #[serde(with = "duration_millis")]
    pub scan_retry_attempt_delay: Duration,

    /// Size of the blocks fed to the engine's streaming primitive.
    pub file_scanner_block_size: usize,

    /// Stream ZIP archives that contain encrypted entries instead of
    /// blocking them.
    pub file_scanner_accept_zip_file_with_encrypted_entry: bool,

    /// File extensions rejected before any engine call.
    pub blocked_file_extensions: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            skip_content_hashing: false,
            scan_retry_max_attempts: None,
            scan_retry_attempt_delay: Duration::ZERO,
            file_scanner_block_size: DEFAULT_BLOCK_SIZE,
            file_scanner_accept_zip_file_with_encrypted_entry: false,
            blocked_file_extensions: Vec::new(),
        }
    }
}

impl ScanConfig {
    /// Creates a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON document; missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ScanError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ScanError::configuration(format!("invalid scan configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Enables or disables content hashing.
    pub fn with_skip_content_hashing(mut self, skip: bool) -> Self {
        self.skip_content_hashing = skip;
        self
    }

    /// Sets the retry attempts and delay.
    pub fn with_retry(mut self, max_attempts: u32, delay: Duration) -> Self {
        self.scan_retry_max_attempts = Some(max_attempts);
        self.scan_retry_attempt_delay = delay;
        self
    }

    /// Sets the streaming block size.
    pub fn with_block_size(mut self, size: usize) -> Self {
        self.file_scanner_block_size = size;
        self
    }

    /// Accepts or rejects ZIP archives with encrypted entries.
    pub fn with_accept_encrypted_zip(mut self, accept: bool) -> Self {
        self.file_scanner_accept_zip_file_with_encrypted_entry = accept;
        self
    }

    /// Adds an extension to the blocklist.
    pub fn with_blocked_extension(mut self, extension: impl Into<String>) -> Self {
        self.blocked_file_extensions.push(extension.into());
        self
    }

    /// Number of attempts the retry policy will make.
    pub fn max_attempts(&self) -> u32 {
        self.scan_retry_max_attempts.unwrap_or(1)
    }

    /// Checks the settings that have hard requirements.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.file_scanner_block_size == 0 {
            return Err(ScanError::configuration(
                "file_scanner_block_size must be greater than zero",
            ));
        }
        if self.scan_retry_max_attempts == Some(0) {
            return Err(ScanError::configuration(
                "scan_retry_max_attempts must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Serde helper for `Duration` as integer milliseconds.
pub(crate) mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScanConfig::default();
        assert!(!config.skip_content_hashing);
        assert_eq!(config.max_attempts(), 1);
        assert_eq!(config.scan_retry_attempt_delay, Duration::ZERO);
        assert_eq!(config.file_scanner_block_size, 1024 * 1024);
        assert!(!config.file_scanner_accept_zip_file_with_encrypted_entry);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = ScanConfig::from_json_str(
            r#"{
                "skip_content_hashing": true,
                "scan_retry_max_attempts": 4,
                "scan_retry_attempt_delay": 150,
                "blocked_file_extensions": [".scr"]
            }"#,
        )
        .unwrap();

        assert!(config.skip_content_hashing);
        assert_eq!(config.max_attempts(), 4);
        assert_eq!(config.scan_retry_attempt_delay, Duration::from_millis(150));
        assert_eq!(config.file_scanner_block_size, DEFAULT_BLOCK_SIZE);
        assert_eq!(config.blocked_file_extensions, vec![".scr".to_string()]);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let zero_block = ScanConfig::new().with_block_size(0);
        assert!(matches!(
            zero_block.validate(),
            Err(ScanError::Configuration { .. })
        ));

        let zero_attempts = ScanConfig::new().with_retry(0, Duration::ZERO);
        assert!(zero_attempts.validate().is_err());

        assert!(ScanConfig::from_json_str(r#"{"file_scanner_block_size": 0}"#).is_err());
        assert!(ScanConfig::from_json_str("not json").is_err());
    }
}
