//! Error types for the scanbroker library.
//!
//! Scanning outcomes are never errors: engine failures, missing files and
//! usage mistakes all come back as a [`ScanResult`](crate::core::ScanResult)
//! verdict. The types here cover the few things that can fail hard (opening a
//! session, building a client) and the failure value native bindings report.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// `E_HANDLE`: the binding returned success but handed back a null handle.
pub const E_HANDLE: i32 = 0x8007_0006_u32 as i32;

/// `E_INVALIDARG`.
pub const E_INVALIDARG: i32 = 0x8007_0057_u32 as i32;

/// `E_FAIL`.
pub const E_FAIL: i32 = 0x8000_4005_u32 as i32;

/// A failure reported by the native engine binding.
///
/// `code` is the raw status (an `HRESULT` for AMSI-style engines). The value
/// is kept on `ApplicationError` results for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{operation} failed with 0x{code:08X}: {message}")]
pub struct NativeError {
    /// Name of the native primitive that failed.
    pub operation: String,
    /// Raw status code returned by the primitive.
    pub code: i32,
    /// Human-readable description from the binding.
    pub message: String,
}

impl NativeError {
    /// Creates a new `NativeError`.
    pub fn new(operation: impl Into<String>, code: i32, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            code,
            message: message.into(),
        }
    }

    /// The error used when a primitive succeeds but yields a null handle.
    pub fn invalid_handle(operation: impl Into<String>) -> Self {
        Self::new(operation, E_HANDLE, "the returned handle is invalid")
    }
}

/// Errors that abort an operation instead of producing a verdict.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The native session could not be opened.
    #[error("failed to open scan session (0x{code:08X}): {message}")]
    SessionOpen {
        /// Native status code.
        code: i32,
        /// Description of the failure.
        message: String,
    },

    /// The configuration is unusable.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// A deadline elapsed before the scan completed.
    #[error("scan did not complete within {elapsed:?}")]
    Timeout {
        /// The deadline that elapsed.
        elapsed: Duration,
    },

    /// An internal error occurred.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl ScanError {
    /// Creates a `Configuration` error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the native status code, if this error carries one.
    pub fn native_code(&self) -> Option<i32> {
        match self {
            Self::SessionOpen { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<NativeError> for ScanError {
    fn from(err: NativeError) -> Self {
        Self::SessionOpen {
            code: err.code,
            message: err.to_string(),
        }
    }
}
