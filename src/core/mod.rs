//! Core types and traits for the scanbroker library.
//!
//! - [`types`] - Verdicts, content and file types, hashes, result codes
//! - [`traits`] - The `EngineContext` binding boundary
//! - [`error`] - `ScanError` and `NativeError`
//! - [`config`] - `ScanConfig`
//! - [`context`] - `ScanContext`
//! - [`result`] - `ScanResult` and `ResultBuilder`
//! - [`hasher`] - BLAKE3-based content hashing

pub mod config;
pub mod context;
pub mod error;
pub mod hasher;
pub mod result;
pub mod traits;
pub mod types;

pub use config::ScanConfig;
pub use context::ScanContext;
pub use error::{NativeError, ScanError, E_FAIL, E_HANDLE, E_INVALIDARG};
pub use hasher::ContentHasher;
pub use result::{ResultBuilder, ScanResult};
pub use traits::{ArcEngine, EngineContext, SessionHandle, StreamScan};
pub use types::{
    ContentHash, ContentType, DetectionEngine, FileType, Verdict, RESULT_BLOCKED_BY_ADMIN_END,
    RESULT_BLOCKED_BY_ADMIN_START, RESULT_CLEAN, RESULT_DETECTED, RESULT_NOT_DETECTED,
};
