//! # Scanbroker
//!
//! A session-based scanning layer over a native anti-malware engine context
//! such as Windows AMSI.
//!
//! ## Overview
//!
//! Scanbroker sits between an application and an engine binding, allowing
//! you to:
//!
//! - Scan strings, byte buffers and files through one session API
//! - Stream large files to the engine in fixed-size blocks
//! - Reject missing, blocklisted or encrypted-archive files before any
//!   engine call
//! - Retry transient engine failures with a configurable policy
//! - Correlate every verdict with a content hash and structured audit events
//!
//! ## Quick Start
//!
//! ```rust
//! use scanbroker::prelude::*;
//! use scanbroker::backends::MockEngine;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), ScanError> {
//! let config = ScanConfig::new().with_retry(3, Duration::from_millis(100));
//! let client = ScanClient::new(Arc::new(MockEngine::new()), config)?;
//!
//! let mut session = client.open_session()?;
//! let result = session.scan_buffer(b"file content", "upload.bin");
//!
//! if result.is_safe() {
//!     println!("Content is clean!");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `default` - Includes tokio runtime support and MD5 hashing
//! - `tokio-runtime` - `ScanClient::scan_file_with_deadline`
//! - `md-5` - MD5 content hashes
//! - `sha2` - SHA-256 content hashes
//!
//! ## Architecture
//!
//! The library is organized into several layers:
//!
//! - **Core**: Verdicts, contexts, results, configuration and the
//!   `EngineContext` binding trait
//! - **Scan**: Clients, sessions, retries and the streaming file scanner
//! - **Backends**: Engine bindings (an in-process mock for tests and demos)
//! - **Audit**: Structured logging of sessions and verdicts

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod audit;
pub mod backends;
pub mod core;
pub mod scan;

// Re-export commonly used types at the crate root
pub use crate::core::{
    ContentHash, ContentHasher, ContentType, DetectionEngine, EngineContext, FileType,
    NativeError, ScanConfig, ScanContext, ScanError, ScanResult, Verdict,
};

pub use crate::scan::{RetryPolicy, ScanClient, ScanSession};

/// Prelude module for convenient imports.
///
/// ```rust
/// use scanbroker::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::{
        ContentHash, ContentHasher, ContentType, DetectionEngine, EngineContext, FileType,
        NativeError, ScanConfig, ScanContext, ScanError, ScanResult, Verdict,
    };
    pub use crate::scan::{RetryPolicy, ScanClient, ScanSession};
}
