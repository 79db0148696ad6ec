//! Scan orchestration.
//!
//! - [`client`] - `ScanClient`, which owns the engine context
//! - [`session`] - `ScanSession` and its string, buffer and file scans
//! - [`retry`] - `RetryPolicy` for transient engine failures
//! - [`stream`] - `StreamingFileScanner`, the chunked file feed
//! - [`signature`] - `FileSignatureReader` pre-checks
//! - [`archive`] - Encrypted ZIP entry detection

pub mod archive;
pub mod client;
pub mod retry;
pub mod session;
pub mod signature;
pub mod stream;

pub use archive::has_encrypted_entry;
pub use client::ScanClient;
pub use retry::{retry, RetryPolicy};
pub use session::ScanSession;
pub use signature::{file_type_from_path, sniff_file_type, FileSignatureReader};
pub use stream::StreamingFileScanner;
