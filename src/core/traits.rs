//! The boundary between the orchestration layer and a native engine binding.
//!
//! A binding wraps one process-wide engine context (for AMSI: the
//! `HAMSICONTEXT` from `AmsiInitialize`) and exposes the session and scan
//! primitives on it. Everything above this trait is engine-agnostic.

use crate::core::error::NativeError;
use crate::core::types::DetectionEngine;

use std::fmt::Debug;
use std::sync::Arc;

/// Opaque native session handle.
///
/// Zero is the null handle. Only [`EngineContext`] implementations create
/// handles; the crate releases each one exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle(u64);

impl SessionHandle {
    /// The null handle.
    pub const NULL: Self = Self(0);

    /// Wraps a raw handle value.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw handle value.
    pub fn as_raw(&self) -> u64 {
        self.0
    }

    /// Returns `true` unless this is the null handle.
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

/// A native engine context and its scan primitives.
///
/// # Implementation Notes
///
/// - Implementations must be `Send + Sync`; one context is shared by every
///   session of a [`ScanClient`](crate::scan::ScanClient).
/// - A session handle is never used by two calls at once; the orchestration
///   layer guarantees this, bindings need not lock per handle.
/// - Primitives report failures as [`NativeError`] and never panic.
/// - Result codes follow the AMSI_RESULT contract (see
///   [`Verdict::from_result_code`](crate::core::Verdict::from_result_code)).
pub trait EngineContext: Send + Sync + Debug {
    /// Returns the application name the context was initialized with.
    fn name(&self) -> &str;

    /// Opens a new scan session.
    fn open_session(&self) -> Result<SessionHandle, NativeError>;

    /// Releases a session opened by [`open_session`](Self::open_session).
    fn close_session(&self, session: SessionHandle);

    /// Scans a string within a session.
    fn scan_string(
        &self,
        content: &str,
        content_name: &str,
        session: SessionHandle,
    ) -> Result<u32, NativeError>;

    /// Scans a byte buffer within a session.
    fn scan_buffer(
        &self,
        buffer: &[u8],
        content_name: &str,
        session: SessionHandle,
    ) -> Result<u32, NativeError>;

    /// Opens a streaming scan for one logical file.
    ///
    /// The returned stream is released when dropped.
    fn open_stream(
        &self,
        content_name: &str,
        content_length: u64,
    ) -> Result<Box<dyn StreamScan + '_>, NativeError>;

    /// Queries (and if needed forces) the active detection engine.
    ///
    /// Must be idempotent; callers may invoke it more than once.
    fn detect_engine(&self) -> Result<DetectionEngine, NativeError>;
}

/// An open streaming scan fed with sequential chunks of one file.
pub trait StreamScan {
    /// Scans the next chunk, which starts at `offset` in the file.
    ///
    /// Returns the engine's result code for the content seen so far.
    fn scan_chunk(&mut self, chunk: &[u8], offset: u64) -> Result<u32, NativeError>;

    /// Ends the stream and returns the final result code.
    fn finish(&mut self) -> Result<u32, NativeError>;
}

/// A shared engine context.
pub type ArcEngine = Arc<dyn EngineContext>;
