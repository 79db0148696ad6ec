//! Mock engine binding for testing.
//!
//! `MockEngine` implements [`EngineContext`] entirely in process. It can be
//! scripted to return specific result codes, detect byte signatures, detect
//! on a given stream chunk, or fail individual primitives, and it counts
//! every primitive call so tests can assert what reached the engine.

use crate::core::{
    DetectionEngine, EngineContext, NativeError, SessionHandle, StreamScan, E_FAIL,
    RESULT_CLEAN, RESULT_DETECTED,
};

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

/// The EICAR anti-malware test string.
pub const EICAR: &str = r"X5O!P%@AP[4\PZX54(P^)7CC)7}$EICAR-STANDARD-ANTIVIRUS-TEST-FILE!$H+H*";

/// A scriptable in-process engine.
///
/// # Examples
///
/// ```rust
/// use scanbroker::backends::MockEngine;
/// use scanbroker::core::{NativeError, RESULT_DETECTED, E_FAIL};
///
/// // Reports everything clean except content containing EICAR.
/// let engine = MockEngine::new();
///
/// // First scan fails, second reports a detection.
/// let engine = MockEngine::new()
///     .with_result(Err(NativeError::new("AmsiScanBuffer", E_FAIL, "busy")))
///     .with_result(Ok(RESULT_DETECTED));
/// ```
#[derive(Debug)]
pub struct MockEngine {
    name: String,
    detection_engine: DetectionEngine,
    default_code: u32,
    signatures: Vec<Vec<u8>>,
    scripted: Mutex<VecDeque<Result<u32, NativeError>>>,
    detect_on_chunk: Option<u64>,
    open_session_error: Option<NativeError>,
    null_handle: bool,
    stream_failures: Mutex<VecDeque<NativeError>>,
    detect_failures: Mutex<VecDeque<NativeError>>,
    open_handles: Mutex<HashSet<u64>>,
    next_handle: AtomicU64,
    counters: Counters,
}

#[derive(Debug, Default)]
struct Counters {
    sessions_opened: AtomicU64,
    sessions_closed: AtomicU64,
    invalid_closes: AtomicU64,
    string_scans: AtomicU64,
    buffer_scans: AtomicU64,
    streams_opened: AtomicU64,
    streams_closed: AtomicU64,
    chunks_scanned: AtomicU64,
    bytes_streamed: AtomicU64,
    detect_calls: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockEngine {
    /// Creates a mock engine that reports clean content and detects EICAR.
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            detection_engine: DetectionEngine::new("Mock Engine").with_version("1.0.0"),
            default_code: RESULT_CLEAN,
            signatures: vec![EICAR.as_bytes().to_vec()],
            scripted: Mutex::new(VecDeque::new()),
            detect_on_chunk: None,
            open_session_error: None,
            null_handle: false,
            stream_failures: Mutex::new(VecDeque::new()),
            detect_failures: Mutex::new(VecDeque::new()),
            open_handles: Mutex::new(HashSet::new()),
            next_handle: AtomicU64::new(1),
            counters: Counters::default(),
        }
    }

    /// Sets the context name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the engine reported by negotiation.
    pub fn with_detection_engine(mut self, engine: DetectionEngine) -> Self {
        self.detection_engine = engine;
        self
    }

    /// Sets the code returned for content that matches nothing.
    pub fn with_default_code(mut self, code: u32) -> Self {
        self.default_code = code;
        self
    }

    /// Adds a byte signature that triggers `RESULT_DETECTED`.
    pub fn with_signature(mut self, signature: impl Into<Vec<u8>>) -> Self {
        self.signatures.push(signature.into());
        self
    }

    /// Queues an outcome for the next string or buffer scan.
    pub fn with_result(self, outcome: Result<u32, NativeError>) -> Self {
        self.push_result(outcome);
        self
    }

    /// Reports a detection on the given (1-based) stream chunk.
    pub fn with_detection_on_chunk(mut self, chunk: u64) -> Self {
        self.detect_on_chunk = Some(chunk);
        self
    }

    /// Makes every `open_session` call fail.
    pub fn with_open_session_error(mut self, error: NativeError) -> Self {
        self.open_session_error = Some(error);
        self
    }

    /// Makes `open_session` succeed with a null handle.
    pub fn with_null_handle(mut self) -> Self {
        self.null_handle = true;
        self
    }

    /// Makes the next `count` stream opens fail.
    pub fn with_stream_failures(self, count: usize) -> Self {
        for _ in 0..count {
            self.fail_next_stream(NativeError::new("AmsiOpenStream", E_FAIL, "stream busy"));
        }
        self
    }

    /// Makes the next `count` engine negotiations fail.
    pub fn with_detect_failures(self, count: usize) -> Self {
        let mut failures = lock(&self.detect_failures);
        for _ in 0..count {
            failures.push_back(NativeError::new(
                "DetermineDetectionEngine",
                E_FAIL,
                "security center unavailable",
            ));
        }
        drop(failures);
        self
    }

    /// Queues an outcome for the next string or buffer scan.
    pub fn push_result(&self, outcome: Result<u32, NativeError>) {
        lock(&self.scripted).push_back(outcome);
    }

    /// Makes the next stream open fail with `error`.
    pub fn fail_next_stream(&self, error: NativeError) {
        lock(&self.stream_failures).push_back(error);
    }

    /// Sessions opened so far.
    pub fn sessions_opened(&self) -> u64 {
        self.counters.sessions_opened.load(Ordering::SeqCst)
    }

    /// Sessions closed so far.
    pub fn sessions_closed(&self) -> u64 {
        self.counters.sessions_closed.load(Ordering::SeqCst)
    }

    /// Close calls for handles that were not open.
    pub fn invalid_closes(&self) -> u64 {
        self.counters.invalid_closes.load(Ordering::SeqCst)
    }

    /// String scans performed.
    pub fn string_scans(&self) -> u64 {
        self.counters.string_scans.load(Ordering::SeqCst)
    }

    /// Buffer scans performed.
    pub fn buffer_scans(&self) -> u64 {
        self.counters.buffer_scans.load(Ordering::SeqCst)
    }

    /// Streams opened so far, failed opens included.
    pub fn streams_opened(&self) -> u64 {
        self.counters.streams_opened.load(Ordering::SeqCst)
    }

    /// Streams released so far.
    pub fn streams_closed(&self) -> u64 {
        self.counters.streams_closed.load(Ordering::SeqCst)
    }

    /// Chunks fed to streams so far.
    pub fn chunks_scanned(&self) -> u64 {
        self.counters.chunks_scanned.load(Ordering::SeqCst)
    }

    /// Bytes fed to streams so far.
    pub fn bytes_streamed(&self) -> u64 {
        self.counters.bytes_streamed.load(Ordering::SeqCst)
    }

    /// Engine negotiations performed.
    pub fn detect_calls(&self) -> u64 {
        self.counters.detect_calls.load(Ordering::SeqCst)
    }

    /// Total scan primitive invocations (string, buffer and stream opens).
    pub fn scan_calls(&self) -> u64 {
        self.string_scans() + self.buffer_scans() + self.streams_opened()
    }

    fn code_for(&self, content: &[u8]) -> u32 {
        if self.matches_signature(content) {
            RESULT_DETECTED
        } else {
            self.default_code
        }
    }

    fn matches_signature(&self, content: &[u8]) -> bool {
        self.signatures.iter().any(|sig| {
            !sig.is_empty() && content.windows(sig.len()).any(|window| window == sig.as_slice())
        })
    }

    fn check_open(&self, session: SessionHandle, operation: &str) -> Result<(), NativeError> {
        if lock(&self.open_handles).contains(&session.as_raw()) {
            Ok(())
        } else {
            Err(NativeError::invalid_handle(operation))
        }
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineContext for MockEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn open_session(&self) -> Result<SessionHandle, NativeError> {
        if let Some(error) = &self.open_session_error {
            return Err(error.clone());
        }
        if self.null_handle {
            return Ok(SessionHandle::NULL);
        }
        let raw = self.next_handle.fetch_add(1, Ordering::SeqCst);
        lock(&self.open_handles).insert(raw);
        self.counters.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(SessionHandle::from_raw(raw))
    }

    fn close_session(&self, session: SessionHandle) {
        if lock(&self.open_handles).remove(&session.as_raw()) {
            self.counters.sessions_closed.fetch_add(1, Ordering::SeqCst);
        } else {
            self.counters.invalid_closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn scan_string(
        &self,
        content: &str,
        _content_name: &str,
        session: SessionHandle,
    ) -> Result<u32, NativeError> {
        self.counters.string_scans.fetch_add(1, Ordering::SeqCst);
        self.check_open(session, "AmsiScanString")?;
        if let Some(outcome) = lock(&self.scripted).pop_front() {
            return outcome;
        }
        Ok(self.code_for(content.as_bytes()))
    }

    fn scan_buffer(
        &self,
        buffer: &[u8],
        _content_name: &str,
        session: SessionHandle,
    ) -> Result<u32, NativeError> {
        self.counters.buffer_scans.fetch_add(1, Ordering::SeqCst);
        self.check_open(session, "AmsiScanBuffer")?;
        if let Some(outcome) = lock(&self.scripted).pop_front() {
            return outcome;
        }
        Ok(self.code_for(buffer))
    }

    fn open_stream(
        &self,
        _content_name: &str,
        _content_length: u64,
    ) -> Result<Box<dyn StreamScan + '_>, NativeError> {
        self.counters.streams_opened.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = lock(&self.stream_failures).pop_front() {
            return Err(error);
        }
        Ok(Box::new(MockStream {
            engine: self,
            chunks: 0,
            worst: self.default_code,
        }))
    }

    fn detect_engine(&self) -> Result<DetectionEngine, NativeError> {
        self.counters.detect_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = lock(&self.detect_failures).pop_front() {
            return Err(error);
        }
        Ok(self.detection_engine.clone())
    }
}

struct MockStream<'a> {
    engine: &'a MockEngine,
    chunks: u64,
    worst: u32,
}

impl StreamScan for MockStream<'_> {
    fn scan_chunk(&mut self, chunk: &[u8], _offset: u64) -> Result<u32, NativeError> {
        self.chunks += 1;
        let counters = &self.engine.counters;
        counters.chunks_scanned.fetch_add(1, Ordering::SeqCst);
        counters
            .bytes_streamed
            .fetch_add(chunk.len() as u64, Ordering::SeqCst);

        let code = if self.engine.detect_on_chunk == Some(self.chunks) {
            RESULT_DETECTED
        } else {
            self.engine.code_for(chunk)
        };
        self.worst = self.worst.max(code);
        Ok(code)
    }

    fn finish(&mut self) -> Result<u32, NativeError> {
        Ok(self.worst)
    }
}

impl Drop for MockStream<'_> {
    fn drop(&mut self) {
        self.engine
            .counters
            .streams_closed
            .fetch_add(1, Ordering::SeqCst);
    }
}
