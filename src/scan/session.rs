//! Scan sessions.
//!
//! A [`ScanSession`] owns one native session handle and runs string, buffer
//! and file scans against it. Every scan body runs under the client's retry
//! policy and every result is audited before it is returned.
//!
//! # Invariants
//! - The native handle is released exactly once: by [`ScanSession::close`]
//!   or on drop, whichever comes first.
//! - Scans take `&mut self`, so a handle never serves two scans at once.
//! - Scans never return `Err`; engine failures become `ApplicationError`.

use crate::audit;
use crate::core::{
    ArcEngine, ContentType, EngineContext, NativeError, ResultBuilder, ScanContext, ScanResult,
    SessionHandle, Verdict,
};
use crate::scan::client::ScanClient;
use crate::scan::signature::FileSignatureReader;
use crate::scan::stream::StreamingFileScanner;

use std::path::Path;
use std::time::Instant;

/// Releases a native session handle at most once.
#[derive(Debug)]
struct HandleGuard {
    engine: ArcEngine,
    handle: Option<SessionHandle>,
}

impl HandleGuard {
    fn handle(&self) -> Option<SessionHandle> {
        self.handle
    }

    /// Returns `true` if this call released the handle.
    fn release(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                self.engine.close_session(handle);
                true
            }
            None => false,
        }
    }
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// An open scan session.
///
/// Created by [`ScanClient::open_session`].
#[derive(Debug)]
pub struct ScanSession {
    id: String,
    client: ScanClient,
    guard: HandleGuard,
}

impl ScanSession {
    pub(crate) fn new(client: ScanClient, handle: SessionHandle) -> Self {
        let guard = HandleGuard {
            engine: client.engine_arc(),
            handle: Some(handle),
        };
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            client,
            guard,
        }
    }

    /// Returns the session ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns `true` once the session has been closed.
    pub fn is_closed(&self) -> bool {
        self.guard.handle().is_none()
    }

    /// Releases the native session. Further calls do nothing.
    pub fn close(&mut self) {
        if self.guard.release() {
            audit::emit_session_closed(&self.id, self.client.engine().name());
        }
    }

    /// Scans a string.
    ///
    /// The recorded length counts four bytes per UTF-16 code unit of the
    /// text the engine receives; the hash covers the UTF-8 bytes.
    pub fn scan_string(&mut self, content: &str, content_name: &str) -> ScanResult {
        let length = content.encode_utf16().count() as u64 * 4;
        let context = self.context(content_name, ContentType::String, length, content.as_bytes());
        self.run(context, |engine, handle| {
            engine.scan_string(content, content_name, handle)
        })
    }

    /// Scans a byte buffer.
    pub fn scan_buffer(&mut self, buffer: &[u8], content_name: &str) -> ScanResult {
        let context = self.context(
            content_name,
            ContentType::ByteArray,
            buffer.len() as u64,
            buffer,
        );
        self.run(context, |engine, handle| {
            engine.scan_buffer(buffer, content_name, handle)
        })
    }

    /// Scans the first `length` bytes of `buffer`.
    ///
    /// A `length` beyond the buffer is reported as `ApplicationError`
    /// without calling the engine.
    pub fn scan_buffer_with_length(
        &mut self,
        buffer: &[u8],
        length: usize,
        content_name: &str,
    ) -> ScanResult {
        match buffer.get(..length) {
            Some(prefix) => self.scan_buffer(prefix, content_name),
            None => {
                let context = ScanContext::new(
                    self.client.engine().name(),
                    content_name,
                    ContentType::ByteArray,
                    length as u64,
                )
                .with_session_id(self.id.as_str());
                let result = self.builder(context).to_local_result(
                    Verdict::ApplicationError,
                    format!(
                        "length {length} exceeds buffer size {}",
                        buffer.len()
                    ),
                );
                self.complete(result)
            }
        }
    }

    /// Scans a file through the engine's streaming primitive.
    ///
    /// Missing files yield `FileNotExists` and blocked files yield `Blocked`,
    /// in both cases without any scan primitive being invoked.
    pub fn scan_file(&mut self, path: impl AsRef<Path>) -> ScanResult {
        let path = path.as_ref();
        let client = self.client.clone();
        let config = client.config();

        let base = ScanContext::new(
            client.engine().name(),
            path.display().to_string(),
            ContentType::File,
            0,
        );
        if self.is_closed() {
            return self.closed_result(self.builder(base));
        }

        let detection_engine = client.ensure_detection_engine();
        let signature = FileSignatureReader::new(path, &config.blocked_file_extensions);
        let builder = ResultBuilder::new(base.with_file_type(signature.file_type()))
            .with_engine(detection_engine.clone());

        if !signature.file_exists() {
            let result = builder.to_local_result(
                Verdict::FileNotExists,
                format!("File not found at {}", path.display()),
            );
            return self.complete(result);
        }
        if let Some(reason) = signature.blocked_reason() {
            return self.complete(builder.to_blocked_result(reason));
        }

        let scanner = StreamingFileScanner::new(
            client.engine(),
            path,
            config.file_scanner_block_size,
            config.file_scanner_accept_zip_file_with_encrypted_entry,
        )
        .with_file_type(signature.file_type())
        .with_hasher(client.hasher())
        .with_detection_engine(detection_engine);

        let started = Instant::now();
        let (result, attempts) = client
            .retry_policy()
            .execute(|| scanner.scan(), ScanResult::is_retryable);
        self.complete(result.with_timing(attempts, started.elapsed()))
    }

    fn context(
        &self,
        content_name: &str,
        content_type: ContentType,
        length: u64,
        content: &[u8],
    ) -> ScanContext {
        let hash = self.client.hasher().map(|hasher| hasher.hash_bytes(content));
        ScanContext::new(self.client.engine().name(), content_name, content_type, length)
            .with_session_id(self.id.as_str())
            .with_content_hash(hash)
    }

    fn builder(&self, context: ScanContext) -> ResultBuilder {
        ResultBuilder::new(context).with_engine(self.client.detection_engine())
    }

    /// Runs a session primitive under the retry policy.
    fn run<F>(&mut self, context: ScanContext, primitive: F) -> ScanResult
    where
        F: Fn(&dyn EngineContext, SessionHandle) -> Result<u32, NativeError>,
    {
        let builder = self.builder(context);
        let Some(handle) = self.guard.handle() else {
            return self.closed_result(builder);
        };

        let engine = self.client.engine();
        let started = Instant::now();
        let (result, attempts) = self.client.retry_policy().execute(
            || builder.to_outcome_result(primitive(engine, handle)),
            ScanResult::is_retryable,
        );
        self.complete(result.with_timing(attempts, started.elapsed()))
    }

    fn closed_result(&self, builder: ResultBuilder) -> ScanResult {
        self.complete(builder.to_local_result(Verdict::ApplicationError, "session is closed"))
    }

    fn complete(&self, result: ScanResult) -> ScanResult {
        audit::emit_scan_completed(&result);
        result
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{MockEngine, EICAR};
    use crate::core::{
        ContentHasher, ScanConfig, E_FAIL, RESULT_BLOCKED_BY_ADMIN_START, RESULT_NOT_DETECTED,
    };
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn setup(engine: MockEngine, config: ScanConfig) -> (Arc<MockEngine>, ScanSession) {
        let engine = Arc::new(engine);
        let client = ScanClient::new(engine.clone(), config).unwrap();
        let session = client.open_session().unwrap();
        (engine, session)
    }

    fn busy() -> NativeError {
        NativeError::new("AmsiScanBuffer", E_FAIL, "engine busy")
    }

    #[test]
    fn test_scan_buffer_records_exact_length() {
        let (_, mut session) = setup(MockEngine::new(), ScanConfig::default());

        for size in [0usize, 1, 17, 4096] {
            let buffer = vec![0x41u8; size];
            let result = session.scan_buffer(&buffer, "buffer");

            assert_eq!(result.context.content_length, size as u64);
            assert_eq!(result.context.content_type, ContentType::ByteArray);
            assert_eq!(result.context.session_id.as_deref(), Some(session.id()));
        }
    }

    #[test]
    fn test_scan_string_length_is_four_bytes_per_utf16_unit() {
        let (engine, mut session) = setup(MockEngine::new(), ScanConfig::default());

        assert_eq!(session.scan_string("abc", "abc").context.content_length, 12);
        assert_eq!(session.scan_string("", "empty").context.content_length, 0);
        // U+1F600 is a surrogate pair: two code units.
        assert_eq!(session.scan_string("\u{1F600}", "emoji").context.content_length, 8);

        let result = session.scan_string("héllo", "greeting");
        assert_eq!(result.context.content_length, 20);
        assert_eq!(result.context.content_type, ContentType::String);
        assert_eq!(result.verdict, Verdict::Clean);
        assert_eq!(engine.string_scans(), 4);

        let result = session.scan_string(EICAR, "eicar");
        assert!(result.is_detected());
    }

    #[test]
    fn test_hashing_enabled_is_deterministic() {
        let (_, mut session) = setup(MockEngine::new(), ScanConfig::default());
        let expected = ContentHasher::new().hash_bytes(b"payload");

        let first = session.scan_buffer(b"payload", "a");
        let second = session.scan_buffer(b"payload", "b");
        let string = session.scan_string("payload", "c");

        assert_eq!(first.context.content_hash, Some(expected.clone()));
        assert_eq!(second.context.content_hash, Some(expected.clone()));
        assert_eq!(string.context.content_hash, Some(expected));
    }

    #[test]
    fn test_skip_content_hashing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("file.bin");
        std::fs::write(&path, b"payload").unwrap();
        let config = ScanConfig::new().with_skip_content_hashing(true);
        let (_, mut session) = setup(MockEngine::new(), config);

        assert!(session.scan_buffer(b"payload", "a").context.content_hash.is_none());
        assert!(session.scan_string("payload", "b").context.content_hash.is_none());
        assert!(session.scan_file(&path).context.content_hash.is_none());
    }

    #[test]
    fn test_scan_buffer_with_length() {
        let (engine, mut session) = setup(MockEngine::new(), ScanConfig::default());
        let buffer = b"0123456789";

        let result = session.scan_buffer_with_length(buffer, 4, "prefix");
        assert_eq!(result.context.content_length, 4);
        assert_eq!(
            result.context.content_hash,
            Some(ContentHasher::new().hash_bytes(b"0123"))
        );

        let result = session.scan_buffer_with_length(buffer, 11, "overrun");
        assert_eq!(result.verdict, Verdict::ApplicationError);
        assert!(result.message.unwrap().contains("exceeds buffer size 10"));
        assert_eq!(engine.buffer_scans(), 1);
    }

    #[test]
    fn test_engine_error_is_retried() {
        let engine = MockEngine::new()
            .with_result(Err(busy()))
            .with_result(Err(busy()))
            .with_result(Ok(RESULT_NOT_DETECTED));
        let config = ScanConfig::new().with_retry(3, Duration::ZERO);
        let (engine, mut session) = setup(engine, config);

        let result = session.scan_buffer(b"data", "data");

        assert_eq!(result.verdict, Verdict::NotDetected);
        assert_eq!(result.attempts, 3);
        assert_eq!(engine.buffer_scans(), 3);
    }

    #[test]
    fn test_engine_error_surfaces_after_attempts() {
        let engine = MockEngine::new()
            .with_result(Err(busy()))
            .with_result(Err(busy()));
        let config = ScanConfig::new().with_retry(2, Duration::ZERO);
        let (engine, mut session) = setup(engine, config);

        let result = session.scan_buffer(b"data", "data");

        assert_eq!(result.verdict, Verdict::ApplicationError);
        assert_eq!(result.native_error, Some(busy()));
        assert_eq!(result.attempts, 2);
        assert_eq!(engine.buffer_scans(), 2);
    }

    #[test]
    fn test_single_attempt_by_default() {
        let engine = MockEngine::new().with_result(Err(busy()));
        let (engine, mut session) = setup(engine, ScanConfig::default());

        let result = session.scan_buffer(b"data", "data");
        assert_eq!(result.verdict, Verdict::ApplicationError);
        assert_eq!(engine.buffer_scans(), 1);
    }

    #[test]
    fn test_decisive_verdicts_are_not_retried() {
        let engine = MockEngine::new().with_result(Ok(RESULT_BLOCKED_BY_ADMIN_START));
        let config = ScanConfig::new().with_retry(5, Duration::ZERO);
        let (engine, mut session) = setup(engine, config);

        let result = session.scan_buffer(b"data", "data");
        assert_eq!(result.verdict, Verdict::BlockedByAdmin);
        assert_eq!(engine.buffer_scans(), 1);
    }

    #[test]
    fn test_scan_file_missing_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.bin");
        let (engine, mut session) = setup(MockEngine::new(), ScanConfig::default());

        let result = session.scan_file(&path);

        assert_eq!(result.verdict, Verdict::FileNotExists);
        assert_eq!(
            result.message.unwrap(),
            format!("File not found at {}", path.display())
        );
        assert_eq!(engine.scan_calls(), 0);
        assert_eq!(engine.detect_calls(), 1);
    }

    #[test]
    fn test_scan_file_blocked_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tool.exe");
        std::fs::write(&path, EICAR).unwrap();
        let config = ScanConfig::new().with_blocked_extension("exe");
        let (engine, mut session) = setup(MockEngine::new(), config);

        let result = session.scan_file(&path);

        assert_eq!(result.verdict, Verdict::Blocked);
        assert_eq!(engine.scan_calls(), 0);
    }

    #[test]
    fn test_scan_file_streams_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sample.txt");
        let content = format!("header\n{EICAR}\nfooter");
        std::fs::write(&path, &content).unwrap();
        let config = ScanConfig::new().with_block_size(1024);
        let (engine, mut session) = setup(MockEngine::new(), config);

        let result = session.scan_file(&path);

        assert!(result.is_detected());
        assert_eq!(result.context.content_length, content.len() as u64);
        assert_eq!(result.engine.unwrap().name, "Mock Engine");
        assert_eq!(engine.streams_opened(), 1);
        assert_eq!(engine.streams_closed(), 1);
    }

    #[test]
    fn test_scan_file_retries_stream_failures() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sample.bin");
        std::fs::write(&path, b"benign").unwrap();
        let config = ScanConfig::new().with_retry(3, Duration::ZERO);
        let (engine, mut session) = setup(MockEngine::new().with_stream_failures(2), config);

        let result = session.scan_file(&path);

        assert_eq!(result.verdict, Verdict::Clean);
        assert_eq!(result.attempts, 3);
        assert_eq!(engine.streams_opened(), 3);
    }

    #[test]
    fn test_close_releases_once() {
        let engine = Arc::new(MockEngine::new());
        let client = ScanClient::new(engine.clone(), ScanConfig::default()).unwrap();
        let mut session = client.open_session().unwrap();

        session.close();
        session.close();
        assert!(session.is_closed());
        drop(session);

        assert_eq!(engine.sessions_opened(), 1);
        assert_eq!(engine.sessions_closed(), 1);
        assert_eq!(engine.invalid_closes(), 0);
    }

    #[test]
    fn test_drop_releases_handle() {
        let engine = Arc::new(MockEngine::new());
        let client = ScanClient::new(engine.clone(), ScanConfig::default()).unwrap();
        {
            let _session = client.open_session().unwrap();
        }
        assert_eq!(engine.sessions_closed(), 1);
    }

    #[test]
    fn test_scan_after_close() {
        let (engine, mut session) = setup(MockEngine::new(), ScanConfig::default());
        session.close();

        let result = session.scan_buffer(b"data", "data");
        assert_eq!(result.verdict, Verdict::ApplicationError);
        assert_eq!(result.message.as_deref(), Some("session is closed"));

        let result = session.scan_file("/does/not/matter");
        assert_eq!(result.verdict, Verdict::ApplicationError);
        assert_eq!(engine.scan_calls(), 0);
        assert_eq!(engine.detect_calls(), 0);
    }

    #[test]
    fn test_sessions_are_independent() {
        let engine = Arc::new(MockEngine::new());
        let client = ScanClient::new(engine.clone(), ScanConfig::default()).unwrap();
        let mut first = client.open_session().unwrap();
        let mut second = client.open_session().unwrap();
        assert_ne!(first.id(), second.id());

        first.close();
        assert_eq!(second.scan_string("still open", "s").verdict, Verdict::Clean);
    }

    #[test]
    fn test_session_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<ScanSession>();
    }
}
