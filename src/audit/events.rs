//! Audit event types and emission functions.

use crate::core::{ScanResult, Verdict};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tracing target shared by every audit event.
pub const AUDIT_TARGET: &str = "scanbroker::audit";

/// Base trait for audit events.
pub trait AuditEvent: Serialize {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;

    /// Returns the timestamp of the event.
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Audit record for a completed scan.
///
/// Hosts that persist audit trails themselves can build this from a
/// [`ScanResult`] instead of scraping tracing output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanAuditEvent {
    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Unique result ID.
    pub scan_id: String,

    /// Session that performed the scan, if any.
    pub session_id: Option<String>,

    /// Registering application.
    pub app_name: String,

    /// Content name or file path.
    pub content_name: String,

    /// Content type.
    pub content_type: String,

    /// Content length in bytes.
    pub content_length: u64,

    /// Content hash (BLAKE3), if computed.
    pub content_hash_blake3: Option<String>,

    /// Normalized verdict.
    pub verdict: Verdict,

    /// Raw engine result code.
    pub result_code: Option<u32>,

    /// Detection engine, if negotiated.
    pub engine: Option<String>,

    /// Attempts made by the retry policy.
    pub attempts: u32,

    /// Scan duration in milliseconds.
    pub duration_ms: u64,
}

impl From<&ScanResult> for ScanAuditEvent {
    fn from(result: &ScanResult) -> Self {
        Self {
            timestamp: result.completed_at,
            scan_id: result.id.clone(),
            session_id: result.context.session_id.clone(),
            app_name: result.context.app_name.clone(),
            content_name: result.context.content_name.clone(),
            content_type: result.context.content_type.to_string(),
            content_length: result.context.content_length,
            content_hash_blake3: result.context.content_hash.as_ref().map(|h| h.blake3.clone()),
            verdict: result.verdict,
            result_code: result.result_code,
            engine: result.engine.as_ref().map(ToString::to_string),
            attempts: result.attempts,
            duration_ms: result.duration.as_millis() as u64,
        }
    }
}

impl AuditEvent for ScanAuditEvent {
    fn event_type(&self) -> &'static str {
        "scan_completed"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Emits an audit event for a newly opened session.
pub fn emit_session_opened(session_id: &str, app_name: &str) {
    tracing::info!(
        target: AUDIT_TARGET,
        event_type = "session_opened",
        session_id = %session_id,
        app_name = %app_name,
        "Scan session opened"
    );
}

/// Emits an audit event for a released session.
pub fn emit_session_closed(session_id: &str, app_name: &str) {
    tracing::info!(
        target: AUDIT_TARGET,
        event_type = "session_closed",
        session_id = %session_id,
        app_name = %app_name,
        "Scan session closed"
    );
}

/// Emits an audit event for a completed scan.
pub fn emit_scan_completed(result: &ScanResult) {
    let context = &result.context;
    let hash = context.content_hash.as_ref().map(|h| h.blake3.as_str());

    tracing::info!(
        target: AUDIT_TARGET,
        event_type = "scan_completed",
        scan_id = %result.id,
        session_id = ?context.session_id,
        app_name = %context.app_name,
        content_name = %context.content_name,
        content_type = %context.content_type,
        content_length = context.content_length,
        content_hash_blake3 = ?hash,
        verdict = %result.verdict,
        result_code = ?result.result_code,
        engine = ?result.engine.as_ref().map(ToString::to_string),
        attempts = result.attempts,
        duration_ms = result.duration.as_millis() as u64,
        "Scan completed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ContentHasher, ContentType, DetectionEngine, ResultBuilder, ScanContext};
    use std::time::Duration;

    fn sample_result() -> ScanResult {
        let context = ScanContext::new("audit-test", "payload", ContentType::ByteArray, 5)
            .with_session_id("session-1")
            .with_content_hash(Some(ContentHasher::new().hash_bytes(b"hello")));
        ResultBuilder::new(context)
            .with_engine(Some(DetectionEngine::new("Mock Engine").with_version("1.0.0")))
            .to_result(0x8000)
            .with_timing(2, Duration::from_millis(30))
    }

    #[test]
    fn test_scan_audit_event_from_result() {
        let result = sample_result();
        let event = ScanAuditEvent::from(&result);

        assert_eq!(event.event_type(), "scan_completed");
        assert_eq!(event.scan_id, result.id);
        assert_eq!(event.session_id.as_deref(), Some("session-1"));
        assert_eq!(event.content_type, "byte_array");
        assert_eq!(event.verdict, Verdict::Detected);
        assert_eq!(event.result_code, Some(0x8000));
        assert_eq!(event.engine.as_deref(), Some("Mock Engine 1.0.0"));
        assert_eq!(event.attempts, 2);
        assert_eq!(event.duration_ms, 30);
        assert!(event.content_hash_blake3.is_some());
    }

    #[test]
    fn test_emit_without_subscriber() {
        // Must not panic without a subscriber installed.
        emit_session_opened("session-1", "audit-test");
        emit_scan_completed(&sample_result());
        emit_session_closed("session-1", "audit-test");
    }
}
