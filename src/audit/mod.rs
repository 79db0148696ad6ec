//! Structured audit logging for scan sessions.
//!
//! This module provides functions for emitting structured audit events
//! using the `tracing` crate under the `scanbroker::audit` target. Events can
//! be captured by any tracing subscriber (JSON file, OpenTelemetry, etc.).
//! Every result a [`ScanSession`](crate::scan::ScanSession) returns is
//! audited.

mod events;

pub use events::{
    emit_scan_completed, emit_session_closed, emit_session_opened, AuditEvent, ScanAuditEvent,
    AUDIT_TARGET,
};
