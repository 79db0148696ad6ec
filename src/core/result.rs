//! Scan results and the builder that produces them.
//!
//! [`ResultBuilder`] is the only place engine outcomes become a
//! [`ScanResult`]. Every constructor attaches the originating
//! [`ScanContext`] unchanged.

use crate::core::context::ScanContext;
use crate::core::error::NativeError;
use crate::core::types::{DetectionEngine, Verdict};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The normalized outcome of one scan call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Unique identifier for this result.
    pub id: String,

    /// The normalized verdict.
    pub verdict: Verdict,

    /// Raw engine result code, when the engine produced one.
    pub result_code: Option<u32>,

    /// Native failure behind an `ApplicationError` verdict.
    pub native_error: Option<NativeError>,

    /// Human-readable detail.
    pub message: Option<String>,

    /// Detection engine the context had resolved to, if known.
    pub engine: Option<DetectionEngine>,

    /// The request this result answers.
    pub context: ScanContext,

    /// Number of attempts the retry policy made.
    pub attempts: u32,

    /// Wall-clock time spent, retries included.
    #[serde(with = "crate::core::config::duration_millis")]
    pub duration: Duration,

    /// When the scan completed.
    pub completed_at: DateTime<Utc>,
}

impl ScanResult {
    fn new(verdict: Verdict, context: ScanContext, engine: Option<DetectionEngine>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            verdict,
            result_code: None,
            native_error: None,
            message: None,
            engine,
            context,
            attempts: 1,
            duration: Duration::ZERO,
            completed_at: Utc::now(),
        }
    }

    /// Returns `true` if the content can be treated as safe.
    pub fn is_safe(&self) -> bool {
        self.verdict.is_safe()
    }

    /// Returns `true` if the engine detected malware.
    pub fn is_detected(&self) -> bool {
        matches!(self.verdict, Verdict::Detected)
    }

    /// Returns `true` if another attempt could change the outcome.
    pub fn is_retryable(&self) -> bool {
        self.verdict.is_retryable()
    }

    pub(crate) fn with_timing(mut self, attempts: u32, duration: Duration) -> Self {
        self.attempts = attempts;
        self.duration = duration;
        self
    }
}

/// Turns engine outcomes into [`ScanResult`] values for one context.
///
/// The builder is borrowed by scan bodies across retries; it holds no
/// native resources.
#[derive(Debug, Clone)]
pub struct ResultBuilder {
    context: ScanContext,
    engine: Option<DetectionEngine>,
}

impl ResultBuilder {
    /// Creates a builder for the given context.
    pub fn new(context: ScanContext) -> Self {
        Self {
            context,
            engine: None,
        }
    }

    /// Records the detection engine on every result built.
    pub fn with_engine(mut self, engine: Option<DetectionEngine>) -> Self {
        self.engine = engine;
        self
    }

    /// Returns the context results are built for.
    pub fn context(&self) -> &ScanContext {
        &self.context
    }

    /// Classifies a raw engine result code.
    pub fn to_result(&self, code: u32) -> ScanResult {
        let mut result = ScanResult::new(
            Verdict::from_result_code(code),
            self.context.clone(),
            self.engine.clone(),
        );
        result.result_code = Some(code);
        result
    }

    /// Maps a failed native call to `ApplicationError`.
    pub fn to_error_result(&self, error: &NativeError) -> ScanResult {
        let mut result = ScanResult::new(
            Verdict::ApplicationError,
            self.context.clone(),
            self.engine.clone(),
        );
        result.message = Some(error.to_string());
        result.native_error = Some(error.clone());
        result
    }

    /// Builds a result from the outcome of a native scan primitive.
    pub fn to_outcome_result(&self, outcome: Result<u32, NativeError>) -> ScanResult {
        match outcome {
            Ok(code) => self.to_result(code),
            Err(error) => self.to_error_result(&error),
        }
    }

    /// Builds a locally determined result.
    pub fn to_local_result(&self, verdict: Verdict, message: impl Into<String>) -> ScanResult {
        let mut result = ScanResult::new(verdict, self.context.clone(), self.engine.clone());
        result.message = Some(message.into());
        result
    }

    /// Builds a `Blocked` result.
    pub fn to_blocked_result(&self, reason: impl Into<String>) -> ScanResult {
        self.to_local_result(Verdict::Blocked, reason)
    }
}
