//! The client that owns an engine context and opens sessions on it.

use crate::audit;
use crate::core::{
    ArcEngine, ContentHasher, DetectionEngine, EngineContext, ScanConfig, ScanError, E_HANDLE,
};
use crate::scan::retry::RetryPolicy;
use crate::scan::session::ScanSession;

use std::sync::{Arc, OnceLock};

#[cfg(feature = "tokio-runtime")]
use crate::core::ScanResult;
#[cfg(feature = "tokio-runtime")]
use std::path::PathBuf;
#[cfg(feature = "tokio-runtime")]
use std::time::Duration;

/// Entry point for scanning against one engine context.
///
/// Cloning is cheap; every clone shares the context, the configuration and
/// the negotiated detection engine.
///
/// # Examples
///
/// ```rust
/// use scanbroker::backends::{MockEngine, EICAR};
/// use scanbroker::core::ScanConfig;
/// use scanbroker::scan::ScanClient;
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), scanbroker::core::ScanError> {
/// let client = ScanClient::new(Arc::new(MockEngine::new()), ScanConfig::default())?;
/// let mut session = client.open_session()?;
///
/// let result = session.scan_string(EICAR, "eicar.txt");
/// assert!(result.is_detected());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ScanClient {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    context: ArcEngine,
    config: ScanConfig,
    hasher: ContentHasher,
    detection_engine: OnceLock<DetectionEngine>,
}

impl ScanClient {
    /// Creates a client after validating `config`.
    pub fn new(context: ArcEngine, config: ScanConfig) -> Result<Self, ScanError> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(ClientInner {
                context,
                config,
                hasher: ContentHasher::new(),
                detection_engine: OnceLock::new(),
            }),
        })
    }

    /// Replaces the content hasher.
    pub fn with_hasher(self, hasher: ContentHasher) -> Self {
        let inner = &self.inner;
        Self {
            inner: Arc::new(ClientInner {
                context: Arc::clone(&inner.context),
                config: inner.config.clone(),
                hasher,
                detection_engine: inner.detection_engine.clone(),
            }),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ScanConfig {
        &self.inner.config
    }

    /// Returns the engine context.
    pub fn engine(&self) -> &dyn EngineContext {
        self.inner.context.as_ref()
    }

    /// Opens a new session.
    ///
    /// Fails with [`ScanError::SessionOpen`] when the binding reports an
    /// error or hands back a null handle. Session opening is not retried.
    pub fn open_session(&self) -> Result<ScanSession, ScanError> {
        let handle = self.inner.context.open_session()?;
        if !handle.is_valid() {
            return Err(ScanError::SessionOpen {
                code: E_HANDLE,
                message: "engine returned a null session handle".to_string(),
            });
        }

        let session = ScanSession::new(self.clone(), handle);
        audit::emit_session_opened(session.id(), self.inner.context.name());
        Ok(session)
    }

    /// Returns the detection engine, negotiating it on first use.
    ///
    /// A successful negotiation is remembered for the life of the client; a
    /// failed one is logged and attempted again on the next call.
    pub fn ensure_detection_engine(&self) -> Option<DetectionEngine> {
        if let Some(engine) = self.inner.detection_engine.get() {
            return Some(engine.clone());
        }

        match self.inner.context.detect_engine() {
            Ok(engine) => {
                // A concurrent caller may have won; its value is equivalent.
                let engine = self.inner.detection_engine.get_or_init(|| engine);
                tracing::debug!(engine = %engine, "Detection engine negotiated");
                Some(engine.clone())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Detection engine negotiation failed");
                None
            }
        }
    }

    /// Returns the negotiated detection engine without negotiating.
    pub fn detection_engine(&self) -> Option<DetectionEngine> {
        self.inner.detection_engine.get().cloned()
    }

    /// Scans a file on a blocking worker, giving up after `deadline`.
    ///
    /// Opens a one-shot session for the scan. On timeout the worker keeps
    /// running to completion and its result is discarded.
    #[cfg(feature = "tokio-runtime")]
    pub async fn scan_file_with_deadline(
        &self,
        path: impl Into<PathBuf>,
        deadline: Duration,
    ) -> Result<ScanResult, ScanError> {
        let client = self.clone();
        let path = path.into();
        let worker = tokio::task::spawn_blocking(move || -> Result<ScanResult, ScanError> {
            let mut session = client.open_session()?;
            Ok(session.scan_file(&path))
        });

        match tokio::time::timeout(deadline, worker).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(ScanError::internal(format!("scan worker failed: {e}"))),
            Err(_) => Err(ScanError::Timeout { elapsed: deadline }),
        }
    }

    pub(crate) fn engine_arc(&self) -> ArcEngine {
        Arc::clone(&self.inner.context)
    }

    pub(crate) fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_config(&self.inner.config)
    }

    /// The hasher to use, or `None` when hashing is disabled.
    pub(crate) fn hasher(&self) -> Option<&ContentHasher> {
        (!self.inner.config.skip_content_hashing).then_some(&self.inner.hasher)
    }
}
