//! Engine binding implementations.
//!
//! Production bindings wrap a native anti-malware interface and live
//! outside this crate; this module ships the in-process [`MockEngine`] used
//! by tests and demos.
//!
//! ## Implementing a Binding
//!
//! ```rust,ignore
//! use scanbroker::core::{
//!     DetectionEngine, EngineContext, NativeError, SessionHandle, StreamScan,
//! };
//!
//! #[derive(Debug)]
//! pub struct AmsiContext {
//!     app_name: String,
//!     // HAMSICONTEXT from AmsiInitialize
//! }
//!
//! impl EngineContext for AmsiContext {
//!     fn name(&self) -> &str {
//!         &self.app_name
//!     }
//!
//!     fn open_session(&self) -> Result<SessionHandle, NativeError> {
//!         // AmsiOpenSession
//!         todo!()
//!     }
//!
//!     // close_session, scan_string, scan_buffer, open_stream, detect_engine ...
//! }
//! ```

pub mod mock;

pub use mock::{MockEngine, EICAR};
