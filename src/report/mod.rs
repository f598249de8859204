//! Analytics reporting subsystem.
//!
//! # Data Flow
//! ```text
//! filter::middleware (report verdict)
//!     → ReporterHandle::submit (try_send, never awaits)
//!     → bounded queue
//!     → worker (semaphore-limited)
//!     → POST endpoint, Authorization: Bearer <token>
//! ```

pub mod error;
pub mod reporter;

pub use error::ReportError;
pub use reporter::{Reporter, ReporterHandle};
