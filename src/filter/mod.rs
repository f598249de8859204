//! Request filtering subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → middleware.rs report_requests (decode path, capture method/headers)
//!     → middleware.rs reject_disallowed_agents (optional, 404 + RejectedAgent)
//!     → site handler
//!     → report_requests: skip if RejectedAgent, classifier.rs ignore rules,
//!       else record.rs → report::ReporterHandle::submit
//! ```
//!
//! # Design Decisions
//! - Deny-list and ignore-list are immutable after startup
//! - The rejection marker travels on the response, not in shared state

pub mod classifier;
pub mod middleware;
pub mod record;

pub use classifier::{decode_path, Classifier, IgnoreReason, Verdict};
pub use middleware::{install, FilterState, RejectedAgent};
pub use record::RequestLogRecord;
