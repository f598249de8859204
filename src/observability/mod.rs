//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! filter, reporter, host produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (verdict and report counters)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging for machine parsing
//! - Request ID (x-request-id) on every request span
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
