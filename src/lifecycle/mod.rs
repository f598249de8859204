//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → server stops accepting and drains
//!             → reporter closes its queue, drains, waits for in-flight POSTs
//! ```
//!
//! # Design Decisions
//! - Server drains before the reporter so late requests are still reported
//! - Reporter drain has a deadline: queued reports are dropped after it

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
