//! HTTP host for the filter.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → filter hooks (report observer, rejection hook)
//!     → server.rs (request ID, trace span, timeout)
//!     → forward_handler → upstream site
//!     → response streamed back unchanged
//! ```

pub mod server;

pub use server::{HttpServer, X_REQUEST_ID};
