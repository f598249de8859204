//! Crawler-blocking and visit-reporting middleware for axum.

pub mod config;
pub mod filter;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod report;

pub use config::schema::FilterConfig;
pub use filter::{install, Classifier, FilterState, RequestLogRecord, Verdict};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use report::{Reporter, ReporterHandle};
