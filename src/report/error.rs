use thiserror::Error;

/// Failure to build the analytics client or deliver one report.
///
/// Delivery failures never reach the client that made the original request;
/// the worker counts them and moves on.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("token is not a valid Authorization header value")]
    InvalidToken,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint answered {0}")]
    Status(reqwest::StatusCode),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
