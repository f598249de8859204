//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router that forwards every request to the upstream site
//! - Wire up middleware (filter hooks, timeout, request ID, tracing)
//! - Bind server to listener and shut down gracefully

use std::str::FromStr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{
        uri::{Authority, PathAndQuery, Scheme},
        HeaderName, StatusCode, Uri, Version,
    },
    response::{IntoResponse, Response},
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::FilterConfig;
use crate::filter::{self, FilterState};

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Application state injected into the forwarding handler.
#[derive(Clone)]
pub struct AppState {
    pub client: Client<HttpConnector, Body>,
    pub upstream: Authority,
}

/// Host running the filter in front of the upstream site.
pub struct HttpServer {
    router: Router,
    config: FilterConfig,
}

impl HttpServer {
    /// Create a new HTTP server. Fails if the upstream address is not a valid authority.
    pub fn new(config: FilterConfig, filter_state: FilterState) -> Result<Self, axum::http::Error> {
        let upstream = Authority::from_str(&config.upstream.address)?;
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState { client, upstream };
        let router = Self::build_router(&config, state, filter_state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &FilterConfig, state: AppState, filter_state: FilterState) -> Router {
        let site = Router::new()
            .fallback(forward_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.upstream.request_timeout_secs,
            )))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid));

        // Outermost, so reports carry the client's headers and not the generated request ID.
        filter::install(site, filter_state)
    }

    /// Run the server, accepting connections on the given listener until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.address,
            reject_disallowed_agents = self.config.filter.reject_disallowed_agents,
            reporting = self.config.reporting.enabled,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Forward the request to the upstream site and stream its response back.
async fn forward_handler(State(state): State<AppState>, request: Request) -> Response {
    let (mut parts, body) = request.into_parts();
    let request_id = parts
        .headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(state.upstream.clone());
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.version = Version::HTTP_11;
    parts.uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Unforwardable URI");
            return (StatusCode::BAD_REQUEST, "Bad Request").into_response();
        }
    };

    tracing::debug!(
        request_id = %request_id,
        method = %parts.method,
        uri = %parts.uri,
        "Forwarding request"
    );

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
