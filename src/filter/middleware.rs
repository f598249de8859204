//! Filter middleware.
//!
//! Two hook points around the site:
//! - `reject_disallowed_agents` runs before the handler and answers 404 to
//!   deny-listed crawlers, tagging the response with [`RejectedAgent`]
//! - `report_requests` runs around everything, lets the handler finish, and
//!   then queues one report unless the request was rejected or ignored
//!
//! The report is built before the handler runs and queued when the observer
//! finishes or is dropped, so a client that hangs up early is still reported.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};

use crate::config::RulesConfig;
use crate::filter::classifier::{decode_path, user_agent, Classifier};
use crate::filter::record::RequestLogRecord;
use crate::observability::metrics;
use crate::report::ReporterHandle;

/// Response extension marking a request answered by the rejection hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectedAgent;

impl IntoResponse for RejectedAgent {
    fn into_response(self) -> Response {
        let mut response = (StatusCode::NOT_FOUND, "Not Found").into_response();
        response.extensions_mut().insert(self);
        response
    }
}

/// Shared, read-only state of both hooks.
#[derive(Debug, Clone)]
pub struct FilterState {
    pub classifier: Arc<Classifier>,
    /// `None` disables reporting entirely.
    pub reporter: Option<ReporterHandle>,
    pub reject_disallowed_agents: bool,
}

impl FilterState {
    pub fn from_config(rules: &RulesConfig, reporter: Option<ReporterHandle>) -> Self {
        Self {
            classifier: Arc::new(Classifier::new(
                &rules.disallowed_agents,
                &rules.ignored_path_prefixes,
            )),
            reporter,
            reject_disallowed_agents: rules.reject_disallowed_agents,
        }
    }
}

/// Early hook: 404 for deny-listed User-Agents, before any handler runs.
pub async fn reject_disallowed_agents(
    State(state): State<FilterState>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(agent) = user_agent(request.headers())
        .filter(|agent| state.classifier.is_disallowed_agent(Some(agent.as_ref())))
    {
        tracing::info!(
            path = %request.uri().path(),
            user_agent = %agent,
            "Rejected disallowed agent"
        );
        metrics::record_verdict("reject");
        return RejectedAgent.into_response();
    }

    next.run(request).await
}

/// Late hook: report the request once the handler has produced a response.
pub async fn report_requests(
    State(state): State<FilterState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(reporter) = state.reporter.clone() else {
        return next.run(request).await;
    };

    let path = decode_path(request.uri().path()).into_owned();

    if let Some(reason) = state.classifier.ignore_reason(&path, request.headers()) {
        let response = next.run(request).await;
        if !is_rejected(&response) {
            tracing::trace!(path = %path, reason = reason.as_str(), "Not reported");
            metrics::record_verdict(reason.as_str());
        }
        return response;
    }

    let mut pending = PendingReport {
        reporter,
        record: Some(RequestLogRecord::new(path, request.method(), request.headers())),
    };

    let response = next.run(request).await;
    if is_rejected(&response) {
        pending.cancel();
    }
    response
}

fn is_rejected(response: &Response) -> bool {
    response.extensions().get::<RejectedAgent>().is_some()
}

/// A report queued on drop unless cancelled.
struct PendingReport {
    reporter: ReporterHandle,
    record: Option<RequestLogRecord>,
}

impl PendingReport {
    fn cancel(&mut self) {
        self.record = None;
    }
}

impl Drop for PendingReport {
    fn drop(&mut self) {
        if let Some(record) = self.record.take() {
            metrics::record_verdict("report");
            self.reporter.submit(record);
        }
    }
}

/// Wrap `router` with the reporter and, when enabled, the rejection hook inside it.
pub fn install<S>(router: Router<S>, state: FilterState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let router = if state.reject_disallowed_agents {
        router.layer(middleware::from_fn_with_state(
            state.clone(),
            reject_disallowed_agents,
        ))
    } else {
        router
    };

    router.layer(middleware::from_fn_with_state(state, report_requests))
}
