//! Fire-and-forget delivery of request log records.
//!
//! # Responsibilities
//! - Hold the analytics HTTP client (bearer token preset)
//! - Queue records without blocking the request path
//! - POST each queued record exactly once, bounded in concurrency
//!
//! # Design Decisions
//! - Bounded queue: when full the record is dropped, never awaited
//! - A semaphore caps outbound POSTs in flight
//! - No retries; the response status only feeds metrics
//! - Once the last handle is dropped the queue drains and in-flight POSTs finish

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use url::Url;

use crate::config::ReportingConfig;
use crate::filter::record::RequestLogRecord;
use crate::observability::metrics;
use crate::report::error::ReportError;

/// Analytics client posting one record per call.
#[derive(Debug)]
pub struct Reporter {
    client: reqwest::Client,
    endpoint: Url,
    queue_capacity: usize,
    max_in_flight: usize,
}

impl Reporter {
    /// Build the client. Fails on a malformed endpoint or token.
    pub fn new(config: &ReportingConfig) -> Result<Self, ReportError> {
        let endpoint = Url::parse(&config.endpoint)?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|_| ReportError::InvalidToken)?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            queue_capacity: config.queue_capacity.max(1),
            max_in_flight: config.max_in_flight.max(1),
        })
    }

    /// POST a single record. The response body is never read.
    pub async fn send(&self, record: &RequestLogRecord) -> Result<(), ReportError> {
        let body = record.to_json()?;
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::Status(status));
        }
        Ok(())
    }

    /// Start the background worker.
    ///
    /// The worker runs until every [`ReporterHandle`] is dropped, then sends what
    /// is still queued and waits for in-flight POSTs before returning.
    pub fn spawn(self) -> (ReporterHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let worker = tokio::spawn(run_worker(Arc::new(self), rx));
        (ReporterHandle { tx }, worker)
    }
}

async fn run_worker(reporter: Arc<Reporter>, mut rx: mpsc::Receiver<RequestLogRecord>) {
    let permits = Arc::new(Semaphore::new(reporter.max_in_flight));
    let mut in_flight = JoinSet::new();

    tracing::info!(
        endpoint = %reporter.endpoint,
        queue_capacity = reporter.queue_capacity,
        max_in_flight = reporter.max_in_flight,
        "Reporter started"
    );

    while let Some(record) = rx.recv().await {
        // Waiting here only slows the queue, never a client request.
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };

        let reporter = reporter.clone();
        in_flight.spawn(async move {
            let _permit = permit;
            match reporter.send(&record).await {
                Ok(()) => metrics::record_report("sent"),
                Err(e) => {
                    tracing::debug!(
                        path = %record.request_path,
                        error = %e,
                        "Report not delivered"
                    );
                    metrics::record_report("failed");
                }
            }
        });

        while in_flight.try_join_next().is_some() {}
    }

    while in_flight.join_next().await.is_some() {}
    tracing::info!("Reporter stopped");
}

/// Cheap, cloneable entry point into the reporter queue.
#[derive(Debug, Clone)]
pub struct ReporterHandle {
    tx: mpsc::Sender<RequestLogRecord>,
}

impl ReporterHandle {
    /// Wrap an existing channel, for hosts that consume records themselves.
    pub fn from_sender(tx: mpsc::Sender<RequestLogRecord>) -> Self {
        Self { tx }
    }

    /// Queue a record without waiting. Returns false if it was dropped.
    pub fn submit(&self, record: RequestLogRecord) -> bool {
        match self.tx.try_send(record) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(record)) => {
                tracing::debug!(path = %record.request_path, "Report queue full, dropping");
                metrics::record_report("dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(record)) => {
                tracing::debug!(path = %record.request_path, "Reporter stopped, dropping");
                metrics::record_report("dropped");
                false
            }
        }
    }
}
