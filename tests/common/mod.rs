//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use visitor_filter::config::FilterConfig;
use visitor_filter::{FilterState, HttpServer, Reporter, Shutdown};

/// The site sitting behind the filter. Echoes the path and counts hits.
pub struct MockSite {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl MockSite {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Start a mock site on an ephemeral port.
pub async fn start_mock_site() -> MockSite {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let app = Router::new().fallback(move |request: Request| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            format!("site:{}", request.uri().path())
        }
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockSite { addr, hits }
}

/// One POST received by the analytics endpoint.
#[derive(Debug, Clone)]
pub struct CapturedReport {
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: serde_json::Value,
}

#[derive(Clone)]
struct EndpointState {
    reports: Arc<Mutex<Vec<CapturedReport>>>,
    status: StatusCode,
}

/// Analytics endpoint double recording every report it receives.
pub struct AnalyticsEndpoint {
    pub addr: SocketAddr,
    reports: Arc<Mutex<Vec<CapturedReport>>>,
}

impl AnalyticsEndpoint {
    pub fn url(&self) -> String {
        format!("http://{}/visits", self.addr)
    }

    pub fn reports(&self) -> Vec<CapturedReport> {
        self.reports.lock().unwrap().clone()
    }

    /// Poll until at least `count` reports arrived, or five seconds passed.
    pub async fn wait_for(&self, count: usize) -> Vec<CapturedReport> {
        for _ in 0..100 {
            let reports = self.reports();
            if reports.len() >= count {
                return reports;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        self.reports()
    }
}

async fn capture(
    State(state): State<EndpointState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let text = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    state.reports.lock().unwrap().push(CapturedReport {
        authorization: text(header::AUTHORIZATION),
        content_type: text(header::CONTENT_TYPE),
        body: serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null),
    });
    state.status
}

/// Start an analytics endpoint answering every report with `status`.
pub async fn start_analytics_endpoint(status: StatusCode) -> AnalyticsEndpoint {
    let reports = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new().route("/visits", post(capture)).with_state(EndpointState {
        reports: reports.clone(),
        status,
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    AnalyticsEndpoint { addr, reports }
}

/// Config pointing at the mock site and endpoint, listener on an ephemeral port.
pub fn config_for(site: &MockSite, endpoint: &AnalyticsEndpoint) -> FilterConfig {
    let mut config = FilterConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.upstream.address = site.addr.to_string();
    config.reporting.endpoint = endpoint.url();
    config.reporting.token = "test-token".into();
    config.reporting.timeout_secs = 2;
    config
}

/// A filter host running in the background.
pub struct RunningFilter {
    pub addr: SocketAddr,
    shutdown: Shutdown,
    server: JoinHandle<()>,
    worker: Option<JoinHandle<()>>,
}

impl RunningFilter {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Shut the server down and wait for the reporter to drain.
    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = tokio::time::timeout(Duration::from_secs(5), self.server).await;
        if let Some(worker) = self.worker {
            let _ = tokio::time::timeout(Duration::from_secs(5), worker).await;
        }
    }
}

/// Start the filter host the way the binary does.
pub async fn start_filter(config: FilterConfig) -> RunningFilter {
    let (reporter, worker) = if config.reporting.enabled {
        let (handle, worker) = Reporter::new(&config.reporting).unwrap().spawn();
        (Some(handle), Some(worker))
    } else {
        (None, None)
    };

    let state = FilterState::from_config(&config.filter, reporter);
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(config, state).unwrap();
    let server = tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    RunningFilter {
        addr,
        shutdown,
        server,
        worker,
    }
}

/// Client that never reuses connections, so graceful shutdown is not held open.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
