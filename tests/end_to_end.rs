//! End-to-end tests: client → filter host → mock site, reports → mock analytics endpoint.

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

mod common;

#[tokio::test]
async fn test_ordinary_visit_is_reported_once() {
    let site = common::start_mock_site().await;
    let endpoint = common::start_analytics_endpoint(StatusCode::OK).await;
    let filter = common::start_filter(common::config_for(&site, &endpoint)).await;
    let client = common::client();

    let res = client
        .get(filter.url("/about"))
        .header("User-Agent", "Mozilla/5.0")
        .header("X-Custom", "kept")
        .send()
        .await
        .expect("filter unreachable");
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "site:/about");

    let reports = endpoint.wait_for(1).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(endpoint.reports().len(), 1, "exactly one POST per visit");

    let report = &reports[0];
    assert_eq!(report.authorization.as_deref(), Some("Bearer test-token"));
    assert_eq!(report.content_type.as_deref(), Some("application/json"));
    assert_eq!(report.body["request_path"], json!("/about"));
    assert_eq!(report.body["request_method"], json!("GET"));
    assert_eq!(report.body["request_headers"]["user-agent"], json!("Mozilla/5.0"));
    assert_eq!(report.body["request_headers"]["x-custom"], json!("kept"));
    assert!(report.body["request_headers"].get("x-request-id").is_none());

    filter.stop().await;
}

#[tokio::test]
async fn test_reported_path_is_decoded_and_non_ascii_crawler_rejected() {
    let site = common::start_mock_site().await;
    let endpoint = common::start_analytics_endpoint(StatusCode::OK).await;
    let filter = common::start_filter(common::config_for(&site, &endpoint)).await;
    let client = common::client();

    let res = client
        .get(filter.url("/about"))
        .header(
            "User-Agent",
            reqwest::header::HeaderValue::from_bytes("ClaudeBot/1.0 (Zürich)".as_bytes()).unwrap(),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
    assert_eq!(site.hits(), 0);

    let res = client.get(filter.url("/caf%C3%A9")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    let reports = endpoint.wait_for(1).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(endpoint.reports().len(), 1);
    assert_eq!(reports[0].body["request_path"], json!("/café"));

    filter.stop().await;
}

#[tokio::test]
async fn test_disallowed_crawler_gets_404_and_is_not_reported() {
    let site = common::start_mock_site().await;
    let endpoint = common::start_analytics_endpoint(StatusCode::OK).await;
    let filter = common::start_filter(common::config_for(&site, &endpoint)).await;
    let client = common::client();

    for agent in ["Mozilla/5.0 (compatible; ClaudeBot/1.0)", "BYTESPIDER", "Scrapy/2.11"] {
        let res = client
            .get(filter.url("/about"))
            .header("User-Agent", agent)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 404, "{agent}");
    }
    assert_eq!(site.hits(), 0);

    // A sentinel visit proves the queue is flowing; it must be the only report.
    client
        .get(filter.url("/sentinel"))
        .header("User-Agent", "Mozilla/5.0")
        .send()
        .await
        .unwrap();
    let reports = endpoint.wait_for(1).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(endpoint.reports().len(), 1);
    assert_eq!(reports[0].body["request_path"], json!("/sentinel"));

    filter.stop().await;
}

#[tokio::test]
async fn test_ignored_requests_are_served_but_not_reported() {
    let site = common::start_mock_site().await;
    let endpoint = common::start_analytics_endpoint(StatusCode::OK).await;
    let filter = common::start_filter(common::config_for(&site, &endpoint)).await;
    let client = common::client();

    let requests = [
        client.get(filter.url("/index.html")).header("User-Agent", "Mozilla/5.0"),
        client.get(filter.url("/posts/Hello.HTML")),
        client.get(filter.url("/vendor/bootstrap.min.css")),
        client.get(filter.url("/JS/site.js")),
        client.get(filter.url("/scss/main.scss")),
        client.get(filter.url("/%6As/app.js")),
        client.get(filter.url("/index%2Ehtml")),
        client.get(filter.url("/about")).header("Sec-Purpose", "prefetch"),
        client
            .get(filter.url("/"))
            .header("User-Agent", "Mozilla/5.0 (compatible; MSIE 9.0; Windows NT 6.1; Trident/5.0; AppInsights)"),
    ];
    let count = requests.len();
    for request in requests {
        let res = request.send().await.unwrap();
        assert_eq!(res.status(), 200);
    }
    assert_eq!(site.hits(), count);

    client.get(filter.url("/sentinel")).send().await.unwrap();
    let reports = endpoint.wait_for(1).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(endpoint.reports().len(), 1);
    assert_eq!(reports[0].body["request_path"], json!("/sentinel"));

    filter.stop().await;
}

#[tokio::test]
async fn test_failing_endpoint_does_not_affect_client_and_is_not_retried() {
    let site = common::start_mock_site().await;
    let endpoint = common::start_analytics_endpoint(StatusCode::INTERNAL_SERVER_ERROR).await;
    let filter = common::start_filter(common::config_for(&site, &endpoint)).await;
    let client = common::client();

    let res = client.get(filter.url("/about")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "site:/about");

    endpoint.wait_for(1).await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(endpoint.reports().len(), 1);

    filter.stop().await;
}

#[tokio::test]
async fn test_unreachable_endpoint_does_not_affect_client() {
    let site = common::start_mock_site().await;
    let endpoint = common::start_analytics_endpoint(StatusCode::OK).await;
    let mut config = common::config_for(&site, &endpoint);
    config.reporting.endpoint = "http://127.0.0.1:9/visits".into();
    let filter = common::start_filter(config).await;

    let res = common::client().get(filter.url("/about")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    filter.stop().await;
}

#[tokio::test]
async fn test_reporting_only_profile_reports_crawlers() {
    let site = common::start_mock_site().await;
    let endpoint = common::start_analytics_endpoint(StatusCode::OK).await;
    let mut config = common::config_for(&site, &endpoint);
    config.filter.reject_disallowed_agents = false;
    let filter = common::start_filter(config).await;

    let res = common::client()
        .get(filter.url("/about"))
        .header("User-Agent", "GoogleOther")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(site.hits(), 1);

    let reports = endpoint.wait_for(1).await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].body["request_headers"]["user-agent"], json!("GoogleOther"));

    filter.stop().await;
}

#[tokio::test]
async fn test_shutdown_drains_queued_reports() {
    let site = common::start_mock_site().await;
    let endpoint = common::start_analytics_endpoint(StatusCode::OK).await;
    let mut config = common::config_for(&site, &endpoint);
    config.reporting.max_in_flight = 1;
    let filter = common::start_filter(config).await;
    let client = common::client();

    for i in 0..5 {
        let res = client.get(filter.url(&format!("/page/{i}"))).send().await.unwrap();
        assert_eq!(res.status(), 200);
    }

    filter.stop().await;

    let mut paths: Vec<String> = endpoint
        .reports()
        .iter()
        .map(|r| r.body["request_path"].as_str().unwrap().to_string())
        .collect();
    paths.sort();
    assert_eq!(paths, vec!["/page/0", "/page/1", "/page/2", "/page/3", "/page/4"]);
}

#[tokio::test]
async fn test_unreachable_site_is_bad_gateway() {
    let site = common::start_mock_site().await;
    let endpoint = common::start_analytics_endpoint(StatusCode::OK).await;
    let mut config = common::config_for(&site, &endpoint);
    config.upstream.address = "127.0.0.1:9".into();
    let filter = common::start_filter(config).await;

    let res = common::client().get(filter.url("/about")).send().await.unwrap();
    assert_eq!(res.status(), 502);

    filter.stop().await;
}
