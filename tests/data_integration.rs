use std::time::Duration;

use bilink::{BiClient, BilinkError, TimedTransport};
use chrono::NaiveDate;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

const BASE: &str = "/bi/v1/ORG1";

fn bi_client(server: &MockServer, timeout: Duration) -> BiClient {
    BiClient::new(
        &common::client_config(server),
        TimedTransport::new(timeout).unwrap(),
    )
}

fn endpoint(name: &str) -> String {
    format!("{BASE}/{name}")
}

#[tokio::test]
async fn daily_totals_sends_bearer_and_business_date() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(endpoint("getOperationsDailyTotals")))
        .and(header("authorization", "Bearer id-1"))
        .and(body_json(json!({"locRef": "1234", "busDt": "2024-03-01"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "locRef": "1234",
            "busDt": "2024-03-01",
            "revenueCenters": [
                {"rvcNum": 1, "netSlsTtl": 1520.5, "chkCnt": 42, "gstCnt": 60},
                {"rvcNum": 2, "netSlsTtl": 310.25, "gstCnt": 9, "vdTtl": 12.0}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let bi = bi_client(&server, Duration::from_secs(5));
    let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let totals = bi.daily_totals("id-1", "1234", date).await.unwrap();

    assert_eq!(totals.loc_ref.as_deref(), Some("1234"));
    assert_eq!(totals.revenue_centers.len(), 2);
    assert_eq!(totals.revenue_centers[0].check_count, Some(42));
    assert_eq!(totals.revenue_centers[1].check_count, None);
    assert_eq!(totals.net_sales(), Some(1830.75));
    assert_eq!(totals.guest_count(), Some(69));
}

#[tokio::test]
async fn locations_and_revenue_centers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(endpoint("getLocationDimensions")))
        .and(header("authorization", "Bearer id-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "locations": [
                {"locRef": "1234", "name": "Main St", "active": true, "tz": "America/Chicago"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(endpoint("getRevenueCenterDimensions")))
        .and(body_json(json!({"locRef": "1234"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "revenueCenters": [{"num": 1, "name": "Dining"}, {"num": 2, "name": "Bar"}]
        })))
        .mount(&server)
        .await;

    let bi = bi_client(&server, Duration::from_secs(5));
    let locations = bi.locations("id-1").await.unwrap();
    assert_eq!(locations[0].loc_ref, "1234");
    assert_eq!(locations[0].time_zone.as_deref(), Some("America/Chicago"));

    let centers = bi.revenue_centers("id-1", "1234").await.unwrap();
    assert_eq!(centers.len(), 2);
    assert_eq!(centers[1].name.as_deref(), Some("Bar"));
}

#[tokio::test]
async fn unauthorized_data_call_signals_renewal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(endpoint("getLocationDimensions")))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .mount(&server)
        .await;

    let bi = bi_client(&server, Duration::from_secs(5));
    let err = bi.locations("stale").await.unwrap_err();
    assert!(err.is_unauthorized(), "{err:?}");
    assert_eq!(err.status(), Some(401));
    assert!(!err.requires_bootstrap());
}

#[tokio::test]
async fn other_client_errors_are_plain_data_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(endpoint("getRevenueCenterDimensions")))
        .respond_with(ResponseTemplate::new(404).set_body_string("unknown location"))
        .mount(&server)
        .await;

    let bi = bi_client(&server, Duration::from_secs(5));
    let err = bi.revenue_centers("id-1", "nope").await.unwrap_err();
    match &err {
        BilinkError::DataCall { endpoint, status, body } => {
            assert_eq!(endpoint, "getRevenueCenterDimensions");
            assert_eq!(*status, 404);
            assert_eq!(body, "unknown location");
        }
        other => panic!("expected DataCall, got {other:?}"),
    }
    assert!(!err.is_unauthorized());
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn server_error_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(endpoint("getLocationDimensions")))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let bi = bi_client(&server, Duration::from_secs(5));
    let err = bi.locations("id-1").await.unwrap_err();
    assert!(matches!(err, BilinkError::ServerError { status: 502, .. }), "{err:?}");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn malformed_reply_is_a_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(endpoint("getOperationsDailyTotals")))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let bi = bi_client(&server, Duration::from_secs(5));
    let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let err = bi.daily_totals("id-1", "1234", date).await.unwrap_err();
    assert!(matches!(err, BilinkError::ProtocolError(_)), "{err:?}");
}

#[tokio::test]
async fn long_error_bodies_are_truncated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(endpoint("getLocationDimensions")))
        .respond_with(ResponseTemplate::new(403).set_body_string("x".repeat(5000)))
        .mount(&server)
        .await;

    let bi = bi_client(&server, Duration::from_secs(5));
    let err = bi.locations("id-1").await.unwrap_err();
    assert!(err.is_unauthorized());
    let BilinkError::DataCall { body, .. } = err else {
        panic!("expected DataCall");
    };
    assert!(body.len() <= bilink::error::MAX_BODY_EXCERPT + 3);
}

#[tokio::test]
async fn stalled_data_call_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(endpoint("getLocationDimensions")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"locations": []}))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let bi = bi_client(&server, Duration::from_millis(300));
    let started = std::time::Instant::now();
    let err = bi.locations("id-1").await.unwrap_err();
    assert!(matches!(err, BilinkError::Timeout { .. }), "{err:?}");
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(300), "failed early after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "hung for {elapsed:?}");
}
