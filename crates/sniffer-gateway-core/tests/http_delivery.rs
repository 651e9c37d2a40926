//! Delivery over real HTTP against a mock aggregation server.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use sniffer_gateway_core::delivery::{
    DeliveryQueue, DeliveryRequest, DeliverySession, DeliveryTransport, Dispatcher, HttpTransport,
};
use sniffer_gateway_core::{CredentialStore, Credentials, DeliveryError, TrackingEvent};
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn event(rssi: i32) -> TrackingEvent {
    TrackingEvent {
        sniffer_serial: "ABC123".to_string(),
        beacon_addr: "AA-BB-CC-DD-EE-FF".to_string(),
        event_time: Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
        rssi,
    }
}

fn credentials(token: Option<&str>) -> Arc<CredentialStore> {
    Arc::new(CredentialStore::in_memory(Credentials {
        username: None,
        access_token: token.map(str::to_string),
    }))
}

#[tokio::test]
async fn test_event_posted_with_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/events/"))
        .and(header("authorization", "Token abc"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let request = DeliveryRequest::post_event(&server.uri(), "api/events/", event(-64));
    let session = HttpTransport::new(Duration::from_secs(5))
        .open_session()
        .unwrap();

    let status = session.send(&request, Some("abc")).await.unwrap();
    assert_eq!(status, 201);

    let received = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body["sniffer_serial"], json!("ABC123"));
    assert_eq!(body["beacon_addr"], json!("AA-BB-CC-DD-EE-FF"));
    assert_eq!(body["rssi"], json!(-64));
    assert_eq!(body["event_time"], json!("2024-05-01T09:30:00Z"));
}

#[tokio::test]
async fn test_custom_headers_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-gateway", "gw-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let request = DeliveryRequest::post_event(&server.uri(), "api/events/", event(-50))
        .with_header("X-Gateway", "gw-1");
    let session = HttpTransport::default().open_session().unwrap();

    session.send(&request, None).await.unwrap();

    let received = server.received_requests().await.unwrap();
    assert!(received[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_non_success_status_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let request = DeliveryRequest::post_event(&server.uri(), "api/events/", event(-70));
    let session = HttpTransport::default().open_session().unwrap();

    let result = session.send(&request, Some("stale")).await;
    assert!(matches!(result, Err(DeliveryError::Rejected { status: 401, .. })));
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    // Bind then drop a listener so the port is almost certainly closed.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let request =
        DeliveryRequest::post_event(&format!("http://{}", addr), "api/events/", event(-70));
    let session = HttpTransport::new(Duration::from_secs(2)).open_session().unwrap();

    let result = session.send(&request, None).await;
    assert!(matches!(result, Err(DeliveryError::Transport { .. })));
}

#[tokio::test]
async fn test_dispatcher_batch_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/events/"))
        .respond_with(ResponseTemplate::new(201))
        .expect(10)
        .mount(&server)
        .await;

    let queue = Arc::new(DeliveryQueue::new());
    for rssi in 0..12 {
        queue.push(DeliveryRequest::post_event(&server.uri(), "api/events/", event(-rssi)));
    }

    let dispatcher = Dispatcher::new(
        queue.clone(),
        HttpTransport::default(),
        credentials(Some("abc")),
    );
    let report = dispatcher.drain_batch().await.unwrap();

    assert_eq!(report.sent, 10);
    assert_eq!(queue.len(), 2);

    let received = server.received_requests().await.unwrap();
    let order: Vec<i64> = received
        .iter()
        .map(|r| serde_json::from_slice::<Value>(&r.body).unwrap()["rssi"].as_i64().unwrap())
        .collect();
    assert_eq!(order, (0..10).map(|i: i64| -i).collect::<Vec<_>>());
}
