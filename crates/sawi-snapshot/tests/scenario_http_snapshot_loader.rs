//! Scenario: HTTP snapshot loader against a mock sensor backend
//!
//! # Invariants under test
//!
//! 1. A 200 response is partitioned by channel and each partition is sorted.
//! 2. Records on unrecognized channels are excluded without error, whatever
//!    their value and timestamp look like.
//! 3. A non-success status maps to `FetchError::Unavailable` with the code.
//! 4. An unparseable body maps to `FetchError::MalformedPayload`.
//! 5. A refused connection maps to `FetchError::Unavailable` without a code.
//! 6. Exactly one request is issued per `load`.

use httpmock::prelude::*;
use sawi_snapshot::{FetchError, HttpSnapshotLoader, SnapshotLoader};
use sawi_telemetry::Channel;
use serde_json::json;

#[tokio::test]
async fn ok_response_is_partitioned_and_sorted() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/sensor");
            then.status(200).json_body(json!({
                "data": [
                    {"type": "KELEMBAPAN_TANAH", "value": 63.0, "createdAt": "2025-02-01T10:10:00.000Z"},
                    {"type": "SUHU_UDARA", "value": 30.5, "createdAt": "2025-02-01T10:05:00.000Z"},
                    {"type": "KELEMBAPAN_TANAH", "value": 61.0, "createdAt": "2025-02-01T10:00:00.000Z"},
                    {"type": "PH_TANAH", "value": 6.8, "createdAt": "2025-02-01T10:00:00.000Z"},
                    {"type": "SUHU_UDARA", "value": 29.0, "createdAt": "2025-02-01T09:55:00.000Z"}
                ]
            }));
        })
        .await;

    let loader = HttpSnapshotLoader::new(server.base_url());
    let snap = loader.load().await.expect("load should succeed");

    mock.assert_async().await;
    assert_eq!(snap.len(), 4, "unrecognized channel must be excluded");

    let soil: Vec<f64> = snap.soil.iter().map(|r| r.value).collect();
    let air: Vec<f64> = snap.air.iter().map(|r| r.value).collect();
    assert_eq!(soil, vec![61.0, 63.0]);
    assert_eq!(air, vec![29.0, 30.5]);
    assert!(snap.soil.iter().all(|r| r.channel == Channel::SoilMoisture));
    assert!(snap.air.iter().all(|r| r.channel == Channel::AirTemperature));
}

#[tokio::test]
async fn foreign_record_shapes_do_not_fail_the_snapshot() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/sensor");
            then.status(200).json_body(json!({
                "data": [
                    {"type": "STATUS_POMPA", "value": "ON", "createdAt": "2025-02-01T10:00:00.000Z"},
                    {"type": "STATUS_POMPA", "value": {"relay": 1}},
                    {"type": "SUHU_UDARA", "value": 31.0, "createdAt": "2025-02-01T10:01:00.000Z"}
                ]
            }));
        })
        .await;

    let snap = HttpSnapshotLoader::new(server.base_url())
        .load()
        .await
        .expect("unknown channels must not fail the load");
    assert_eq!(snap.len(), 1);
    assert_eq!(snap.air[0].value, 31.0);
}

#[tokio::test]
async fn empty_data_is_an_empty_snapshot() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/sensor");
            then.status(200).json_body(json!({ "data": [] }));
        })
        .await;

    let snap = HttpSnapshotLoader::new(server.base_url())
        .load()
        .await
        .unwrap();
    assert!(snap.is_empty());
}

#[tokio::test]
async fn non_success_status_is_unavailable() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/sensor");
            then.status(503).body("maintenance");
        })
        .await;

    let err = HttpSnapshotLoader::new(server.base_url())
        .load()
        .await
        .unwrap_err();
    match err {
        FetchError::Unavailable { status, .. } => assert_eq!(status, Some(503)),
        other => panic!("expected Unavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn garbage_body_is_malformed() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/sensor");
            then.status(200)
                .header("content-type", "application/json")
                .body("{\"data\": [ {\"type\": \"SUHU_UDARA\"");
        })
        .await;

    let err = HttpSnapshotLoader::new(server.base_url())
        .load()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "malformed_payload");
}

#[tokio::test]
async fn refused_connection_is_unavailable() {
    // Port 9 (discard) is essentially never bound in CI.
    let err = HttpSnapshotLoader::new("http://127.0.0.1:9")
        .load()
        .await
        .unwrap_err();
    match err {
        FetchError::Unavailable { status, .. } => assert_eq!(status, None),
        other => panic!("expected Unavailable, got {other:?}"),
    }
}
