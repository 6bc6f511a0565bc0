mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{build_test_context, post_gzip_json, post_json, request_no_body};
use serde_json::json;

#[tokio::test]
async fn path_update_then_text_read() -> Result<()> {
    let ctx = build_test_context().await?;

    let resp = request_no_body(&ctx.app, "POST", "/update/gauge/Alloc/12.5").await?;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.trace_id.is_some_and(|id| id.len() == 16));

    request_no_body(&ctx.app, "POST", "/update/counter/PollCount/3").await?;
    request_no_body(&ctx.app, "POST", "/update/counter/PollCount/4").await?;

    let resp = request_no_body(&ctx.app, "GET", "/value/gauge/Alloc").await?;
    assert_eq!((resp.status, resp.body.as_str()), (StatusCode::OK, "12.5"));

    let resp = request_no_body(&ctx.app, "GET", "/value/counter/PollCount").await?;
    assert_eq!((resp.status, resp.body.as_str()), (StatusCode::OK, "7"));
    Ok(())
}

#[tokio::test]
async fn bad_input_maps_to_client_errors() -> Result<()> {
    let ctx = build_test_context().await?;

    let resp = request_no_body(&ctx.app, "POST", "/update/gauge/Alloc/abc").await?;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = request_no_body(&ctx.app, "POST", "/update/histogram/Alloc/1").await?;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(resp.body.contains("histogram"));

    let resp = request_no_body(&ctx.app, "GET", "/value/gauge/Missing").await?;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let resp = post_json(&ctx.app, "/update", json!({"id": "PollCount", "type": "counter"})).await?;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn json_update_echoes_stored_total() -> Result<()> {
    let ctx = build_test_context().await?;

    post_json(&ctx.app, "/update", json!({"id": "PollCount", "type": "counter", "delta": 2})).await?;
    let resp = post_json(
        &ctx.app,
        "/update/",
        json!({"id": "PollCount", "type": "counter", "delta": 5, "value": 0.0}),
    )
    .await?;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json(), json!({"id": "PollCount", "type": "counter", "delta": 7}));

    let resp = post_json(&ctx.app, "/value", json!({"id": "PollCount", "type": "counter"})).await?;
    assert_eq!(resp.json()["delta"], json!(7));
    Ok(())
}

#[tokio::test]
async fn gzip_batch_is_stored_and_snapshotted() -> Result<()> {
    let ctx = build_test_context().await?;

    let batch = json!([
        {"id": "Alloc", "type": "gauge", "value": 1.0},
        {"id": "PollCount", "type": "counter", "delta": 1},
        {"id": "Alloc", "type": "gauge", "value": 2.5},
        {"id": "PollCount", "type": "counter", "delta": 1},
    ]);
    let resp = post_gzip_json(&ctx.app, "/updates/", batch).await?;
    assert_eq!(resp.status, StatusCode::OK);

    let resp = request_no_body(&ctx.app, "GET", "/").await?;
    assert_eq!(resp.body, "Alloc: 2.5\nPollCount: 2\n");

    let snapshot: serde_json::Value = serde_json::from_slice(&std::fs::read(
        ctx.temp_dir.path().join("metrics.json"),
    )?)?;
    assert_eq!(snapshot["counters"], json!([{"name": "PollCount", "value": 2}]));
    Ok(())
}

#[tokio::test]
async fn batch_with_unknown_kind_is_rejected_whole() -> Result<()> {
    let ctx = build_test_context().await?;

    let resp = post_json(
        &ctx.app,
        "/updates",
        json!([
            {"id": "Alloc", "type": "gauge", "value": 1.0},
            {"id": "X", "type": "summary", "value": 1.0},
        ]),
    )
    .await?;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(ctx.storage.list_gauges().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn ping_reports_healthy_storage() -> Result<()> {
    let ctx = build_test_context().await?;
    let resp = request_no_body(&ctx.app, "GET", "/ping").await?;
    assert_eq!((resp.status, resp.body.as_str()), (StatusCode::OK, "OK"));
    Ok(())
}

#[tokio::test]
async fn counter_overflow_is_rejected_and_total_kept() -> Result<()> {
    let ctx = build_test_context().await?;
    let uri = format!("/update/counter/Big/{}", i64::MAX);

    let resp = request_no_body(&ctx.app, "POST", &uri).await?;
    assert_eq!(resp.status, StatusCode::OK);
    let resp = request_no_body(&ctx.app, "POST", &uri).await?;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(resp.body.contains("overflow"));

    let resp = post_json(
        &ctx.app,
        "/updates/",
        json!([
            {"id": "Alloc", "type": "gauge", "value": 1.0},
            {"id": "Big", "type": "counter", "delta": 1},
        ]),
    )
    .await?;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = request_no_body(&ctx.app, "GET", "/value/counter/Big").await?;
    assert_eq!((resp.status, resp.body), (StatusCode::OK, i64::MAX.to_string()));
    let resp = request_no_body(&ctx.app, "GET", "/value/gauge/Alloc").await?;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let resp = request_no_body(&ctx.app, "GET", "/").await?;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body, format!("Big: {}\n", i64::MAX));
    Ok(())
}

#[tokio::test]
async fn every_response_carries_its_own_trace_id() -> Result<()> {
    let ctx = build_test_context().await?;

    let ok = request_no_body(&ctx.app, "GET", "/ping").await?;
    let missing = request_no_body(&ctx.app, "GET", "/value/gauge/Missing").await?;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let (ok, missing) = (ok.trace_id.unwrap(), missing.trace_id.unwrap());
    assert!(ok.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(missing.len(), 16);
    assert_ne!(ok, missing);
    Ok(())
}
