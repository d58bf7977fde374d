//! REST endpoint tests driven through the router with `oneshot`.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{json_body, text_body, Harness};
use pulse_core::ProviderId;
use pulse_feed::SourceError;

#[tokio::test]
async fn test_health_starts_healthy_with_hidden_banner() {
    let h = Harness::default();

    let response = h.get("/api/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["snapshot"]["globalStatus"], "healthy");
    assert_eq!(body["snapshot"]["providers"].as_array().unwrap().len(), 4);
    assert_eq!(body["banner"]["visible"], false);
}

#[tokio::test]
async fn test_quotes_are_cached_across_requests() {
    let h = Harness::default();

    let response = h.get("/api/quotes?symbols=msft,AAPL").await;
    assert_eq!(response.status(), StatusCode::OK);
    let quotes = json_body(response).await;
    assert_eq!(quotes[0]["symbol"], "AAPL");
    assert_eq!(quotes[1]["symbol"], "MSFT");
    assert_eq!(quotes[0]["price"], "101.25");

    let response = h.get("/api/quotes?symbols=AAPL,%20msft").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.source.calls(), 1);
}

#[tokio::test]
async fn test_empty_symbol_list_is_bad_request() {
    let h = Harness::default();
    let response = h.get("/api/quotes?symbols=,,").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "invalid_request");
    assert_eq!(h.source.calls(), 0);
}

#[tokio::test]
async fn test_upstream_errors_degrade_health_banner() {
    let h = Harness::default();
    h.source.fail_with(SourceError::Upstream("HTTP 500".to_string()));

    for _ in 0..2 {
        let response = h.get("/api/candles/AAPL").await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json_body(response).await["error"], "upstream_error");
    }

    let body = json_body(h.get("/api/health").await).await;
    assert_eq!(body["snapshot"]["globalStatus"], "degraded");
    assert_eq!(body["banner"]["visible"], true);
    assert_eq!(body["banner"]["kind"], "degraded");
    assert_eq!(body["banner"]["providers"][0], "market-data");

    h.source.succeed();
    let response = h.get("/api/candles/AAPL?timeframe=1d").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        h.health.provider_status(ProviderId::MarketData).error_count,
        1
    );
}

#[tokio::test]
async fn test_rate_limited_upstream_is_service_unavailable() {
    let h = Harness::default();
    h.source.fail_with(SourceError::RateLimited {
        retry_after_ms: 1_000,
    });

    let response = h.get("/api/quotes?symbols=AAPL").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = json_body(h.get("/api/health").await).await;
    assert_eq!(body["banner"]["kind"], "rate_limited");
    assert_eq!(body["snapshot"]["providers"][0]["rateLimited"], true);

    // The health endpoint sweeps, so an elapsed rate limit clears on read.
    h.clock.advance(1_000);
    let body = json_body(h.get("/api/health").await).await;
    assert_eq!(body["snapshot"]["globalStatus"], "healthy");
    assert_eq!(body["banner"]["visible"], false);
}

#[tokio::test]
async fn test_unknown_timeframe_is_bad_request() {
    let h = Harness::default();
    let response = h.get("/api/candles/AAPL?timeframe=2d").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(h.source.calls(), 0);
}

#[tokio::test]
async fn test_path_like_symbol_never_reaches_upstream() {
    let h = Harness::default();
    let response = h.get("/api/candles/..%2Fadmin%3Fevil=1").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "invalid_request");
    assert_eq!(h.source.calls(), 0);
    assert_eq!(
        h.health.provider_status(ProviderId::MarketData).error_count,
        0
    );
}

#[tokio::test]
async fn test_invalidate_symbol_forces_refetch() {
    let h = Harness::default();
    h.get("/api/candles/AAPL").await;
    h.get("/api/quotes?symbols=AAPL,MSFT").await;
    h.get("/api/candles/BA").await;
    assert_eq!(h.source.calls(), 3);

    let response = h
        .send(
            Request::delete("/api/cache/aapl")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["removed"], 2);

    h.get("/api/candles/BA").await;
    assert_eq!(h.source.calls(), 3, "BA stays cached");
    h.get("/api/candles/AAPL").await;
    assert_eq!(h.source.calls(), 4);
}

#[tokio::test]
async fn test_force_refresh_clears_all_categories() {
    let h = Harness::default();
    h.get("/api/candles/AAPL").await;
    h.get("/api/quotes?symbols=AAPL").await;

    let response = h
        .send(
            Request::post("/api/cache/refresh")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["cleared"]["quotes"], 1);
    assert_eq!(body["cleared"]["candles"], 1);

    h.get("/api/quotes?symbols=AAPL").await;
    assert_eq!(h.source.calls(), 3);
}

#[tokio::test]
async fn test_functions_require_identity() {
    let h = Harness::default();
    let response = h
        .send(
            Request::post("/functions/check-subscription")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "unauthorized");
}

#[tokio::test]
async fn test_bearer_token_identifies_caller() {
    let h = Harness::default();
    let response = h
        .send(
            Request::post("/functions/check-subscription")
                .header("authorization", "Bearer subscriber")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["subscribed"], true);
    assert_eq!(body["productId"], "pulse_pro");
}

#[tokio::test]
async fn test_create_checkout_allows_five_per_minute() {
    let h = Harness::default();

    for expected_remaining in ["4", "3", "2", "1", "0"] {
        let response = h.post_as("/functions/create-checkout", "alice").await;
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers["x-ratelimit-limit"], "5");
        assert_eq!(headers["x-ratelimit-remaining"], expected_remaining);
        assert_eq!(headers["x-ratelimit-reset"], "60");
        assert!(headers.get("retry-after").is_none());
    }

    h.clock.advance(15_000);
    let response = h.post_as("/functions/create-checkout", "alice").await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["retry-after"], "45");
    assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
    assert_eq!(json_body(response).await["error"], "rate_limited");

    // Other identities have their own window.
    let response = h.post_as("/functions/create-checkout", "bob").await;
    assert_eq!(response.status(), StatusCode::OK);

    h.clock.advance(45_000);
    let response = h.post_as("/functions/create-checkout", "alice").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "4");
    let body = json_body(response).await;
    assert!(body["url"].as_str().unwrap().contains("session="));
}

#[tokio::test]
async fn test_endpoints_have_independent_limits() {
    let h = Harness::default();

    for _ in 0..5 {
        h.post_as("/functions/create-checkout", "alice").await;
    }
    for i in 0..10 {
        let response = h.post_as("/functions/check-subscription", "alice").await;
        assert_eq!(response.status(), StatusCode::OK, "request {i}");
    }
    let response = h.post_as("/functions/check-subscription", "alice").await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_checkout_rejects_bad_body() {
    let h = Harness::default();
    let response = h
        .send(
            Request::post("/functions/create-checkout")
                .header("x-user-id", "alice")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_checkout_with_price_id() {
    let h = Harness::default();
    let response = h
        .send(
            Request::post("/functions/create-checkout")
                .header("x-user-id", "alice")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"priceId":"price_annual"}"#))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["url"].as_str().unwrap().ends_with("price=price_annual"));
}

#[tokio::test]
async fn test_metrics_exposition() {
    let h = Harness::default();
    h.post_as("/functions/check-subscription", "metrics-user").await;

    let response = h.get("/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);
    let text = text_body(response).await;
    assert!(text.contains("pulse_rate_limit_decisions_total"));
    assert!(text.contains("check-subscription"));
}
