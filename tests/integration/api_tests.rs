//! API integration tests for the resize endpoint.
//!
//! Tests verify:
//! - Successful resizes and their headers
//! - Parameter validation and the JSON error shape
//! - Upstream, decode and pixel-budget failures
//! - Health check

use std::sync::Arc;

use axum::http::StatusCode;

use super::test_utils::{
    body_bytes, body_json, create_tall_png, create_test_jpeg, create_test_png, get,
    image_dimensions, is_valid_jpeg, mock_service, resize_uri, test_router, MockFetcher, CAT_URL,
};

// =============================================================================
// Successful Resizes
// =============================================================================

#[tokio::test]
async fn test_resize_success() {
    let fetcher = Arc::new(MockFetcher::with_default_image());
    let router = test_router(mock_service(&fetcher));

    let response = get(&router, &resize_uri(CAT_URL, "32")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "image/jpeg"
    );
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "public, max-age=3600"
    );
    assert_eq!(response.headers().get("x-cache-hit").unwrap(), "false");

    let body = body_bytes(response).await;
    assert!(is_valid_jpeg(&body), "Response should be a valid JPEG");
    assert_eq!(image_dimensions(&body), (32, 24));
    assert_eq!(fetcher.fetch_count(CAT_URL), 1);
}

#[tokio::test]
async fn test_resize_percent_encoded_url() {
    let source = "https://images.test/photos/cat.jpg?v=2";
    let fetcher = Arc::new(MockFetcher::new().with_image(source, create_test_jpeg(40, 40)));
    let router = test_router(mock_service(&fetcher));

    let response = get(
        &router,
        "/?url=https%3A%2F%2Fimages.test%2Fphotos%2Fcat.jpg%3Fv%3D2&width=10",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(image_dimensions(&body_bytes(response).await), (10, 10));
    assert_eq!(fetcher.fetch_count(source), 1);
}

#[tokio::test]
async fn test_resize_png_source_returns_jpeg() {
    let source = "https://images.test/logo.png";
    let fetcher = Arc::new(MockFetcher::new().with_image(source, create_test_png(20, 10)));
    let router = test_router(mock_service(&fetcher));

    let response = get(&router, &resize_uri(source, "40")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_bytes(response).await;
    assert!(is_valid_jpeg(&body));
    assert_eq!(image_dimensions(&body), (40, 20));
}

#[tokio::test]
async fn test_max_width_accepted() {
    let fetcher = Arc::new(MockFetcher::with_default_image());
    let router = test_router(mock_service(&fetcher));

    let response = get(&router, &resize_uri(CAT_URL, "2000")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(image_dimensions(&body_bytes(response).await), (2000, 1500));
}

#[tokio::test]
async fn test_cache_max_age_from_router_config() {
    use image_resize_proxy::{create_router, RouterConfig};

    let fetcher = Arc::new(MockFetcher::with_default_image());
    let router = create_router(
        mock_service(&fetcher),
        RouterConfig::new()
            .with_cache_max_age(60)
            .with_tracing(false),
    );

    let response = get(&router, &resize_uri(CAT_URL, "16")).await;

    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "public, max-age=60"
    );
}

// =============================================================================
// Validation Errors
// =============================================================================

async fn assert_bad_request(uri: &str, expected_error: &str) {
    let fetcher = Arc::new(MockFetcher::with_default_image());
    let router = test_router(mock_service(&fetcher));

    let response = get(&router, uri).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST, "uri: {}", uri);

    let error = body_json(response).await;
    assert_eq!(error["status"], "failed");
    assert_eq!(error["error"], expected_error, "uri: {}", uri);
    assert!(error["message"].is_string());

    assert_eq!(fetcher.total_fetches(), 0, "validation must precede fetch");
}

#[tokio::test]
async fn test_missing_parameters() {
    assert_bad_request("/", "missing_parameter").await;
    assert_bad_request("/?width=100", "missing_parameter").await;
    assert_bad_request(&format!("/?url={}", CAT_URL), "missing_parameter").await;
    assert_bad_request(&resize_uri(CAT_URL, ""), "missing_parameter").await;

    // Presence is checked before the other parameter's syntax
    assert_bad_request("/?width=abc", "missing_parameter").await;
    assert_bad_request("/?url=not-a-url", "missing_parameter").await;
}

#[tokio::test]
async fn test_missing_parameter_message_names_field() {
    let fetcher = Arc::new(MockFetcher::with_default_image());
    let router = test_router(mock_service(&fetcher));

    let error = body_json(get(&router, "/?width=100").await).await;
    assert!(error["message"].as_str().unwrap().contains("url"));

    let error = body_json(get(&router, &format!("/?url={}", CAT_URL)).await).await;
    assert!(error["message"].as_str().unwrap().contains("width"));
}

#[tokio::test]
async fn test_invalid_width() {
    assert_bad_request(&resize_uri(CAT_URL, "abc"), "invalid_width").await;
    assert_bad_request(&resize_uri(CAT_URL, "0"), "invalid_width").await;
    assert_bad_request(&resize_uri(CAT_URL, "-5"), "invalid_width").await;
    assert_bad_request(&resize_uri(CAT_URL, "12.5"), "invalid_width").await;
}

#[tokio::test]
async fn test_width_too_large() {
    assert_bad_request(&resize_uri(CAT_URL, "2001"), "width_too_large").await;
    assert_bad_request(
        &resize_uri(CAT_URL, "99999999999999999999999"),
        "width_too_large",
    )
    .await;
}

#[tokio::test]
async fn test_invalid_url() {
    assert_bad_request(&resize_uri("not-a-url", "100"), "invalid_url").await;
    assert_bad_request(&resize_uri("ftp://images.test/cat.jpg", "100"), "invalid_url").await;
    assert_bad_request(&resize_uri("file:///etc/passwd", "100"), "invalid_url").await;
}

// =============================================================================
// Server Errors
// =============================================================================

#[tokio::test]
async fn test_upstream_failure_returns_generic_500() {
    let fetcher = Arc::new(MockFetcher::new());
    let router = test_router(mock_service(&fetcher));

    let response = get(&router, &resize_uri("https://images.test/missing.jpg", "100")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let error = body_json(response).await;
    assert_eq!(error["status"], "failed");
    assert_eq!(error["error"], "upstream_error");
    assert_eq!(error["message"], "Internal server error.");
}

#[tokio::test]
async fn test_undecodable_source_returns_500() {
    let source = "https://images.test/notes.txt";
    let fetcher = Arc::new(MockFetcher::new().with_image(source, b"just some text".to_vec()));
    let router = test_router(mock_service(&fetcher));

    let response = get(&router, &resize_uri(source, "100")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let error = body_json(response).await;
    assert_eq!(error["error"], "transform_error");
    assert_eq!(error["message"], "Internal server error.");
}

#[tokio::test]
async fn test_oversized_output_rejected_and_server_keeps_serving() {
    let tall = "https://images.test/ribbon.png";
    let fetcher = Arc::new(
        MockFetcher::with_default_image().with_image(tall, create_tall_png(65_535)),
    );
    let router = test_router(mock_service(&fetcher));

    let response = get(&router, &resize_uri(tall, "2000")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let error = body_json(response).await;
    assert_eq!(error["status"], "failed");
    assert_eq!(error["error"], "transform_error");
    assert_eq!(error["message"], "Internal server error.");

    let response = get(&router, &resize_uri(CAT_URL, "32")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(image_dimensions(&body_bytes(response).await), (32, 24));
}

#[tokio::test]
async fn test_failure_not_cached_retry_fetches_again() {
    let fetcher = Arc::new(MockFetcher::new());
    let router = test_router(mock_service(&fetcher));
    let uri = resize_uri("https://images.test/missing.jpg", "100");

    for _ in 0..2 {
        let response = get(&router, &uri).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    assert_eq!(fetcher.fetch_count("https://images.test/missing.jpg"), 2);
}

// =============================================================================
// Health Check
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let fetcher = Arc::new(MockFetcher::new());
    let router = test_router(mock_service(&fetcher));

    let response = get(&router, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let health = body_json(response).await;
    assert_eq!(health["status"], "healthy");
    assert!(health["version"].is_string());
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let fetcher = Arc::new(MockFetcher::new());
    let router = test_router(mock_service(&fetcher));

    let response = get(&router, "/resize").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
