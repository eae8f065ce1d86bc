use std::{sync::Arc, time::Duration};

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use duolb_core::NearbyDefaults;
use sqlx::PgPool;
use tower::ServiceExt;

use super::{build_app, AppState, SiteSettings};
use crate::middleware::KeyedRateLimiter;

pub(crate) const TEST_SITE: &str = "https://duolb.test";
pub(crate) const TEST_OWNER_SECRET: &str = "owner-secret-for-tests";
pub(crate) const BROWSER_UA: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 Safari/605.1.15";

pub(crate) fn test_state(pool: PgPool, track_limit: usize) -> AppState {
    AppState {
        pool,
        site: Arc::new(SiteSettings {
            site_url: TEST_SITE.to_string(),
            owner_secret: Some(TEST_OWNER_SECRET.to_string()),
            nearby: NearbyDefaults::default(),
        }),
        track_limiter: KeyedRateLimiter::new(track_limit, Duration::from_secs(60)),
        http: reqwest::Client::new(),
    }
}

pub(crate) fn test_app(pool: PgPool) -> Router {
    build_app(test_state(pool, 30))
}

pub(crate) async fn seed_city(pool: &PgPool, name: &str, slug: &str) {
    sqlx::query("INSERT INTO cities (name, slug) VALUES ($1, $2)")
        .bind(name)
        .bind(slug)
        .execute(pool)
        .await
        .expect("insert city");
}

pub(crate) async fn seed_category(pool: &PgPool, name: &str, slug: &str) {
    sqlx::query("INSERT INTO business_categories (name, slug) VALUES ($1, $2)")
        .bind(name)
        .bind(slug)
        .execute(pool)
        .await
        .expect("insert category");
}

/// Insert a salon and return its id.
pub(crate) async fn seed_salon(
    pool: &PgPool,
    slug: &str,
    city_slug: &str,
    category_slug: &str,
    coordinate: Option<(f64, f64)>,
) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO salons (salon_name, slug, full_address, city_slug, category_slug, latitude, longitude) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
    )
    .bind(format!("Salon {slug}"))
    .bind(slug)
    .bind(format!("{slug}str. 1"))
    .bind(city_slug)
    .bind(category_slug)
    .bind(coordinate.map(|c| c.0))
    .bind(coordinate.map(|c| c.1))
    .fetch_one(pool)
    .await
    .expect("insert salon")
}

pub(crate) fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

pub(crate) fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    post_json_with(uri, body, &[])
}

pub(crate) fn post_json_with(
    uri: &str,
    body: &serde_json::Value,
    headers: &[(&str, &str)],
) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request")
}

/// Send one request and return the status with the raw body.
pub(crate) async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    (status, body.to_vec())
}

pub(crate) async fn send_json(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let (status, body) = send(app, request).await;
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).expect("json parse")
    };
    (status, json)
}
