mod image;
mod newsletter;
mod reviews;
mod salons;
mod track;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use duolb_core::{AppConfig, NearbyDefaults};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{enforce_utf8_charset, request_id, KeyedRateLimiter, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub site: Arc<SiteSettings>,
    pub track_limiter: KeyedRateLimiter,
    /// Outbound client for the image proxy.
    pub http: reqwest::Client,
}

/// Per-deployment settings the handlers read.
#[derive(Debug, Clone)]
pub struct SiteSettings {
    /// Absolute origin without a trailing slash.
    pub site_url: String,
    pub owner_secret: Option<String>,
    pub nearby: NearbyDefaults,
}

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

impl AppState {
    /// # Errors
    ///
    /// Returns [`reqwest::Error`] if the outbound HTTP client cannot be built.
    pub fn from_config(pool: PgPool, config: &AppConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            pool,
            site: Arc::new(SiteSettings {
                site_url: config.site_url.clone(),
                owner_secret: config.owner_secret.clone(),
                nearby: config.nearby,
            }),
            track_limiter: KeyedRateLimiter::new(
                config.track_rate_limit_max,
                Duration::from_secs(config.track_rate_limit_window_secs),
            ),
            http,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

/// Body of a successful write that returns nothing else.
#[derive(Debug, Serialize)]
pub(super) struct Accepted {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

impl Accepted {
    pub(super) fn new(message: Option<&'static str>) -> Self {
        Self {
            success: true,
            message,
        }
    }
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_db_error(request_id: String, error: &duolb_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

/// Decode a JSON request body, answering malformed input with a 400.
pub(super) fn parse_json_body<T: DeserializeOwned>(
    request_id: &str,
    body: &[u8],
    message: &str,
) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "rejected malformed JSON body");
        ApiError::new(request_id, "bad_request", message)
    })
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
}

fn api_router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/salons/nearby", get(salons::list_nearby_salons))
        .route(
            "/api/v1/salons/{slug}/reviews",
            get(salons::list_salon_reviews),
        )
        .route("/api/v1/reviews", post(reviews::submit_review))
        .route("/api/v1/newsletter", post(newsletter::subscribe))
        .route("/api/v1/track", post(track::track_event))
        .route("/api/v1/image", get(image::proxy_image))
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(api_router())
        .merge(crate::feeds::routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id))
                .layer(axum::middleware::from_fn(enforce_utf8_charset)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match duolb_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support;
