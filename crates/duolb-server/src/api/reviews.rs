use axum::{
    body::Bytes,
    extract::State,
    http::{header::REFERER, HeaderMap},
    Extension, Json,
};
use duolb_core::tracking::reviewer_ip;
use duolb_db::NewReview;
use serde::Deserialize;
use serde_json::Value;

use crate::middleware::RequestId;

use super::{map_db_error, parse_json_body, Accepted, ApiError, ApiResponse, AppState, ResponseMeta};

const ONE_REVIEW_PER_SALON: &str = "Du darfst pro Salon nur eine Bewertung abgeben.";

#[derive(Debug, Deserialize)]
pub(super) struct ReviewPayload {
    /// Number or numeric string.
    salon_id: Option<Value>,
    salon_slug: Option<String>,
    reviewer_name: Option<String>,
    rating: Option<Value>,
    comment: Option<String>,
}

/// POST /api/v1/reviews: submit a review for moderation.
pub(super) async fn submit_review(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<Accepted>>, ApiError> {
    let rid = &req_id.0;
    let payload: ReviewPayload = parse_json_body(rid, &body, "invalid request")?;

    let slug = payload
        .salon_slug
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .or_else(|| {
            headers
                .get(REFERER)
                .and_then(|v| v.to_str().ok())
                .and_then(slug_from_referer)
        });

    let mut salon_id = payload.salon_id.as_ref().and_then(integer_value);
    if let Some(slug) = slug {
        let found = duolb_db::find_salon_id_by_slug(&state.pool, &slug)
            .await
            .map_err(|e| map_db_error(rid.clone(), &e))?;
        let Some(id) = found else {
            return Err(ApiError::new(rid, "validation_error", "invalid salon slug"));
        };
        salon_id = Some(id);
    }

    let Some(salon_id) = salon_id.filter(|id| *id > 0) else {
        return Err(ApiError::new(rid, "validation_error", "salon_id is required"));
    };

    let reviewer_name = payload.reviewer_name.as_deref().unwrap_or_default().trim();
    let comment = payload.comment.as_deref().unwrap_or_default().trim();
    if reviewer_name.is_empty() || comment.is_empty() {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "reviewer_name and comment are required",
        ));
    }

    let Some(rating) = payload
        .rating
        .as_ref()
        .and_then(integer_value)
        .filter(|r| (1..=5).contains(r))
        .and_then(|r| i16::try_from(r).ok())
    else {
        return Err(ApiError::new(rid, "validation_error", "rating must be 1 to 5"));
    };

    // Never trust a client-sent address.
    let ip = reviewer_ip(|name| headers.get(name).and_then(|v| v.to_str().ok()));

    let existing = duolb_db::find_review_by_ip(&state.pool, salon_id, &ip)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    if existing.is_some() {
        return Err(ApiError::new(rid, "conflict", ONE_REVIEW_PER_SALON));
    }

    duolb_db::insert_review(
        &state.pool,
        NewReview {
            salon_id,
            reviewer_name,
            rating,
            comment,
            reviewer_ip: &ip,
        },
    )
    .await
    .map_err(|e| {
        if e.is_unique_violation() {
            ApiError::new(rid, "conflict", ONE_REVIEW_PER_SALON)
        } else {
            map_db_error(rid.clone(), &e)
        }
    })?;

    tracing::info!(salon_id, "review submitted for moderation");
    Ok(Json(ApiResponse {
        data: Accepted::new(Some("Review submitted and awaiting approval.")),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Integral JSON number, or a string holding one.
#[allow(clippy::cast_possible_truncation)]
fn integer_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract().abs() < f64::EPSILON && f.abs() < 9.0e15)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Salon slug from an absolute referring `/salon/{slug}` page URL.
fn slug_from_referer(referer: &str) -> Option<String> {
    let url = reqwest::Url::parse(referer).ok()?;
    let mut parts = url.path_segments()?.filter(|p| !p.is_empty());
    if parts.next()? != "salon" {
        return None;
    }
    let raw = parts.next()?;
    let decoded = percent_encoding::percent_decode_str(raw)
        .decode_utf8()
        .ok()?;
    let slug = decoded.trim();
    (!slug.is_empty()).then(|| slug.to_owned())
}
