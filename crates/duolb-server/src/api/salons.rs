use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use duolb_core::{resolve_salon_cover_image, search_nearby, Coordinate, NearbyQuery, NearbySalon};
use duolb_db::PgSalonSource;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

/// Numeric fields stay raw text so unusable values fall back to defaults
/// instead of rejecting the request.
#[derive(Debug, Deserialize)]
pub(super) struct NearbyParams {
    #[serde(default)]
    pub category: String,
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub radius_km: Option<String>,
    pub limit: Option<String>,
    pub city: Option<String>,
}

fn lenient_number(value: Option<&str>) -> Option<f64> {
    value?.trim().parse().ok()
}

#[derive(Debug, Serialize)]
pub(super) struct NearbySalonItem {
    #[serde(flatten)]
    salon: NearbySalon,
    cover_image_url: String,
}

#[derive(Debug, Serialize)]
pub(super) struct ReviewItem {
    id: i64,
    reviewer_name: String,
    rating: i16,
    comment: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(super) struct SalonReviews {
    salon_slug: String,
    average_rating: Option<f64>,
    review_count: i64,
    reviews: Vec<ReviewItem>,
}

/// GET /api/v1/salons/nearby: salons of a category near the caller.
///
/// Never fails on bad search input; it answers with an empty list instead.
pub(super) async fn list_nearby_salons(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<NearbyParams>,
) -> Json<ApiResponse<Vec<NearbySalonItem>>> {
    let mut query = NearbyQuery::new(&params.category).with_defaults(state.site.nearby);
    if let (Some(lat), Some(lng)) = (
        lenient_number(params.lat.as_deref()),
        lenient_number(params.lng.as_deref()),
    ) {
        query = query.with_user_coordinate(Coordinate::new(lat, lng));
    }
    if let Some(radius_km) = lenient_number(params.radius_km.as_deref()) {
        query = query.with_radius_km(radius_km);
    }
    if let Some(limit) = lenient_number(params.limit.as_deref()) {
        query = query.with_limit(limit);
    }
    if let Some(city) = params.city.as_deref() {
        query = query.with_fallback_city(city);
    }

    let source = PgSalonSource::new(state.pool.clone());
    let data = search_nearby(&source, &query)
        .await
        .into_iter()
        .map(|salon| NearbySalonItem {
            cover_image_url: resolve_salon_cover_image(salon.salon.cover_image.as_deref())
                .to_owned(),
            salon,
        })
        .collect();

    Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    })
}

/// GET /api/v1/salons/{slug}/reviews: approved reviews with their summary.
pub(super) async fn list_salon_reviews(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<SalonReviews>>, ApiError> {
    let salon_id = duolb_db::find_salon_id_by_slug(&state.pool, &slug)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "salon not found"))?;

    let rows = duolb_db::list_approved_reviews(&state.pool, salon_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let summary = duolb_db::review_summary(&state.pool, salon_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let reviews = rows
        .into_iter()
        .map(|row| ReviewItem {
            id: row.id,
            reviewer_name: row.reviewer_name,
            rating: row.rating,
            comment: row.comment,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data: SalonReviews {
            salon_slug: slug,
            average_rating: summary.average_rating,
            review_count: summary.review_count,
            reviews,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
