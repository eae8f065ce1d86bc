use axum::{body::Bytes, extract::State, Extension, Json};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_db_error, parse_json_body, Accepted, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct SubscribeRequest {
    email: Option<String>,
}

/// POST /api/v1/newsletter: add an address to the newsletter list.
pub(super) async fn subscribe(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Bytes,
) -> Result<Json<ApiResponse<Accepted>>, ApiError> {
    let rid = &req_id.0;
    let request: SubscribeRequest = parse_json_body(rid, &body, "invalid request")?;

    let email = request
        .email
        .as_deref()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| e.contains('@'))
        .ok_or_else(|| {
            ApiError::new(
                rid,
                "validation_error",
                "Eine gültige E-Mail-Adresse ist erforderlich.",
            )
        })?;

    duolb_db::insert_subscriber(&state.pool, &email)
        .await
        .map_err(|e| {
            if e.is_unique_violation() {
                ApiError::new(rid, "conflict", "Diese E-Mail ist bereits abonniert.")
            } else {
                map_db_error(rid.clone(), &e)
            }
        })?;

    Ok(Json(ApiResponse {
        data: Accepted::new(None),
        meta: ResponseMeta::new(req_id.0),
    }))
}
