use axum::{
    body::Bytes,
    extract::State,
    http::{
        header::{HOST, REFERER, USER_AGENT},
        HeaderMap, HeaderName, StatusCode,
    },
    Extension,
};
use duolb_core::tracking::{
    classify_visit, is_valid_path, is_valid_session_id, sanitize, sanitize_optional,
    tracking_client_ip, Visit, MAX_EVENT_LEN, MAX_LANGUAGE_LEN, MAX_PATH_LEN, MAX_TIMEZONE_LEN,
    MAX_UTM_LEN,
};
use duolb_db::NewAnalyticsEvent;
use serde::Deserialize;
use subtle::ConstantTimeEq;

use crate::middleware::RequestId;

use super::{map_db_error, parse_json_body, ApiError, AppState};

const DEFAULT_EVENT: &str = "pageview";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct TrackingPayload {
    event: Option<String>,
    path: Option<String>,
    referrer: Option<String>,
    user_agent: Option<String>,
    session_id: Option<String>,
    owner_key: Option<String>,
    screen_width: Option<i32>,
    screen_height: Option<i32>,
    language: Option<String>,
    timezone: Option<String>,
    utm_source: Option<String>,
    utm_medium: Option<String>,
    utm_campaign: Option<String>,
}

/// POST /api/v1/track: record a first-party analytics event.
///
/// Owner, development, bot and agent-less traffic is acknowledged with 204
/// and dropped.
pub(super) async fn track_event(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let rid = &req_id.0;
    let payload: TrackingPayload = parse_json_body(rid, &body, "invalid JSON")?;

    let header = |name: HeaderName| headers.get(name).and_then(|v| v.to_str().ok());
    let user_agent = sanitize(
        non_empty(payload.user_agent.as_deref())
            .or_else(|| header(USER_AGENT))
            .unwrap_or_default(),
        MAX_PATH_LEN,
    );
    let referrer = sanitize(
        non_empty(payload.referrer.as_deref())
            .or_else(|| header(REFERER))
            .unwrap_or_default(),
        MAX_PATH_LEN,
    );

    let visit = Visit {
        owner_key_matches: owner_key_matches(
            payload.owner_key.as_deref(),
            state.site.owner_secret.as_deref(),
        ),
        host: header(HOST).unwrap_or_default(),
        referrer: &referrer,
        user_agent: &user_agent,
    };
    if let Some(reason) = classify_visit(&visit) {
        tracing::debug!(?reason, "tracking event skipped");
        return Ok(StatusCode::NO_CONTENT);
    }

    let client_ip = tracking_client_ip(|name| headers.get(name).and_then(|v| v.to_str().ok()))
        .filter(|ip| *ip != "unknown");
    let session_id = non_empty(payload.session_id.as_deref());
    let rate_key = format!(
        "{}:{}",
        client_ip.unwrap_or("unknown"),
        session_id.unwrap_or("unknown")
    );
    if !state.track_limiter.check(&rate_key).await {
        return Err(ApiError::new(rid, "rate_limited", "rate limit exceeded"));
    }

    let path = payload.path.as_deref().unwrap_or_default();
    if !is_valid_path(path) {
        return Err(ApiError::new(rid, "validation_error", "invalid path"));
    }
    if session_id.is_some_and(|id| !is_valid_session_id(id)) {
        return Err(ApiError::new(rid, "validation_error", "invalid session id"));
    }

    let event = NewAnalyticsEvent {
        event_name: sanitize(
            non_empty(payload.event.as_deref()).unwrap_or(DEFAULT_EVENT),
            MAX_EVENT_LEN,
        ),
        path: sanitize(path, MAX_PATH_LEN),
        referrer: Some(referrer).filter(|r| !r.is_empty()),
        user_agent,
        session_id: session_id.map(ToOwned::to_owned),
        client_ip: client_ip.map(ToOwned::to_owned),
        screen_width: payload.screen_width.filter(|w| *w != 0),
        screen_height: payload.screen_height.filter(|h| *h != 0),
        language: sanitize_optional(payload.language.as_deref(), MAX_LANGUAGE_LEN),
        timezone: sanitize_optional(payload.timezone.as_deref(), MAX_TIMEZONE_LEN),
        utm_source: sanitize_optional(payload.utm_source.as_deref(), MAX_UTM_LEN),
        utm_medium: sanitize_optional(payload.utm_medium.as_deref(), MAX_UTM_LEN),
        utm_campaign: sanitize_optional(payload.utm_campaign.as_deref(), MAX_UTM_LEN),
    };

    duolb_db::insert_analytics_event(&state.pool, &event)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(StatusCode::NO_CONTENT)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Constant-time comparison against the configured owner secret. Without a
/// configured secret nothing matches.
fn owner_key_matches(candidate: Option<&str>, secret: Option<&str>) -> bool {
    match (candidate, secret) {
        (Some(candidate), Some(secret)) => candidate.as_bytes().ct_eq(secret.as_bytes()).into(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_key_requires_configured_secret() {
        assert!(owner_key_matches(Some("s3cret"), Some("s3cret")));
        assert!(!owner_key_matches(Some("s3cret"), Some("other")));
        assert!(!owner_key_matches(Some("s3cret"), None));
        assert!(!owner_key_matches(None, Some("s3cret")));
    }

    #[test]
    fn payload_uses_camel_case_keys() {
        let payload: TrackingPayload = serde_json::from_str(
            r#"{"path":"/","sessionId":"abcdefghij","screenWidth":1280,"utmSource":"ig"}"#,
        )
        .expect("parse");
        assert_eq!(payload.session_id.as_deref(), Some("abcdefghij"));
        assert_eq!(payload.screen_width, Some(1280));
        assert_eq!(payload.utm_source.as_deref(), Some("ig"));
        assert!(payload.owner_key.is_none());
    }
}
