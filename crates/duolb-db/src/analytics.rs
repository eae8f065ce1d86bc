//! Page-view and event storage for first-party analytics.

use sqlx::PgPool;

use crate::DbError;

/// An already filtered and truncated tracking event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewAnalyticsEvent {
    pub event_name: String,
    pub path: String,
    pub referrer: Option<String>,
    pub user_agent: String,
    pub session_id: Option<String>,
    pub client_ip: Option<String>,
    pub screen_width: Option<i32>,
    pub screen_height: Option<i32>,
    pub language: Option<String>,
    pub timezone: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
}

/// Stores one event and returns its id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_analytics_event(
    pool: &PgPool,
    event: &NewAnalyticsEvent,
) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO analytics_events ( \
             event_name, path, referrer, user_agent, session_id, client_ip, \
             screen_width, screen_height, language, timezone, \
             utm_source, utm_medium, utm_campaign \
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
         RETURNING id",
    )
    .bind(&event.event_name)
    .bind(&event.path)
    .bind(event.referrer.as_deref())
    .bind(&event.user_agent)
    .bind(event.session_id.as_deref())
    .bind(event.client_ip.as_deref())
    .bind(event.screen_width)
    .bind(event.screen_height)
    .bind(event.language.as_deref())
    .bind(event.timezone.as_deref())
    .bind(event.utm_source.as_deref())
    .bind(event.utm_medium.as_deref())
    .bind(event.utm_campaign.as_deref())
    .fetch_one(pool)
    .await?;
    Ok(id)
}
