//! Newsletter subscriber storage.

use sqlx::PgPool;

use crate::DbError;

/// Adds a subscriber and returns the new row id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails; an already subscribed
/// address surfaces as a unique violation.
pub async fn insert_subscriber(pool: &PgPool, email: &str) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO subscribers (email) VALUES ($1) RETURNING id",
    )
    .bind(email)
    .fetch_one(pool)
    .await?;
    Ok(id)
}
