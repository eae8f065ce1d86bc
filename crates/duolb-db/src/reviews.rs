//! Database operations for the `salon_reviews` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// An approved review as shown on a salon page.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewRow {
    pub id: i64,
    pub reviewer_name: String,
    pub rating: i16,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Aggregate over a salon's approved reviews.
#[derive(Debug, Clone, Copy, PartialEq, sqlx::FromRow)]
pub struct ReviewSummaryRow {
    pub average_rating: Option<f64>,
    pub review_count: i64,
}

/// A review submission. New reviews are always stored unapproved.
#[derive(Debug, Clone, Copy)]
pub struct NewReview<'a> {
    pub salon_id: i64,
    pub reviewer_name: &'a str,
    pub rating: i16,
    pub comment: &'a str,
    pub reviewer_ip: &'a str,
}

/// Returns the id of an existing review for this salon from this IP.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_review_by_ip(
    pool: &PgPool,
    salon_id: i64,
    reviewer_ip: &str,
) -> Result<Option<i64>, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM salon_reviews WHERE salon_id = $1 AND reviewer_ip = $2",
    )
    .bind(salon_id)
    .bind(reviewer_ip)
    .fetch_optional(pool)
    .await?;
    Ok(id)
}

/// Inserts an unapproved review and returns its id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, including the unique
/// violation raised for a second review from the same IP.
pub async fn insert_review(pool: &PgPool, review: NewReview<'_>) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO salon_reviews \
             (salon_id, reviewer_name, rating, comment, reviewer_ip, approved) \
         VALUES ($1, $2, $3, $4, $5, false) \
         RETURNING id",
    )
    .bind(review.salon_id)
    .bind(review.reviewer_name)
    .bind(review.rating)
    .bind(review.comment)
    .bind(review.reviewer_ip)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

/// Approved reviews for a salon, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_approved_reviews(pool: &PgPool, salon_id: i64) -> Result<Vec<ReviewRow>, DbError> {
    let rows = sqlx::query_as::<_, ReviewRow>(
        "SELECT id, reviewer_name, rating, comment, created_at \
         FROM salon_reviews \
         WHERE salon_id = $1 AND approved = true \
         ORDER BY created_at DESC, id DESC",
    )
    .bind(salon_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Average rating and count of a salon's approved reviews.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn review_summary(pool: &PgPool, salon_id: i64) -> Result<ReviewSummaryRow, DbError> {
    let row = sqlx::query_as::<_, ReviewSummaryRow>(
        "SELECT AVG(rating)::DOUBLE PRECISION AS average_rating, COUNT(*) AS review_count \
         FROM salon_reviews \
         WHERE salon_id = $1 AND approved = true",
    )
    .bind(salon_id)
    .fetch_one(pool)
    .await?;
    Ok(row)
}
