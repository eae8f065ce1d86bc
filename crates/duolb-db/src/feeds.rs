//! Read-model queries for sitemaps and RSS feeds.
//!
//! Timestamps destined for `<lastmod>` are selected as Postgres text and
//! normalised by the caller; feed dates are typed.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A slug with its raw last-modified timestamp text.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct SlugStampRow {
    pub slug: String,
    pub lastmod: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CityCategoryPairRow {
    pub city_slug: String,
    pub category_slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct NamedSlugRow {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CityCategoryCountRow {
    pub city_slug: String,
    pub city_name: String,
    pub category_slug: String,
    pub category_name: String,
    pub salon_count: i64,
}

/// A salon as listed in an RSS feed.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct FeedSalonRow {
    pub salon_name: Option<String>,
    pub slug: String,
    pub full_address: Option<String>,
    pub city_slug: Option<String>,
    pub description: Option<String>,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PostRow {
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Cities by slug.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_city_stamps(pool: &PgPool) -> Result<Vec<SlugStampRow>, DbError> {
    let rows = sqlx::query_as::<_, SlugStampRow>(
        "SELECT DISTINCT ON (slug) slug, updated_at::TEXT AS lastmod \
         FROM cities \
         WHERE slug <> '' \
         ORDER BY slug",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Business categories by slug.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_category_stamps(pool: &PgPool) -> Result<Vec<SlugStampRow>, DbError> {
    let rows = sqlx::query_as::<_, SlugStampRow>(
        "SELECT DISTINCT ON (slug) slug, updated_at::TEXT AS lastmod \
         FROM business_categories \
         WHERE slug <> '' \
         ORDER BY slug",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Every salon.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_salon_stamps(pool: &PgPool) -> Result<Vec<SlugStampRow>, DbError> {
    let rows = sqlx::query_as::<_, SlugStampRow>(
        "SELECT slug, updated_at::TEXT AS lastmod FROM salons ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Blog posts, newest first; `lastmod` falls back to the creation time.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_post_stamps(pool: &PgPool) -> Result<Vec<SlugStampRow>, DbError> {
    let rows = sqlx::query_as::<_, SlugStampRow>(
        "SELECT slug, COALESCE(updated_at, created_at)::TEXT AS lastmod \
         FROM posts \
         WHERE slug <> '' \
         ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Distinct (city, category) pairs used by at least one salon, where both
/// the city and the category exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_city_category_pairs(pool: &PgPool) -> Result<Vec<CityCategoryPairRow>, DbError> {
    let rows = sqlx::query_as::<_, CityCategoryPairRow>(
        "SELECT DISTINCT s.city_slug, s.category_slug \
         FROM salons s \
         JOIN cities c ON c.slug = s.city_slug \
         JOIN business_categories b ON b.slug = s.category_slug \
         ORDER BY s.city_slug, s.category_slug",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Categories with at least one salon, by name. When no salon carries a
/// category at all, every category is returned.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_categories_with_salons(pool: &PgPool) -> Result<Vec<NamedSlugRow>, DbError> {
    let rows = sqlx::query_as::<_, NamedSlugRow>(
        "SELECT b.name, b.slug \
         FROM business_categories b \
         WHERE EXISTS (SELECT 1 FROM salons s WHERE s.category_slug = b.slug) \
            OR NOT EXISTS (SELECT 1 FROM salons s WHERE s.category_slug IS NOT NULL) \
         ORDER BY b.name",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Cities with at least one salon, by name, capped at `limit`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_cities_with_salons(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<NamedSlugRow>, DbError> {
    let rows = sqlx::query_as::<_, NamedSlugRow>(
        "SELECT c.name, c.slug \
         FROM cities c \
         WHERE EXISTS (SELECT 1 FROM salons s WHERE s.city_slug = c.slug) \
         ORDER BY c.name \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Salon counts per known (city, category) combination, largest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_city_category_counts(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<CityCategoryCountRow>, DbError> {
    let rows = sqlx::query_as::<_, CityCategoryCountRow>(
        "SELECT c.slug AS city_slug, c.name AS city_name, \
                b.slug AS category_slug, b.name AS category_name, \
                COUNT(*) AS salon_count \
         FROM salons s \
         JOIN cities c ON c.slug = s.city_slug \
         JOIN business_categories b ON b.slug = s.category_slug \
         GROUP BY c.slug, c.name, b.slug, b.name \
         ORDER BY salon_count DESC, c.slug, b.slug \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Most recently changed salons across the directory.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_newest_salons(pool: &PgPool, limit: i64) -> Result<Vec<FeedSalonRow>, DbError> {
    let rows = sqlx::query_as::<_, FeedSalonRow>(
        "SELECT salon_name, slug, full_address, city_slug, description, \
                COALESCE(updated_at, created_at) AS published_at \
         FROM salons \
         WHERE slug <> '' \
         ORDER BY published_at DESC, id DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Newest salons of one category by creation time.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_category_feed_salons(
    pool: &PgPool,
    category_slug: &str,
    limit: i64,
) -> Result<Vec<FeedSalonRow>, DbError> {
    let rows = sqlx::query_as::<_, FeedSalonRow>(
        "SELECT salon_name, slug, full_address, city_slug, description, \
                created_at AS published_at \
         FROM salons \
         WHERE category_slug = $1 AND slug <> '' \
         ORDER BY created_at DESC, id DESC \
         LIMIT $2",
    )
    .bind(category_slug)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Blog posts, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_posts(pool: &PgPool) -> Result<Vec<PostRow>, DbError> {
    let rows = sqlx::query_as::<_, PostRow>(
        "SELECT title, slug, description, created_at FROM posts ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
