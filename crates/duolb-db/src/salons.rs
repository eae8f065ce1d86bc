//! Salon listing reads backing the nearby search.

use duolb_core::{Coordinate, Rating, Salon, SalonFilter, SalonOrder, SalonSource};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `salons` table in the shape search needs.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SalonRow {
    pub id: i64,
    pub salon_name: Option<String>,
    pub slug: String,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub full_address: Option<String>,
    pub city_slug: Option<String>,
    pub category_slug: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub rating_value: Option<f64>,
    pub rating_count: Option<i32>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub booking_url: Option<String>,
}

impl From<SalonRow> for Salon {
    fn from(row: SalonRow) -> Self {
        Self {
            id: row.id,
            name: row.salon_name,
            slug: row.slug,
            description: row.description,
            cover_image: row.cover_image,
            full_address: row.full_address,
            city_slug: row.city_slug,
            category_slug: row.category_slug,
            coordinate: Coordinate::from_parts(row.latitude, row.longitude),
            rating: Rating::from_parts(row.rating_value, row.rating_count.map(i64::from)),
            phone: row.phone,
            website: row.website,
            booking_url: row.booking_url,
        }
    }
}

const SALON_COLUMNS: &str = "id, salon_name, slug, description, cover_image, full_address, \
     city_slug, category_slug, latitude, longitude, rating_value, rating_count, \
     phone, website, booking_url";

/// [`SalonSource`] over a Postgres pool.
#[derive(Debug, Clone)]
pub struct PgSalonSource {
    pool: PgPool,
}

impl PgSalonSource {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl SalonSource for PgSalonSource {
    type Error = DbError;

    async fn fetch_by_category(&self, filter: &SalonFilter<'_>) -> Result<Vec<Salon>, DbError> {
        let order_by = match filter.order {
            SalonOrder::Natural => "id",
            SalonOrder::RatingDesc => "rating_value DESC NULLS LAST, id",
        };
        let sql = format!(
            "SELECT {SALON_COLUMNS} \
             FROM salons \
             WHERE category_slug = $1 \
               AND ($2::TEXT IS NULL OR city_slug = $2) \
               AND (NOT $3 OR (latitude IS NOT NULL AND longitude IS NOT NULL)) \
             ORDER BY {order_by} \
             LIMIT $4"
        );
        let limit = i64::try_from(filter.limit).unwrap_or(i64::MAX);

        let rows = sqlx::query_as::<_, SalonRow>(&sql)
            .bind(filter.category_slug)
            .bind(filter.city_slug)
            .bind(filter.require_coordinates)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Salon::from).collect())
    }
}

/// Returns the id of the salon with `slug`, or `None` if there is none.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_salon_id_by_slug(pool: &PgPool, slug: &str) -> Result<Option<i64>, DbError> {
    let id = sqlx::query_scalar::<_, i64>("SELECT id FROM salons WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> SalonRow {
        SalonRow {
            id: 7,
            salon_name: Some("Haarwerk".to_string()),
            slug: "haarwerk".to_string(),
            description: None,
            cover_image: None,
            full_address: Some("Torstr. 1, Berlin".to_string()),
            city_slug: Some("berlin".to_string()),
            category_slug: Some("friseur".to_string()),
            latitude: Some(52.52),
            longitude: Some(13.405),
            rating_value: Some(4.7),
            rating_count: Some(31),
            phone: None,
            website: None,
            booking_url: None,
        }
    }

    #[test]
    fn row_maps_coordinates_and_rating() {
        let salon = Salon::from(row());
        assert_eq!(salon.name.as_deref(), Some("Haarwerk"));
        assert_eq!(salon.coordinate, Some(Coordinate::new(52.52, 13.405)));
        assert_eq!(
            salon.rating,
            Some(Rating {
                value: 4.7,
                count: 31
            })
        );
    }

    #[test]
    fn half_missing_coordinate_maps_to_none() {
        let salon = Salon::from(SalonRow {
            longitude: None,
            rating_value: None,
            ..row()
        });
        assert_eq!(salon.coordinate, None);
        assert_eq!(salon.rating, None);
    }
}
