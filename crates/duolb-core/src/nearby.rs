//! Nearby salon search: proximity ranking with a city fallback.
//!
//! The search never fails. Empty categories, missing location signals and
//! datastore errors all produce an empty result; a candidate whose stored
//! coordinate cannot be used is dropped on its own without affecting the rest.

use std::future::Future;

use crate::geo::{distance_km, Coordinate};
use crate::salon::{NearbySalon, Salon};

pub const DEFAULT_RADIUS_KM: f64 = 15.0;
pub const DEFAULT_LIMIT: usize = 24;
pub const DEFAULT_MAX_FETCH: usize = 500;

/// Row ordering a [`SalonSource`] must apply before capping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SalonOrder {
    /// Stable storage order.
    Natural,
    /// Highest rating first; unrated salons last.
    RatingDesc,
}

/// Filters understood by a [`SalonSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalonFilter<'a> {
    pub category_slug: &'a str,
    pub city_slug: Option<&'a str>,
    /// Only rows with both latitude and longitude present.
    pub require_coordinates: bool,
    pub order: SalonOrder,
    pub limit: usize,
}

/// Read access to salon listings, implemented by the datastore layer.
///
/// Errors are returned, not raised; the search maps any error to an empty
/// result.
pub trait SalonSource: Sync {
    type Error: std::fmt::Display + Send;

    fn fetch_by_category(
        &self,
        filter: &SalonFilter<'_>,
    ) -> impl Future<Output = Result<Vec<Salon>, Self::Error>> + Send;
}

/// Per-deployment defaults substituted for missing or unusable parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyDefaults {
    pub radius_km: f64,
    pub limit: usize,
    pub max_fetch: usize,
}

impl Default for NearbyDefaults {
    fn default() -> Self {
        Self {
            radius_km: DEFAULT_RADIUS_KM,
            limit: DEFAULT_LIMIT,
            max_fetch: DEFAULT_MAX_FETCH,
        }
    }
}

/// Raw search parameters as received from a caller.
///
/// Numeric knobs are `f64` so that whatever the caller sent (fractions,
/// negatives, NaN) can be sanitised in one place by [`SearchLimits::resolve`].
#[derive(Debug, Clone, Default)]
pub struct NearbyQuery<'a> {
    pub category: &'a str,
    pub user_coordinate: Option<Coordinate>,
    pub radius_km: Option<f64>,
    pub limit: Option<f64>,
    pub max_fetch: Option<f64>,
    pub fallback_city: Option<&'a str>,
    pub defaults: NearbyDefaults,
}

impl<'a> NearbyQuery<'a> {
    #[must_use]
    pub fn new(category: &'a str) -> Self {
        Self {
            category,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_user_coordinate(mut self, coordinate: Coordinate) -> Self {
        self.user_coordinate = Some(coordinate);
        self
    }

    #[must_use]
    pub fn with_radius_km(mut self, radius_km: f64) -> Self {
        self.radius_km = Some(radius_km);
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: f64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn with_max_fetch(mut self, max_fetch: f64) -> Self {
        self.max_fetch = Some(max_fetch);
        self
    }

    #[must_use]
    pub fn with_fallback_city(mut self, city: &'a str) -> Self {
        self.fallback_city = Some(city);
        self
    }

    #[must_use]
    pub fn with_defaults(mut self, defaults: NearbyDefaults) -> Self {
        self.defaults = defaults;
        self
    }
}

/// Sanitised numeric parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchLimits {
    pub radius_km: f64,
    pub limit: usize,
    pub max_fetch: usize,
}

impl SearchLimits {
    /// Replace non-finite or non-positive values with the defaults and floor
    /// the counts.
    #[must_use]
    pub fn resolve(query: &NearbyQuery<'_>) -> Self {
        let d = query.defaults;
        Self {
            radius_km: positive(query.radius_km).unwrap_or(d.radius_km),
            limit: positive(query.limit).map_or(d.limit, floor_to_usize),
            max_fetch: positive(query.max_fetch).map_or(d.max_fetch, floor_to_usize),
        }
    }
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn floor_to_usize(value: f64) -> usize {
    // `as` saturates, so absurdly large inputs cap at usize::MAX.
    value.floor() as usize
}

fn normalize_slug(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Find salons of a category near the user, or the best rated ones in a
/// fallback city when no usable coordinate was supplied.
///
/// Proximity results satisfy `distance_km <= radius_km` and are ordered
/// nearest first (ties keep fetch order). Fallback results all carry
/// `distance_km == 0.0`, ordered by rating, and ignore the radius.
pub async fn search_nearby<S>(source: &S, query: &NearbyQuery<'_>) -> Vec<NearbySalon>
where
    S: SalonSource + ?Sized,
{
    let category = normalize_slug(query.category);
    if category.is_empty() {
        return Vec::new();
    }

    let limits = SearchLimits::resolve(query);
    let user = query.user_coordinate.filter(Coordinate::is_valid);
    let fallback_city = query
        .fallback_city
        .map(normalize_slug)
        .filter(|city| !city.is_empty());

    match (user, fallback_city) {
        (Some(user), _) => proximity_search(source, &category, user, limits).await,
        (None, Some(city)) => city_fallback(source, &category, &city, limits).await,
        (None, None) => Vec::new(),
    }
}

async fn city_fallback<S>(
    source: &S,
    category: &str,
    city: &str,
    limits: SearchLimits,
) -> Vec<NearbySalon>
where
    S: SalonSource + ?Sized,
{
    let filter = SalonFilter {
        category_slug: category,
        city_slug: Some(city),
        require_coordinates: false,
        order: SalonOrder::RatingDesc,
        limit: limits.limit,
    };

    match source.fetch_by_category(&filter).await {
        Ok(salons) => salons
            .into_iter()
            .take(limits.limit)
            .map(|salon| NearbySalon {
                salon,
                distance_km: 0.0,
            })
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, category, city, "city fallback fetch failed");
            Vec::new()
        }
    }
}

async fn proximity_search<S>(
    source: &S,
    category: &str,
    user: Coordinate,
    limits: SearchLimits,
) -> Vec<NearbySalon>
where
    S: SalonSource + ?Sized,
{
    let filter = SalonFilter {
        category_slug: category,
        city_slug: None,
        require_coordinates: true,
        order: SalonOrder::Natural,
        limit: limits.max_fetch,
    };

    match source.fetch_by_category(&filter).await {
        Ok(candidates) => rank_by_distance(candidates, user, limits),
        Err(e) => {
            tracing::warn!(error = %e, category, "proximity fetch failed");
            Vec::new()
        }
    }
}

/// Annotate, filter by radius, sort nearest first and cap.
///
/// Candidates without a usable coordinate are dropped.
#[must_use]
pub fn rank_by_distance(
    candidates: Vec<Salon>,
    user: Coordinate,
    limits: SearchLimits,
) -> Vec<NearbySalon> {
    let mut ranked: Vec<NearbySalon> = candidates
        .into_iter()
        .filter_map(|salon| {
            let distance_km = distance_km(user, salon.coordinate?)?;
            Some(NearbySalon { salon, distance_km })
        })
        .filter(|s| s.distance_km <= limits.radius_km)
        .collect();

    // `sort_by` is stable; equal distances keep fetch order.
    ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    ranked.truncate(limits.limit);
    ranked
}

#[cfg(test)]
#[path = "nearby_test.rs"]
mod tests;
