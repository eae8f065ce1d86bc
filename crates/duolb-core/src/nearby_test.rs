use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::*;
use crate::salon::Rating;

const BERLIN: Coordinate = Coordinate::new(52.52, 13.405);

/// In-memory stand-in for the salons table, applying filters the way the
/// Postgres source does.
struct MemorySource {
    salons: Vec<Salon>,
    calls: AtomicUsize,
    last_filter: Mutex<Option<(String, Option<String>, bool, SalonOrder, usize)>>,
}

impl MemorySource {
    fn new(salons: Vec<Salon>) -> Self {
        Self {
            salons,
            calls: AtomicUsize::new(0),
            last_filter: Mutex::new(None),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SalonSource for MemorySource {
    type Error = String;

    async fn fetch_by_category(&self, filter: &SalonFilter<'_>) -> Result<Vec<Salon>, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_filter.lock().unwrap() = Some((
            filter.category_slug.to_string(),
            filter.city_slug.map(str::to_string),
            filter.require_coordinates,
            filter.order,
            filter.limit,
        ));

        let mut rows: Vec<Salon> = self
            .salons
            .iter()
            .filter(|s| s.category_slug.as_deref() == Some(filter.category_slug))
            .filter(|s| filter.city_slug.is_none() || s.city_slug.as_deref() == filter.city_slug)
            .filter(|s| !filter.require_coordinates || s.coordinate.is_some())
            .cloned()
            .collect();
        if filter.order == SalonOrder::RatingDesc {
            rows.sort_by(|a, b| {
                let ra = a.rating.map_or(f64::NEG_INFINITY, |r| r.value);
                let rb = b.rating.map_or(f64::NEG_INFINITY, |r| r.value);
                rb.total_cmp(&ra)
            });
        }
        rows.truncate(filter.limit);
        Ok(rows)
    }
}

struct FailingSource;

impl SalonSource for FailingSource {
    type Error = String;

    async fn fetch_by_category(&self, _filter: &SalonFilter<'_>) -> Result<Vec<Salon>, String> {
        Err("connection reset".to_string())
    }
}

fn salon(id: i64, category: &str, city: &str, coordinate: Option<Coordinate>) -> Salon {
    Salon {
        id,
        name: Some(format!("Salon {id}")),
        slug: format!("salon-{id}"),
        description: None,
        cover_image: None,
        full_address: None,
        city_slug: Some(city.to_string()),
        category_slug: Some(category.to_string()),
        coordinate,
        rating: None,
        phone: None,
        website: None,
        booking_url: None,
    }
}

fn rated(mut s: Salon, value: f64) -> Salon {
    s.rating = Some(Rating { value, count: 10 });
    s
}

fn ids(results: &[NearbySalon]) -> Vec<i64> {
    results.iter().map(|r| r.salon.id).collect()
}

/// 497 salons spread around Munich plus three within 15 km of Berlin,
/// interleaved so fetch order is not distance order.
fn berlin_scenario() -> Vec<Salon> {
    let mut salons = Vec::with_capacity(500);
    let mut id = 1000;
    for i in 0..497 {
        let offset = f64::from(i % 50) * 0.001;
        salons.push(salon(
            id,
            "hair-salon",
            "muenchen",
            Some(Coordinate::new(48.1351 + offset, 11.582 - offset)),
        ));
        id += 1;
        if i == 10 {
            salons.push(salon(3, "hair-salon", "berlin", Some(Coordinate::new(52.60, 13.30))));
        }
        if i == 200 {
            salons.push(salon(1, "hair-salon", "berlin", Some(Coordinate::new(52.53, 13.41))));
        }
        if i == 400 {
            salons.push(salon(2, "hair-salon", "berlin", Some(Coordinate::new(52.55, 13.45))));
        }
    }
    salons
}

#[tokio::test]
async fn scenario_a_returns_the_three_berlin_salons_nearest_first() {
    let source = MemorySource::new(berlin_scenario());
    let query = NearbyQuery::new("hair-salon").with_user_coordinate(BERLIN);

    let results = search_nearby(&source, &query).await;

    assert_eq!(ids(&results), vec![1, 2, 3]);
    assert!(results.iter().all(|r| r.distance_km <= DEFAULT_RADIUS_KM));
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn proximity_fetch_requires_coordinates_and_skips_city() {
    let source = MemorySource::new(berlin_scenario());
    let query = NearbyQuery::new("hair-salon")
        .with_user_coordinate(BERLIN)
        .with_fallback_city("hamburg");

    let _ = search_nearby(&source, &query).await;

    let filter = source.last_filter.lock().unwrap().clone().unwrap();
    assert_eq!(
        filter,
        (
            "hair-salon".to_string(),
            None,
            true,
            SalonOrder::Natural,
            DEFAULT_MAX_FETCH
        )
    );
}

#[tokio::test]
async fn scenario_b_city_fallback_orders_by_rating_with_zero_distance() {
    let mut salons = vec![
        rated(salon(1, "nail-studio", "berlin", None), 3.9),
        rated(salon(2, "nail-studio", "berlin", Some(BERLIN)), 4.8),
        rated(salon(3, "nail-studio", "hamburg", None), 5.0),
        rated(salon(4, "hair-salon", "berlin", None), 4.9),
        rated(salon(5, "nail-studio", "berlin", None), 4.2),
    ];
    for id in 100..130 {
        salons.push(rated(salon(id, "nail-studio", "berlin", None), 1.0));
    }
    let source = MemorySource::new(salons);
    let query = NearbyQuery::new("nail-studio").with_fallback_city("berlin");

    let results = search_nearby(&source, &query).await;

    assert_eq!(results.len(), DEFAULT_LIMIT);
    assert_eq!(&ids(&results)[..3], &[2, 5, 1]);
    assert!(results.iter().all(|r| r.distance_km == 0.0));
    assert!(results
        .iter()
        .all(|r| r.salon.city_slug.as_deref() == Some("berlin")));
}

#[tokio::test]
async fn city_fallback_ignores_radius() {
    let source = MemorySource::new(vec![salon(
        1,
        "nail-studio",
        "berlin",
        Some(Coordinate::new(10.0, 10.0)),
    )]);
    let query = NearbyQuery::new("nail-studio")
        .with_fallback_city("berlin")
        .with_radius_km(0.001);

    let results = search_nearby(&source, &query).await;

    assert_eq!(ids(&results), vec![1]);
}

#[tokio::test]
async fn scenario_c_no_coordinate_and_no_city_is_empty_without_fetch() {
    let source = MemorySource::new(berlin_scenario());
    let results = search_nearby(&source, &NearbyQuery::new("hair-salon")).await;

    assert!(results.is_empty());
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn blank_fallback_city_counts_as_absent() {
    let source = MemorySource::new(berlin_scenario());
    let query = NearbyQuery::new("hair-salon").with_fallback_city("   ");

    assert!(search_nearby(&source, &query).await.is_empty());
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn scenario_d_invalid_stored_coordinate_is_excluded() {
    let source = MemorySource::new(vec![
        salon(1, "hair-salon", "berlin", Some(Coordinate::new(95.0, 10.0))),
        salon(2, "hair-salon", "berlin", Some(Coordinate::new(52.53, 13.41))),
    ]);
    let query = NearbyQuery::new("hair-salon").with_user_coordinate(BERLIN);

    let results = search_nearby(&source, &query).await;

    assert_eq!(ids(&results), vec![2]);
}

#[tokio::test]
async fn scenario_e_negative_radius_uses_default() {
    let source = MemorySource::new(vec![
        salon(1, "hair-salon", "berlin", Some(Coordinate::new(52.60, 13.30))),
        salon(2, "hair-salon", "potsdam", Some(Coordinate::new(52.39, 13.06))),
    ]);
    let query = NearbyQuery::new("hair-salon")
        .with_user_coordinate(BERLIN)
        .with_radius_km(-5.0);

    let results = search_nearby(&source, &query).await;

    // ~11 km is inside the default 15 km, Potsdam (~27 km) is not.
    assert_eq!(ids(&results), vec![1]);
}

#[tokio::test]
async fn empty_category_returns_empty_without_fetch() {
    let source = MemorySource::new(berlin_scenario());
    let query = NearbyQuery::new("   ").with_user_coordinate(BERLIN);

    assert!(search_nearby(&source, &query).await.is_empty());
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn category_and_city_are_normalized() {
    let source = MemorySource::new(vec![rated(salon(1, "nail-studio", "berlin", None), 4.0)]);
    let query = NearbyQuery::new("  Nail-Studio ").with_fallback_city(" BERLIN");

    let results = search_nearby(&source, &query).await;

    assert_eq!(ids(&results), vec![1]);
}

#[tokio::test]
async fn out_of_range_user_coordinate_falls_back_to_city() {
    let source = MemorySource::new(vec![rated(salon(1, "nail-studio", "berlin", None), 4.0)]);
    let query = NearbyQuery::new("nail-studio")
        .with_user_coordinate(Coordinate::new(120.0, 13.4))
        .with_fallback_city("berlin");

    let results = search_nearby(&source, &query).await;

    assert_eq!(ids(&results), vec![1]);
    assert_eq!(results[0].distance_km, 0.0);
}

#[tokio::test]
async fn limit_caps_proximity_results() {
    let salons = (0..10)
        .map(|i| {
            salon(
                i,
                "hair-salon",
                "berlin",
                Some(Coordinate::new(52.52 + f64::from(i as i32) * 0.001, 13.405)),
            )
        })
        .collect();
    let source = MemorySource::new(salons);
    let query = NearbyQuery::new("hair-salon")
        .with_user_coordinate(BERLIN)
        .with_limit(3.9);

    let results = search_nearby(&source, &query).await;

    assert_eq!(ids(&results), vec![0, 1, 2]);
}

#[tokio::test]
async fn equal_distances_keep_fetch_order() {
    let same = Some(Coordinate::new(52.53, 13.41));
    let source = MemorySource::new(vec![
        salon(9, "hair-salon", "berlin", same),
        salon(4, "hair-salon", "berlin", same),
        salon(7, "hair-salon", "berlin", same),
    ]);
    let query = NearbyQuery::new("hair-salon").with_user_coordinate(BERLIN);

    assert_eq!(ids(&search_nearby(&source, &query).await), vec![9, 4, 7]);
}

#[tokio::test]
async fn max_fetch_is_floored_and_passed_to_source() {
    let source = MemorySource::new(berlin_scenario());
    let query = NearbyQuery::new("hair-salon")
        .with_user_coordinate(BERLIN)
        .with_max_fetch(12.7);

    let results = search_nearby(&source, &query).await;

    let filter = source.last_filter.lock().unwrap().clone().unwrap();
    assert_eq!(filter.4, 12);
    // Salon 3 sits at position 11 of the fetch order; 1 and 2 fall past the cap.
    assert_eq!(ids(&results), vec![3]);
}

#[tokio::test]
async fn source_error_yields_empty_for_both_strategies() {
    let proximity = NearbyQuery::new("hair-salon").with_user_coordinate(BERLIN);
    let fallback = NearbyQuery::new("hair-salon").with_fallback_city("berlin");

    assert!(search_nearby(&FailingSource, &proximity).await.is_empty());
    assert!(search_nearby(&FailingSource, &fallback).await.is_empty());
}

#[test]
fn limits_replace_unusable_values_with_defaults() {
    let query = NearbyQuery {
        radius_km: Some(f64::NAN),
        limit: Some(0.0),
        max_fetch: Some(f64::INFINITY),
        ..NearbyQuery::new("hair-salon")
    };
    assert_eq!(
        SearchLimits::resolve(&query),
        SearchLimits {
            radius_km: DEFAULT_RADIUS_KM,
            limit: DEFAULT_LIMIT,
            max_fetch: DEFAULT_MAX_FETCH,
        }
    );
}

#[test]
fn limits_use_configured_defaults() {
    let defaults = NearbyDefaults {
        radius_km: 25.0,
        limit: 12,
        max_fetch: 100,
    };
    let query = NearbyQuery::new("hair-salon")
        .with_defaults(defaults)
        .with_limit(-1.0);
    let limits = SearchLimits::resolve(&query);
    assert_eq!(limits.limit, 12);
    assert_eq!(limits.max_fetch, 100);
    assert!((limits.radius_km - 25.0).abs() < f64::EPSILON);
}
