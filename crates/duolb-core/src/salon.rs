//! Salon listing records as seen by search and the API layer.

use serde::Serialize;

use crate::geo::Coordinate;

pub const SALON_COVER_PLACEHOLDER: &str = "https://res.cloudinary.com/daxbch3om/image/upload/v1770339624/7b93947b-000b-4572-beb1-fbcd14924b7b_1_lo30fm.png";

/// Aggregate review score for a salon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rating {
    pub value: f64,
    pub count: i64,
}

impl Rating {
    /// A rating exists only when the value column is set; a missing count
    /// alongside a value is read as zero reviews.
    #[must_use]
    pub fn from_parts(value: Option<f64>, count: Option<i64>) -> Option<Self> {
        value.map(|value| Self {
            value,
            count: count.unwrap_or(0),
        })
    }
}

/// A business listing, owned by the datastore and copied per request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Salon {
    pub id: i64,
    pub name: Option<String>,
    pub slug: String,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub full_address: Option<String>,
    pub city_slug: Option<String>,
    pub category_slug: Option<String>,
    /// `None` when either coordinate column is null. A present coordinate may
    /// still be out of range; distance computation rejects it.
    pub coordinate: Option<Coordinate>,
    pub rating: Option<Rating>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub booking_url: Option<String>,
}

/// A salon annotated with its distance from the searcher.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbySalon {
    #[serde(flatten)]
    pub salon: Salon,
    pub distance_km: f64,
}

/// Cover image URL, or the shared placeholder when the salon has none.
#[must_use]
pub fn resolve_salon_cover_image(value: Option<&str>) -> &str {
    match value {
        Some(url) if !url.trim().is_empty() => url,
        _ => SALON_COVER_PLACEHOLDER,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_requires_value() {
        assert_eq!(Rating::from_parts(None, Some(12)), None);
        assert_eq!(
            Rating::from_parts(Some(4.5), None),
            Some(Rating {
                value: 4.5,
                count: 0
            })
        );
    }

    #[test]
    fn cover_image_falls_back_to_placeholder() {
        assert_eq!(resolve_salon_cover_image(None), SALON_COVER_PLACEHOLDER);
        assert_eq!(resolve_salon_cover_image(Some("  ")), SALON_COVER_PLACEHOLDER);
        assert_eq!(
            resolve_salon_cover_image(Some("https://cdn.example.com/a.png")),
            "https://cdn.example.com/a.png"
        );
    }

    #[test]
    fn nearby_salon_serializes_flat() {
        let item = NearbySalon {
            salon: Salon {
                id: 7,
                name: Some("Haarwerk".to_string()),
                slug: "haarwerk-berlin".to_string(),
                description: None,
                cover_image: None,
                full_address: None,
                city_slug: Some("berlin".to_string()),
                category_slug: Some("hair-salon".to_string()),
                coordinate: Some(Coordinate::new(52.5, 13.4)),
                rating: None,
                phone: None,
                website: None,
                booking_url: None,
            },
            distance_km: 1.25,
        };
        let json = serde_json::to_value(&item).expect("serialize");
        assert_eq!(json["slug"], "haarwerk-berlin");
        assert_eq!(json["distance_km"], 1.25);
        assert_eq!(json["coordinate"]["latitude"], 52.5);
    }
}
