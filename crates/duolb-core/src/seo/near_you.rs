use serde::Serialize;

pub const DEFAULT_NEAR_YOU_RADIUS_KM: f64 = 25.0;

const DEFAULT_CATEGORY_NAME: &str = "Salons";

/// Copy for the "near you" landing page of a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NearYouSeo {
    pub title: String,
    pub description: String,
    pub h1: String,
}

#[must_use]
pub fn build_near_you_seo(category_name: &str, radius_km: Option<f64>) -> NearYouSeo {
    let name = match category_name.trim() {
        "" => DEFAULT_CATEGORY_NAME,
        trimmed => trimmed,
    };
    // Whole radii print without a decimal point.
    let radius = radius_km
        .filter(|r| r.is_finite() && *r > 0.0)
        .unwrap_or(DEFAULT_NEAR_YOU_RADIUS_KM)
        .to_string();
    let lower = name.to_lowercase();

    NearYouSeo {
        title: format!(
            "{name} in deiner Nähe - Top Anbieter im Umkreis von {radius} km in Deutschland"
        ),
        description: format!(
            "Finde die besten {lower} in deiner Nähe. Vergleiche Bewertungen, Leistungen und \
             Standorte von geprüften Anbietern in Deutschland im Umkreis von {radius} km."
        ),
        h1: format!("{name} in deiner Nähe"),
    }
}
