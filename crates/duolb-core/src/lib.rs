pub mod app_config;
pub mod config;
pub mod geo;
pub mod nearby;
pub mod salon;
pub mod seo;
pub mod tracking;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use geo::{distance_between, distance_km, Coordinate, EARTH_RADIUS_KM};
pub use nearby::{
    search_nearby, NearbyDefaults, NearbyQuery, SalonFilter, SalonOrder, SalonSource,
    SearchLimits,
};
pub use salon::{resolve_salon_cover_image, NearbySalon, Rating, Salon, SALON_COVER_PLACEHOLDER};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
