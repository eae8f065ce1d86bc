use crate::app_config::{AppConfig, Environment};
use crate::nearby::NearbyDefaults;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it from a
/// `HashMap` without touching `set_var`/`remove_var`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let positive_f64 = |var: &str, default: &str| -> Result<f64, ConfigError> {
        let value: f64 = parse_as(var, &or_default(var, default))?;
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("must be a positive number, got {value}"),
            })
        }
    };

    let positive_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value: usize = parse_as(var, &or_default(var, default))?;
        if value == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(value)
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("DUOLB_ENV", "development"))?;

    let bind_addr: SocketAddr =
        parse_as("DUOLB_BIND_ADDR", &or_default("DUOLB_BIND_ADDR", "0.0.0.0:3000"))?;
    let log_level = or_default("DUOLB_LOG_LEVEL", "info");
    let site_url = or_default("DUOLB_SITE_URL", "https://duolb.com")
        .trim()
        .trim_end_matches('/')
        .to_string();
    if site_url.is_empty() {
        return Err(ConfigError::InvalidEnvVar {
            var: "DUOLB_SITE_URL".to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    let owner_secret = lookup("DUOLB_OWNER_SECRET")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let db_max_connections: u32 = parse_as(
        "DUOLB_DB_MAX_CONNECTIONS",
        &or_default("DUOLB_DB_MAX_CONNECTIONS", "10"),
    )?;
    let db_min_connections: u32 = parse_as(
        "DUOLB_DB_MIN_CONNECTIONS",
        &or_default("DUOLB_DB_MIN_CONNECTIONS", "1"),
    )?;
    let db_acquire_timeout_secs: u64 = parse_as(
        "DUOLB_DB_ACQUIRE_TIMEOUT_SECS",
        &or_default("DUOLB_DB_ACQUIRE_TIMEOUT_SECS", "10"),
    )?;

    let nearby = NearbyDefaults {
        radius_km: positive_f64("DUOLB_NEARBY_RADIUS_KM", "15")?,
        limit: positive_usize("DUOLB_NEARBY_LIMIT", "24")?,
        max_fetch: positive_usize("DUOLB_NEARBY_MAX_FETCH", "500")?,
    };

    let track_rate_limit_max = positive_usize("DUOLB_TRACK_RATE_LIMIT_MAX", "100")?;
    let track_rate_limit_window_secs: u64 = parse_as(
        "DUOLB_TRACK_RATE_LIMIT_WINDOW_SECS",
        &or_default("DUOLB_TRACK_RATE_LIMIT_WINDOW_SECS", "60"),
    )?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        site_url,
        owner_secret,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        nearby,
        track_rate_limit_max,
        track_rate_limit_window_secs,
    })
}

fn parse_as<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s.trim() {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "DUOLB_ENV".to_string(),
            reason: format!("expected development, test or production, got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
