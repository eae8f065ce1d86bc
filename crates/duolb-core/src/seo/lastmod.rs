use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

static DATE_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date regex"));
static DATE_TIME_UTC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\+00:00$").expect("valid datetime regex")
});
static FRACTION_BEFORE_OFFSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.\d+(Z|[+-]\d{2}(?::?\d{2})?)$").expect("valid fraction regex")
});
static COMPACT_OFFSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([+-]\d{2})(\d{2})$").expect("valid offset regex"));
static HOUR_OFFSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([+-]\d{2})$").expect("valid hour offset regex"));

/// Normalise a timestamp for a sitemap `<lastmod>`.
///
/// `YYYY-MM-DD` and `YYYY-MM-DDTHH:MM:SS+00:00` pass through unchanged.
/// Anything else parseable, including Postgres' text form
/// (`2024-03-01 10:20:30.123456+00`), is reduced to its UTC date. Blank or
/// unparseable input yields `today`.
#[must_use]
pub fn format_sitemap_lastmod(input: Option<&str>, today: NaiveDate) -> String {
    let fallback = || today.format("%Y-%m-%d").to_string();

    let Some(value) = input.map(str::trim).filter(|v| !v.is_empty()) else {
        return fallback();
    };
    if DATE_ONLY.is_match(value) || DATE_TIME_UTC.is_match(value) {
        return value.to_string();
    }

    let normalized = value.replacen(' ', "T", 1);
    let normalized = FRACTION_BEFORE_OFFSET.replace(&normalized, "$1");
    let normalized = COMPACT_OFFSET.replace(&normalized, "$1:$2");
    let normalized = HOUR_OFFSET.replace(&normalized, "$1:00");

    parse_utc(&normalized).map_or_else(fallback, |dt| dt.format("%Y-%m-%d").to_string())
}

fn parse_utc(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    // No offset: read as UTC.
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).expect("valid date")
    }

    #[test]
    fn missing_or_blank_uses_today() {
        assert_eq!(format_sitemap_lastmod(None, today()), "2026-10-17");
        assert_eq!(format_sitemap_lastmod(Some("   "), today()), "2026-10-17");
    }

    #[test]
    fn canonical_forms_pass_through() {
        assert_eq!(
            format_sitemap_lastmod(Some("2024-02-29"), today()),
            "2024-02-29"
        );
        assert_eq!(
            format_sitemap_lastmod(Some("2024-02-29T08:15:00+00:00"), today()),
            "2024-02-29T08:15:00+00:00"
        );
    }

    #[test]
    fn postgres_text_timestamp_is_reduced_to_date() {
        assert_eq!(
            format_sitemap_lastmod(Some("2024-03-01 10:20:30.123456+00"), today()),
            "2024-03-01"
        );
    }

    #[test]
    fn offsets_are_converted_to_utc() {
        assert_eq!(
            format_sitemap_lastmod(Some("2024-03-01T00:30:00+0200"), today()),
            "2024-02-29"
        );
        assert_eq!(
            format_sitemap_lastmod(Some("2024-03-01T23:30:00.5-05:00"), today()),
            "2024-03-02"
        );
    }

    #[test]
    fn zulu_timestamps_are_accepted() {
        assert_eq!(
            format_sitemap_lastmod(Some("2024-03-01T10:00:00.999Z"), today()),
            "2024-03-01"
        );
    }

    #[test]
    fn garbage_uses_today() {
        assert_eq!(
            format_sitemap_lastmod(Some("yesterday-ish"), today()),
            "2026-10-17"
        );
    }
}
