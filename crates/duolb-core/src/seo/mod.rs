//! Search-engine facing text: page titles, meta descriptions, landing copy
//! and sitemap dates.

mod lastmod;
mod meta_description;
mod near_you;
mod title;

use std::sync::LazyLock;

use regex::Regex;

pub use lastmod::format_sitemap_lastmod;
pub use meta_description::{resolve_meta_description, MetaDescriptionInput};
pub use near_you::{build_near_you_seo, NearYouSeo, DEFAULT_NEAR_YOU_RADIUS_KM};
pub use title::{resolve_template_title, TitleInput};

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid html tag regex"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_]+").expect("valid separator regex"));
static NOINDEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bnoindex\b").expect("valid noindex regex"));
static CITY_CATEGORY_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/directory/city/([^/]+)/([^/]+)/?$").expect("valid city category regex")
});
static CATEGORY_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/directory/category/([^/]+)/?$").expect("valid category regex")
});
static SALON_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/salon/([^/]+)/?$").expect("valid salon regex"));
/// `"<name> in <city>"`, splitting on the last ` in `.
static NAME_IN_CITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(.*)\sin\s(.+)$").expect("valid name-in-city regex"));

/// Directory routes that get templated titles and descriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoutePage<'a> {
    CityCategory { city: &'a str, category: &'a str },
    Category { category: &'a str },
    Salon { slug: &'a str },
}

impl<'a> RoutePage<'a> {
    fn parse(pathname: &'a str) -> Option<Self> {
        if let Some(caps) = CITY_CATEGORY_PATH.captures(pathname) {
            return Some(Self::CityCategory {
                city: caps.get(1)?.as_str(),
                category: caps.get(2)?.as_str(),
            });
        }
        if let Some(caps) = CATEGORY_PATH.captures(pathname) {
            return Some(Self::Category {
                category: caps.get(1)?.as_str(),
            });
        }
        let caps = SALON_PATH.captures(pathname)?;
        Some(Self::Salon {
            slug: caps.get(1)?.as_str(),
        })
    }
}

/// Strip HTML tags and collapse whitespace runs.
fn normalize_whitespace(value: &str) -> String {
    let without_tags = HTML_TAG.replace_all(value, " ");
    WHITESPACE.replace_all(&without_tags, " ").trim().to_string()
}

fn is_noindex(robots: Option<&str>) -> bool {
    robots.is_some_and(|r| NOINDEX.is_match(r))
}

/// Percent-decoded slug with `-`/`_` runs turned into single spaces.
///
/// Undecodable input is used as-is.
fn slug_to_label(slug: &str) -> String {
    let decoded = percent_encoding::percent_decode_str(slug)
        .decode_utf8()
        .map_or_else(|_| slug.to_string(), |s| s.into_owned());
    let spaced = SEPARATORS.replace_all(&decoded, " ");
    WHITESPACE.replace_all(&spaced, " ").trim().to_string()
}

/// Split `"<name> in <city>"`. Either side may come back empty.
fn split_name_in_city(value: &str) -> Option<(&str, &str)> {
    let caps = NAME_IN_CITY.captures(value)?;
    Some((caps.get(1)?.as_str().trim(), caps.get(2)?.as_str().trim()))
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}
