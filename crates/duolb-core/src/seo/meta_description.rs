use std::sync::LazyLock;

use regex::Regex;

use super::{
    char_len, is_noindex, normalize_whitespace, slug_to_label, split_name_in_city, RoutePage,
};

const MAX_DESCRIPTION_LENGTH: usize = 155;
const DEFAULT_TOPIC: &str = "Beauty und Wellness in Deutschland";

static BRAND_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*[-|]\s*duolb.*$").expect("valid brand suffix regex"));

#[derive(Debug, Clone, Copy, Default)]
pub struct MetaDescriptionInput<'a> {
    pub description: Option<&'a str>,
    pub title: Option<&'a str>,
    pub pathname: Option<&'a str>,
    pub robots: Option<&'a str>,
}

/// Pick the meta description for a page.
///
/// A clean description that fits is used as-is. Otherwise directory routes
/// get a templated sentence, then the first fitting sentence of the
/// description is tried, and finally a sentence derived from the title.
/// `noindex` pages keep whatever description they have.
#[must_use]
pub fn resolve_meta_description(input: MetaDescriptionInput<'_>) -> String {
    let raw = normalize_whitespace(input.description.unwrap_or_default());

    if is_noindex(input.robots) {
        return raw;
    }

    if !raw.is_empty() && char_len(&raw) <= MAX_DESCRIPTION_LENGTH {
        return raw;
    }

    if let Some(templated) = input
        .pathname
        .and_then(RoutePage::parse)
        .map(|page| from_route(page, input.title))
    {
        return templated;
    }

    if raw.is_empty() {
        return fallback_from_title(input.title);
    }

    split_sentences(&raw)
        .into_iter()
        .find(|s| char_len(s) <= MAX_DESCRIPTION_LENGTH)
        .map_or_else(|| fallback_from_title(input.title), str::to_string)
}

/// First variant within budget, else the last (shortest) one.
fn select_variant(variants: Vec<String>) -> String {
    let mut fallback = String::new();
    for v in variants {
        if char_len(&v) <= MAX_DESCRIPTION_LENGTH {
            return v;
        }
        fallback = v;
    }
    fallback
}

fn fallback_from_title(title: Option<&str>) -> String {
    let cleaned = normalize_whitespace(title.unwrap_or_default());
    let base = BRAND_SUFFIX.replace(&cleaned, "");
    let base = base.trim();
    let topic = if base.is_empty() { DEFAULT_TOPIC } else { base };

    select_variant(vec![
        format!("{topic}. Bewertungen, Fotos und Kontaktdaten auf duolb.com."),
        format!("{topic} auf duolb.com."),
    ])
}

fn from_route(page: RoutePage<'_>, title: Option<&str>) -> String {
    match page {
        RoutePage::CityCategory { city, category } => {
            let city = slug_to_label(city);
            let category = slug_to_label(category);
            select_variant(vec![
                format!("Finde {category} Studios in {city}. Vergleiche Bewertungen, Fotos und Kontaktdaten auf duolb.com."),
                format!("{category} Studios in {city} mit Bewertungen und Kontaktdaten auf duolb.com."),
                format!("{category} Studios in {city} auf duolb.com."),
            ])
        }
        RoutePage::Category { category } => {
            let category = slug_to_label(category);
            select_variant(vec![
                format!("Entdecke gepruefte {category} Studios. Bewertungen, Fotos und direkte Kontaktdaten auf duolb.com."),
                format!("Entdecke {category} Studios mit Bewertungen, Fotos und Kontaktdaten auf duolb.com."),
                format!("{category} Studios mit Bewertungen und Kontaktdaten auf duolb.com."),
            ])
        }
        RoutePage::Salon { slug } => {
            let cleaned = normalize_whitespace(title.unwrap_or_default());
            let head = cleaned.split('–').next().unwrap_or_default().trim();
            let (name, city) = split_name_in_city(head).unwrap_or_default();
            let name = if name.is_empty() {
                slug_to_label(slug)
            } else {
                name.to_string()
            };
            let city = if city.is_empty() { "Deutschland" } else { city };

            select_variant(vec![
                format!("{name} in {city}. Infos, Bewertungen, Fotos und Kontakt auf duolb.com."),
                format!("{name} in {city}. Infos und Kontakt auf duolb.com."),
                format!("{name} auf duolb.com."),
            ])
        }
    }
}

/// Split after `.`, `!` or `?` followed by whitespace.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut prev_terminal = false;
    let mut in_gap = false;

    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if prev_terminal && !in_gap {
                sentences.push(text[start..i].trim());
                in_gap = true;
            }
            if !in_gap {
                prev_terminal = false;
            }
            continue;
        }
        if in_gap {
            start = i;
            in_gap = false;
        }
        prev_terminal = matches!(c, '.' | '!' | '?');
    }
    if !in_gap {
        sentences.push(text[start..].trim());
    }
    sentences.into_iter().filter(|s| !s.is_empty()).collect()
}
