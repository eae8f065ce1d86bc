use super::{char_len, is_noindex, slug_to_label, split_name_in_city, RoutePage, WHITESPACE};

const MAX_TITLE_LENGTH: usize = 60;

#[derive(Debug, Clone, Copy, Default)]
pub struct TitleInput<'a> {
    pub title: Option<&'a str>,
    pub pathname: Option<&'a str>,
    pub robots: Option<&'a str>,
}

/// Rewrite the `<title>` of directory pages to a templated, length-capped form.
///
/// Non-directory routes, `noindex` pages and requests without a pathname keep
/// the given title.
#[must_use]
pub fn resolve_template_title(input: TitleInput<'_>) -> String {
    let title = input.title.unwrap_or_default();
    let Some(pathname) = input.pathname else {
        return title.to_string();
    };
    if is_noindex(input.robots) {
        return title.to_string();
    }

    match RoutePage::parse(pathname) {
        Some(RoutePage::CityCategory { city, category }) => fit_with_fallback(
            &format!("{} in {}", title_case(category), title_case(city)),
            " | Studios & Bewertungen",
        ),
        Some(RoutePage::Category { category }) => fit_with_fallback(
            &format!("{} Studios", title_case(category)),
            " | Bewertungen & Infos",
        ),
        Some(RoutePage::Salon { slug }) => {
            let cleaned = WHITESPACE.replace_all(title, " ");
            let left = cleaned
                .trim()
                .split('|')
                .next()
                .unwrap_or_default()
                .split('–')
                .next()
                .unwrap_or_default()
                .trim();
            let (name, city) = split_name_in_city(left).unwrap_or_default();
            let name = if name.is_empty() {
                title_case(slug)
            } else {
                name.to_string()
            };
            let city = if city.is_empty() { "Deutschland" } else { city };
            fit_with_fallback(&format!("{name} in {city}"), " | Salon Infos")
        }
        None => title.to_string(),
    }
}

/// Slug label with the first letter of each word upper-cased.
fn title_case(slug: &str) -> String {
    slug_to_label(slug)
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn fit_with_fallback(base: &str, suffix: &str) -> String {
    let full = format!("{base}{suffix}");
    if char_len(&full) <= MAX_TITLE_LENGTH {
        return full;
    }
    if char_len(base) <= MAX_TITLE_LENGTH {
        return base.to_string();
    }
    shorten_by_words(base, MAX_TITLE_LENGTH)
}

/// Drop trailing words until the text fits; a single word is kept whole.
fn shorten_by_words(value: &str, max_len: usize) -> String {
    let mut words: Vec<&str> = value.split_whitespace().collect();
    while words.len() > 1 && char_len(&words.join(" ")) > max_len {
        words.pop();
    }
    words.join(" ")
}
