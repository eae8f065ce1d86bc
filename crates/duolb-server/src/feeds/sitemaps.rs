use axum::{extract::State, response::Response};
use chrono::{NaiveDate, Utc};
use duolb_core::seo::format_sitemap_lastmod;
use duolb_db::{CityCategoryPairRow, SlugStampRow};

use crate::api::AppState;

use super::{
    xml::{render_sitemap_index, render_urlset, UrlEntry},
    xml_response, FeedError, FEED_CACHE,
};

const WEEKLY: Option<&str> = Some("weekly");

/// Child sitemaps in the order the index lists them.
pub(super) const CHILD_SITEMAPS: [&str; 6] = [
    "sitemap-blog.xml",
    "sitemap-salons.xml",
    "sitemap-directory.xml",
    "sitemap-city-category.xml",
    "sitemap-cities.xml",
    "sitemap-categories.xml",
];

pub(super) fn index_locs(site_url: &str) -> Vec<String> {
    CHILD_SITEMAPS
        .iter()
        .map(|child| format!("{site_url}/{child}"))
        .collect()
}

fn stamped_entries(
    rows: &[SlugStampRow],
    loc: impl Fn(&str) -> String,
    priority: f32,
    today: NaiveDate,
) -> Vec<UrlEntry> {
    rows.iter()
        .map(|row| UrlEntry {
            loc: loc(&row.slug),
            lastmod: Some(format_sitemap_lastmod(row.lastmod.as_deref(), today)),
            changefreq: WEEKLY,
            priority,
        })
        .collect()
}

pub(super) fn salon_entries(site_url: &str, rows: &[SlugStampRow], today: NaiveDate) -> Vec<UrlEntry> {
    stamped_entries(rows, |slug| format!("{site_url}/salon/{slug}"), 0.8, today)
}

pub(super) fn city_entries(site_url: &str, rows: &[SlugStampRow], today: NaiveDate) -> Vec<UrlEntry> {
    stamped_entries(
        rows,
        |slug| format!("{site_url}/directory/city/{slug}"),
        0.9,
        today,
    )
}

pub(super) fn category_entries(
    site_url: &str,
    rows: &[SlugStampRow],
    today: NaiveDate,
) -> Vec<UrlEntry> {
    stamped_entries(
        rows,
        |slug| format!("{site_url}/directory/category/{slug}"),
        0.9,
        today,
    )
}

pub(super) fn post_entries(site_url: &str, rows: &[SlugStampRow], today: NaiveDate) -> Vec<UrlEntry> {
    stamped_entries(rows, |slug| format!("{site_url}/posts/{slug}"), 0.7, today)
}

/// City-category pages carry no `lastmod`.
pub(super) fn city_category_entries(site_url: &str, rows: &[CityCategoryPairRow]) -> Vec<UrlEntry> {
    rows.iter()
        .map(|row| UrlEntry {
            loc: format!(
                "{site_url}/directory/city/{}/{}",
                row.city_slug, row.category_slug
            ),
            lastmod: None,
            changefreq: WEEKLY,
            priority: 0.7,
        })
        .collect()
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub(super) async fn sitemap_index(State(state): State<AppState>) -> Result<Response, FeedError> {
    let body = render_sitemap_index(&index_locs(&state.site.site_url))?;
    Ok(xml_response(body, FEED_CACHE))
}

pub(super) async fn sitemap_salons(State(state): State<AppState>) -> Result<Response, FeedError> {
    let rows = duolb_db::list_salon_stamps(&state.pool).await?;
    let body = render_urlset(&salon_entries(&state.site.site_url, &rows, today()))?;
    Ok(xml_response(body, FEED_CACHE))
}

pub(super) async fn sitemap_cities(State(state): State<AppState>) -> Result<Response, FeedError> {
    let rows = duolb_db::list_city_stamps(&state.pool).await?;
    let body = render_urlset(&city_entries(&state.site.site_url, &rows, today()))?;
    Ok(xml_response(body, FEED_CACHE))
}

pub(super) async fn sitemap_categories(
    State(state): State<AppState>,
) -> Result<Response, FeedError> {
    let rows = duolb_db::list_category_stamps(&state.pool).await?;
    let body = render_urlset(&category_entries(&state.site.site_url, &rows, today()))?;
    Ok(xml_response(body, FEED_CACHE))
}

pub(super) async fn sitemap_city_category(
    State(state): State<AppState>,
) -> Result<Response, FeedError> {
    let rows = duolb_db::list_city_category_pairs(&state.pool).await?;
    let body = render_urlset(&city_category_entries(&state.site.site_url, &rows))?;
    Ok(xml_response(body, FEED_CACHE))
}

/// Cities, then categories, then salons.
pub(super) async fn sitemap_directory(
    State(state): State<AppState>,
) -> Result<Response, FeedError> {
    let site_url = &state.site.site_url;
    let today = today();

    let (cities, categories, salons) = tokio::try_join!(
        duolb_db::list_city_stamps(&state.pool),
        duolb_db::list_category_stamps(&state.pool),
        duolb_db::list_salon_stamps(&state.pool),
    )?;

    let mut entries = city_entries(site_url, &cities, today);
    entries.extend(category_entries(site_url, &categories, today));
    entries.extend(salon_entries(site_url, &salons, today));

    let body = render_urlset(&entries)?;
    Ok(xml_response(body, FEED_CACHE))
}

pub(super) async fn sitemap_blog(State(state): State<AppState>) -> Result<Response, FeedError> {
    let rows = duolb_db::list_post_stamps(&state.pool).await?;
    let body = render_urlset(&post_entries(&state.site.site_url, &rows, today()))?;
    Ok(xml_response(body, FEED_CACHE))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITE: &str = "https://duolb.com";

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    fn stamp(slug: &str, lastmod: Option<&str>) -> SlugStampRow {
        SlugStampRow {
            slug: slug.to_string(),
            lastmod: lastmod.map(ToOwned::to_owned),
        }
    }

    #[test]
    fn index_lists_children_in_order() {
        let locs = index_locs(SITE);
        assert_eq!(locs.len(), 6);
        assert_eq!(locs[0], "https://duolb.com/sitemap-blog.xml");
        assert_eq!(locs[1], "https://duolb.com/sitemap-salons.xml");
        assert_eq!(locs[5], "https://duolb.com/sitemap-categories.xml");
    }

    #[test]
    fn salon_entries_normalise_lastmod() {
        let entries = salon_entries(
            SITE,
            &[
                stamp("haarwerk", Some("2024-02-10 09:30:00.123+01")),
                stamp("nagelstudio", None),
            ],
            day(),
        );

        assert_eq!(entries[0].loc, "https://duolb.com/salon/haarwerk");
        assert_eq!(entries[0].lastmod.as_deref(), Some("2024-02-10"));
        assert!((entries[0].priority - 0.8).abs() < f32::EPSILON);
        assert_eq!(entries[1].lastmod.as_deref(), Some("2026-03-01"));
    }

    #[test]
    fn city_and_category_pages_rank_higher() {
        let cities = city_entries(SITE, &[stamp("berlin", None)], day());
        let categories = category_entries(SITE, &[stamp("friseur", None)], day());

        assert_eq!(cities[0].loc, "https://duolb.com/directory/city/berlin");
        assert_eq!(categories[0].loc, "https://duolb.com/directory/category/friseur");
        assert!((cities[0].priority - 0.9).abs() < f32::EPSILON);
        assert!((categories[0].priority - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn city_category_entries_have_no_lastmod() {
        let entries = city_category_entries(
            SITE,
            &[CityCategoryPairRow {
                city_slug: "berlin".to_string(),
                category_slug: "friseur".to_string(),
            }],
        );
        assert_eq!(entries[0].loc, "https://duolb.com/directory/city/berlin/friseur");
        assert_eq!(entries[0].lastmod, None);
    }

    #[test]
    fn posts_live_under_posts() {
        let entries = post_entries(SITE, &[stamp("pflege-tipps", Some("2025-01-02"))], day());
        assert_eq!(entries[0].loc, "https://duolb.com/posts/pflege-tipps");
        assert_eq!(entries[0].lastmod.as_deref(), Some("2025-01-02"));
    }
}
