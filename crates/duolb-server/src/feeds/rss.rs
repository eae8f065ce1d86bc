use axum::{
    extract::{Path, State},
    response::Response,
};
use chrono::{DateTime, Utc};
use duolb_db::{CityCategoryCountRow, FeedSalonRow, NamedSlugRow, PostRow};

use crate::api::AppState;

use super::{
    xml::{render_rss, RssChannel, RssItem},
    xml_response, FeedError, CATEGORY_FEED_CACHE, FEED_CACHE,
};

const CITY_FEED_LIMIT: i64 = 200;
const CITY_CATEGORY_FEED_LIMIT: i64 = 500;
const DIRECTORY_FEED_LIMIT: i64 = 100;
const CATEGORY_FEED_LIMIT: i64 = 50;

fn directory_link(site_url: &str) -> String {
    format!("{site_url}/directory")
}

fn salon_title(row: &FeedSalonRow) -> String {
    row.salon_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or("Salon")
        .to_owned()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub(super) fn category_items(site_url: &str, rows: &[NamedSlugRow], now: DateTime<Utc>) -> Vec<RssItem> {
    rows.iter()
        .map(|row| RssItem {
            title: row.name.clone(),
            link: format!("{site_url}/directory/category/{}", row.slug),
            description: format!("Find the best {} salons in Germany", row.name),
            pub_date: now,
        })
        .collect()
}

pub(super) fn city_items(site_url: &str, rows: &[NamedSlugRow], now: DateTime<Utc>) -> Vec<RssItem> {
    rows.iter()
        .map(|row| RssItem {
            title: row.name.clone(),
            link: format!("{site_url}/directory/city/{}", row.slug),
            description: format!("Beauty & Wellness Salons in {}, Germany", row.name),
            pub_date: now,
        })
        .collect()
}

pub(super) fn city_category_items(
    site_url: &str,
    rows: &[CityCategoryCountRow],
    now: DateTime<Utc>,
) -> Vec<RssItem> {
    rows.iter()
        .map(|row| RssItem {
            title: format!("{} in {}", row.category_name, row.city_name),
            link: format!(
                "{site_url}/directory/city/{}/{}",
                row.city_slug, row.category_slug
            ),
            description: format!(
                "Find the best {} salons in {}, Germany. Compare ratings, services and locations.",
                row.category_name, row.city_name
            ),
            pub_date: now,
        })
        .collect()
}

pub(super) fn directory_items(site_url: &str, rows: &[FeedSalonRow]) -> Vec<RssItem> {
    rows.iter()
        .map(|row| RssItem {
            title: salon_title(row),
            link: format!("{site_url}/salon/{}", row.slug),
            description: match non_blank(row.full_address.as_deref()) {
                Some(address) => format!("{address} - Beauty & Wellness Salon in Germany"),
                None => "Beauty & Wellness Salon in Germany".to_owned(),
            },
            pub_date: row.published_at,
        })
        .collect()
}

pub(super) fn category_feed_items(site_url: &str, rows: &[FeedSalonRow]) -> Vec<RssItem> {
    rows.iter()
        .map(|row| RssItem {
            title: salon_title(row),
            link: format!("{site_url}/salon/{}", row.slug),
            description: non_blank(row.city_slug.as_deref())
                .or_else(|| non_blank(row.description.as_deref()))
                .unwrap_or("Beauty salon listing")
                .to_owned(),
            pub_date: row.published_at,
        })
        .collect()
}

pub(super) fn post_items(site_url: &str, rows: &[PostRow]) -> Vec<RssItem> {
    rows.iter()
        .map(|row| RssItem {
            title: row.title.clone(),
            link: format!("{site_url}/posts/{}", row.slug),
            description: row.description.clone().unwrap_or_default(),
            pub_date: row.created_at,
        })
        .collect()
}

/// Lowercased, trimmed category slug from the feed path.
pub(super) fn normalize_category(raw: &str) -> Option<String> {
    let category = raw.trim().to_lowercase();
    (!category.is_empty()).then_some(category)
}

pub(super) async fn rss_categories(State(state): State<AppState>) -> Result<Response, FeedError> {
    let site_url = &state.site.site_url;
    let rows = duolb_db::list_categories_with_salons(&state.pool).await?;
    let link = directory_link(site_url);
    let body = render_rss(
        &RssChannel {
            title: "Duolb Beauty Categories",
            link: &link,
            description: "Explore beauty and wellness services by category across Germany.",
        },
        &category_items(site_url, &rows, Utc::now()),
    )?;
    Ok(xml_response(body, FEED_CACHE))
}

pub(super) async fn rss_cities(State(state): State<AppState>) -> Result<Response, FeedError> {
    let site_url = &state.site.site_url;
    let rows = duolb_db::list_cities_with_salons(&state.pool, CITY_FEED_LIMIT).await?;
    let link = directory_link(site_url);
    let body = render_rss(
        &RssChannel {
            title: "Duolb Cities – Beauty Directory",
            link: &link,
            description: "Browse beauty and wellness salons by city across Germany.",
        },
        &city_items(site_url, &rows, Utc::now()),
    )?;
    Ok(xml_response(body, FEED_CACHE))
}

pub(super) async fn rss_city_category(
    State(state): State<AppState>,
) -> Result<Response, FeedError> {
    let site_url = &state.site.site_url;
    let rows = duolb_db::list_city_category_counts(&state.pool, CITY_CATEGORY_FEED_LIMIT).await?;
    let link = directory_link(site_url);
    let body = render_rss(
        &RssChannel {
            title: "Duolb City & Category Beauty Listings",
            link: &link,
            description: "Browse beauty and wellness services by city and category across Germany.",
        },
        &city_category_items(site_url, &rows, Utc::now()),
    )?;
    Ok(xml_response(body, FEED_CACHE))
}

pub(super) async fn rss_directory(State(state): State<AppState>) -> Result<Response, FeedError> {
    let site_url = &state.site.site_url;
    let rows = duolb_db::list_newest_salons(&state.pool, DIRECTORY_FEED_LIMIT).await?;
    let link = directory_link(site_url);
    let body = render_rss(
        &RssChannel {
            title: "Duolb Beauty & Wellness Salons",
            link: &link,
            description: "Latest beauty and wellness salons across Germany.",
        },
        &directory_items(site_url, &rows),
    )?;
    Ok(xml_response(body, FEED_CACHE))
}

pub(super) async fn category_feed(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Response, FeedError> {
    let category = normalize_category(&category).ok_or(FeedError::MissingCategory)?;
    let site_url = &state.site.site_url;
    let rows =
        duolb_db::list_category_feed_salons(&state.pool, &category, CATEGORY_FEED_LIMIT).await?;

    let title = format!("Salons in {category}");
    let description = format!("Newest salons in the {category} category.");
    let link = directory_link(site_url);
    let body = render_rss(
        &RssChannel {
            title: &title,
            link: &link,
            description: &description,
        },
        &category_feed_items(site_url, &rows),
    )?;
    Ok(xml_response(body, CATEGORY_FEED_CACHE))
}

pub(super) async fn rss_blog(State(state): State<AppState>) -> Result<Response, FeedError> {
    let site_url = &state.site.site_url;
    let rows = duolb_db::list_posts(&state.pool).await?;
    let body = render_rss(
        &RssChannel {
            title: "duolb – Beauty Blog",
            link: site_url,
            description: "Beauty, Hautpflege, Trends und ehrliche Produktempfehlungen.",
        },
        &post_items(site_url, &rows),
    )?;
    Ok(xml_response(body, FEED_CACHE))
}
