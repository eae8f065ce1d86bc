//! Crawler-facing documents: XML sitemaps, RSS feeds and `robots.txt`.

mod rss;
mod sitemaps;
mod xml;

use axum::{
    extract::State,
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE},
        StatusCode,
    },
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use duolb_db::DbError;

use crate::api::AppState;

pub(crate) const FEED_CACHE: &str = "public, max-age=0, s-maxage=3600, stale-while-revalidate=86400";
pub(crate) const CATEGORY_FEED_CACHE: &str =
    "public, max-age=0, s-maxage=1800, stale-while-revalidate=86400";

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("category is required")]
    MissingCategory,
    #[error("database error: {0}")]
    Db(#[from] DbError),
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl IntoResponse for FeedError {
    fn into_response(self) -> Response {
        match self {
            Self::MissingCategory => (StatusCode::BAD_REQUEST, "Category is required").into_response(),
            Self::Db(_) | Self::Xml(_) => {
                tracing::error!(error = %self, "feed generation failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Error generating feed").into_response()
            }
        }
    }
}

fn xml_response(body: Vec<u8>, cache_control: &'static str) -> Response {
    (
        [(CONTENT_TYPE, "application/xml"), (CACHE_CONTROL, cache_control)],
        body,
    )
        .into_response()
}

pub(crate) fn robots_body(site_url: &str) -> String {
    format!("User-agent: *\nAllow: /\nSitemap: {site_url}/sitemap.xml\n")
}

async fn robots(State(state): State<AppState>) -> Response {
    (
        [(CONTENT_TYPE, "text/plain; charset=utf-8")],
        robots_body(&state.site.site_url),
    )
        .into_response()
}

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/robots.txt", get(robots))
        .route("/sitemap.xml", get(sitemaps::sitemap_index))
        .route("/sitemap-salons.xml", get(sitemaps::sitemap_salons))
        .route("/sitemap-cities.xml", get(sitemaps::sitemap_cities))
        .route("/sitemap-categories.xml", get(sitemaps::sitemap_categories))
        .route(
            "/sitemap-city-category.xml",
            get(sitemaps::sitemap_city_category),
        )
        .route("/sitemap-directory.xml", get(sitemaps::sitemap_directory))
        .route("/sitemap-blog.xml", get(sitemaps::sitemap_blog))
        .route("/rss-categories.xml", get(rss::rss_categories))
        .route("/rss-cities.xml", get(rss::rss_cities))
        .route("/rss-city-category.xml", get(rss::rss_city_category))
        .route("/rss-directory.xml", get(rss::rss_directory))
        .route(
            "/directory/category/{category}/feed.xml",
            get(rss::category_feed),
        )
        .route("/rss.xml", get(rss::rss_blog))
}
