//! Allow-listed proxy for salon images held in Supabase storage.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{
        header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE, ETAG, LAST_MODIFIED, VARY},
        HeaderName, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};
use reqwest::Url;
use serde::Deserialize;

use super::AppState;

const IMAGE_ACCEPT: &str = "image/avif,image/webp,image/apng,image/*,*/*;q=0.8";
const IMMUTABLE_CACHE: &str = "public, max-age=31536000, immutable";
const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";
const ALLOWED_HOST_SUFFIX: &str = ".supabase.co";
const STORAGE_PATH: &str = "/storage/v1/";

const CDN_CACHE_CONTROL: &str = "cdn-cache-control";

#[derive(Debug, Deserialize)]
pub(super) struct ImageParams {
    src: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub(super) enum ImageProxyError {
    #[error("Missing src")]
    MissingSource,
    #[error("Invalid src URL")]
    InvalidSource,
    #[error("Source not allowed")]
    SourceNotAllowed,
    #[error("Image fetch failed")]
    Upstream(StatusCode),
    #[error("Image proxy error")]
    Fetch(#[from] reqwest::Error),
}

impl ImageProxyError {
    fn status(&self) -> StatusCode {
        match self {
            Self::MissingSource | Self::InvalidSource => StatusCode::BAD_REQUEST,
            Self::SourceNotAllowed => StatusCode::FORBIDDEN,
            Self::Upstream(status) => *status,
            Self::Fetch(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ImageProxyError {
    fn into_response(self) -> Response {
        match &self {
            Self::Fetch(e) => tracing::warn!(error = %e, "image proxy fetch failed"),
            Self::Upstream(status) => tracing::debug!(%status, "image upstream refused"),
            _ => {}
        }
        (self.status(), self.to_string()).into_response()
    }
}

/// Upstream URL from the `src` parameter, if it points into Supabase storage.
pub(super) fn parse_source(src: Option<&str>) -> Result<Url, ImageProxyError> {
    let src = src
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ImageProxyError::MissingSource)?;
    let url = Url::parse(src).map_err(|_| ImageProxyError::InvalidSource)?;
    if !is_allowed_source(&url) {
        return Err(ImageProxyError::SourceNotAllowed);
    }
    Ok(url)
}

fn is_allowed_source(url: &Url) -> bool {
    url.host_str()
        .is_some_and(|host| host.ends_with(ALLOWED_HOST_SUFFIX))
        && url.path().contains(STORAGE_PATH)
}

/// Fetch `url` and stream it back with long-lived cache headers.
pub(super) async fn fetch_image(
    client: &reqwest::Client,
    url: Url,
) -> Result<Response, ImageProxyError> {
    let upstream = client.get(url).header(ACCEPT, IMAGE_ACCEPT).send().await?;
    let status = upstream.status();
    if !status.is_success() {
        return Err(ImageProxyError::Upstream(status));
    }

    let headers = upstream.headers();
    let content_type = headers
        .get(CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    let etag = headers.get(ETAG).cloned();
    let last_modified = headers.get(LAST_MODIFIED).cloned();

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    let out = response.headers_mut();
    out.insert(CONTENT_TYPE, content_type);
    out.insert(CACHE_CONTROL, HeaderValue::from_static(IMMUTABLE_CACHE));
    out.insert(
        HeaderName::from_static(CDN_CACHE_CONTROL),
        HeaderValue::from_static(IMMUTABLE_CACHE),
    );
    out.insert(VARY, HeaderValue::from_static("Accept"));
    if let Some(etag) = etag {
        out.insert(ETAG, etag);
    }
    if let Some(last_modified) = last_modified {
        out.insert(LAST_MODIFIED, last_modified);
    }
    Ok(response)
}

/// GET /api/v1/image: proxy a stored salon image.
pub(super) async fn proxy_image(
    State(state): State<AppState>,
    Query(params): Query<ImageParams>,
) -> Result<Response, ImageProxyError> {
    let url = parse_source(params.src.as_deref())?;
    fetch_image(&state.http, url).await
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const STORED: &str =
        "https://abcd.supabase.co/storage/v1/object/public/salons/haarwerk.webp";

    fn status_of(src: Option<&str>) -> Option<StatusCode> {
        parse_source(src).err().map(|e| e.status())
    }

    #[test]
    fn storage_urls_on_supabase_are_allowed() {
        let url = parse_source(Some(STORED)).expect("allowed");
        assert_eq!(url.host_str(), Some("abcd.supabase.co"));
        assert!(parse_source(Some("https://ABCD.Supabase.co/storage/v1/x.png")).is_ok());
    }

    #[test]
    fn missing_or_invalid_sources_are_bad_requests() {
        assert_eq!(status_of(None), Some(StatusCode::BAD_REQUEST));
        assert_eq!(status_of(Some("  ")), Some(StatusCode::BAD_REQUEST));
        assert_eq!(status_of(Some("/storage/v1/x.png")), Some(StatusCode::BAD_REQUEST));
        assert_eq!(status_of(Some("not a url")), Some(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn foreign_hosts_and_paths_are_forbidden() {
        let cases = [
            "https://example.com/storage/v1/x.png",
            "https://supabase.co.evil.com/storage/v1/x.png",
            "https://abcd.supabase.co/auth/v1/user",
            "https://abcd.supabase.co/x.png?p=/storage/v1/",
        ];
        for src in cases {
            assert_eq!(status_of(Some(src)), Some(StatusCode::FORBIDDEN), "src {src}");
        }
    }

    #[test]
    fn error_statuses_map_as_documented() {
        assert_eq!(
            ImageProxyError::Upstream(StatusCode::NOT_FOUND).status(),
            StatusCode::NOT_FOUND
        );
        let response = ImageProxyError::SourceNotAllowed.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn successful_fetch_streams_body_with_cache_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/object/public/a.webp"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/webp")
                    .insert_header("etag", "\"v1\"")
                    .insert_header("last-modified", "Tue, 03 Mar 2026 10:00:00 GMT")
                    .set_body_bytes(vec![1_u8, 2, 3]),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/storage/v1/object/public/a.webp", server.uri()))
            .expect("url");
        let response = fetch_image(&reqwest::Client::new(), url)
            .await
            .expect("proxied");

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[CONTENT_TYPE], "image/webp");
        assert_eq!(headers[ETAG], "\"v1\"");
        assert_eq!(headers[LAST_MODIFIED], "Tue, 03 Mar 2026 10:00:00 GMT");
        assert_eq!(headers[CACHE_CONTROL], IMMUTABLE_CACHE);
        assert_eq!(headers[CDN_CACHE_CONTROL], IMMUTABLE_CACHE);
        assert_eq!(headers[VARY], "Accept");

        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        assert_eq!(&body[..], [1_u8, 2, 3]);
    }

    #[tokio::test]
    async fn missing_content_type_defaults_to_jpeg() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0_u8]))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/storage/v1/b", server.uri())).expect("url");
        let response = fetch_image(&reqwest::Client::new(), url)
            .await
            .expect("proxied");

        assert_eq!(response.headers()[CONTENT_TYPE], DEFAULT_CONTENT_TYPE);
        assert!(response.headers().get(ETAG).is_none());
    }

    #[tokio::test]
    async fn upstream_error_status_is_passed_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/storage/v1/missing", server.uri())).expect("url");
        let err = fetch_image(&reqwest::Client::new(), url)
            .await
            .expect_err("upstream 404");

        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unreachable_upstream_is_bad_gateway() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let url = Url::parse(&format!("http://{addr}/storage/v1/x")).expect("url");
        let err = fetch_image(&reqwest::Client::new(), url)
            .await
            .expect_err("connection refused");

        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
