use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::Request,
    http::{header::CONTENT_TYPE, HeaderValue},
    middleware::Next,
    response::Response,
};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

#[derive(Debug, Clone, Copy)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter with one window per key.
///
/// Expired windows linger until the next [`KeyedRateLimiter::sweep`].
#[derive(Debug, Clone)]
pub struct KeyedRateLimiter {
    max_requests: usize,
    window: Duration,
    windows: Arc<Mutex<HashMap<String, RateLimitWindow>>>,
}

impl KeyedRateLimiter {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Count one request for `key`; `false` once the window is exhausted.
    pub async fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now()).await
    }

    async fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut windows = self.windows.lock().await;
        match windows.get_mut(key) {
            Some(w) if now.saturating_duration_since(w.started_at) < self.window => {
                if w.count >= self.max_requests {
                    return false;
                }
                w.count += 1;
                true
            }
            _ => {
                windows.insert(
                    key.to_owned(),
                    RateLimitWindow {
                        started_at: now,
                        count: 1,
                    },
                );
                true
            }
        }
    }

    /// Drop expired windows, returning how many were removed.
    pub async fn sweep(&self) -> usize {
        self.sweep_at(Instant::now()).await
    }

    async fn sweep_at(&self, now: Instant) -> usize {
        let mut windows = self.windows.lock().await;
        let before = windows.len();
        windows.retain(|_, w| now.saturating_duration_since(w.started_at) < self.window);
        before - windows.len()
    }
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware appending `; charset=utf-8` to HTML and XML responses that
/// declare no charset.
pub async fn enforce_utf8_charset(req: Request, next: Next) -> Response {
    let mut res = next.run(req).await;

    let patched = res
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(with_utf8_charset);
    if let Some(value) = patched.and_then(|v| HeaderValue::from_str(&v).ok()) {
        res.headers_mut().insert(CONTENT_TYPE, value);
    }

    res
}

fn with_utf8_charset(content_type: &str) -> Option<String> {
    let lower = content_type.to_ascii_lowercase();
    if lower.contains("charset=") {
        return None;
    }
    let mime = lower.split(';').next().unwrap_or_default().trim();
    matches!(mime, "text/html" | "application/xml" | "text/xml")
        .then(|| format!("{}; charset=utf-8", content_type.trim_end_matches([';', ' '])))
}
