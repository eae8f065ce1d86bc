//! Visitor classification for analytics tracking and review submission.
//!
//! Everything here is pure: callers hand in header values and payload
//! fields, and get back a decision.

use std::sync::LazyLock;

use regex::Regex;

const BOT_PATTERNS: &[&str] = &[
    "bot",
    "crawl",
    "spider",
    "preview",
    "facebookexternalhit",
    "whatsapp",
    "slackbot",
    "telegrambot",
    "googlebot",
    "bingbot",
    "yandexbot",
    "baiduspider",
    "ahrefsbot",
    "semrushbot",
    "duckduckbot",
    "applebot",
    "petalbot",
    "twitterbot",
    "linkedinbot",
    "discordbot",
    "slurp",
    "msnbot",
    "ia_archiver",
    "headless",
    "phantom",
    "selenium",
    "puppeteer",
    "playwright",
];

const DEV_DOMAINS: &[&str] = &[
    "localhost",
    "127.0.0.1",
    "0.0.0.0",
    "duolb.pages.dev",
    ".local",
    "192.168.",
    "10.0.",
];

const SUSPICIOUS_PATTERNS: &[&str] = &[
    "curl",
    "wget",
    "python-requests",
    "postman",
    "insomnia",
    "httpie",
];

pub const MIN_USER_AGENT_LEN: usize = 10;
pub const MAX_PATH_LEN: usize = 2048;
pub const MAX_EVENT_LEN: usize = 100;
pub const MAX_LANGUAGE_LEN: usize = 10;
pub const MAX_TIMEZONE_LEN: usize = 50;
pub const MAX_UTM_LEN: usize = 255;

/// Reviewer address used when the request carries no usable IP.
pub const LOOPBACK_IP: &str = "127.0.0.1";

static SESSION_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{10,128}$").expect("valid session id regex"));
static IPV4_WITH_PORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,3}(?:\.\d{1,3}){3}):\d+$").expect("valid ipv4 port regex")
});
static IPV4: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(25[0-5]|2[0-4]\d|1?\d?\d)(\.(25[0-5]|2[0-4]\d|1?\d?\d)){3}$")
        .expect("valid ipv4 regex")
});
static IPV6_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F:]+$").expect("valid ipv6 regex"));

/// Why a tracking event was dropped without being stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Owner,
    DevEnvironment,
    Bot,
    MissingUserAgent,
}

/// Request facts the tracking filters look at.
#[derive(Debug, Clone, Copy, Default)]
pub struct Visit<'a> {
    pub owner_key_matches: bool,
    pub host: &'a str,
    pub referrer: &'a str,
    pub user_agent: &'a str,
}

/// Apply the tracking filters in order; `None` means the event should be kept.
#[must_use]
pub fn classify_visit(visit: &Visit<'_>) -> Option<SkipReason> {
    if visit.owner_key_matches {
        return Some(SkipReason::Owner);
    }
    if is_dev_environment(visit.host, visit.referrer) {
        return Some(SkipReason::DevEnvironment);
    }
    if is_bot(visit.user_agent) || is_suspicious(visit.user_agent) {
        return Some(SkipReason::Bot);
    }
    if visit.user_agent.chars().count() < MIN_USER_AGENT_LEN {
        return Some(SkipReason::MissingUserAgent);
    }
    None
}

#[must_use]
pub fn is_bot(user_agent: &str) -> bool {
    contains_any(user_agent, BOT_PATTERNS)
}

/// Scripted HTTP clients.
#[must_use]
pub fn is_suspicious(user_agent: &str) -> bool {
    contains_any(user_agent, SUSPICIOUS_PATTERNS)
}

#[must_use]
pub fn is_dev_environment(host: &str, referrer: &str) -> bool {
    contains_any(&format!("{host} {referrer}"), DEV_DOMAINS)
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    let haystack = haystack.to_lowercase();
    needles.iter().any(|n| haystack.contains(n))
}

#[must_use]
pub fn is_valid_session_id(session_id: &str) -> bool {
    SESSION_ID.is_match(session_id)
}

#[must_use]
pub fn is_valid_path(path: &str) -> bool {
    path.starts_with('/') && path.chars().count() < MAX_PATH_LEN
}

/// First `max_len` characters, trimmed.
#[must_use]
pub fn sanitize(input: &str, max_len: usize) -> String {
    let end = input
        .char_indices()
        .nth(max_len)
        .map_or(input.len(), |(i, _)| i);
    input[..end].trim().to_string()
}

/// Like [`sanitize`], but blank results become `None`.
#[must_use]
pub fn sanitize_optional(input: Option<&str>, max_len: usize) -> Option<String> {
    input
        .map(|v| sanitize(v, max_len))
        .filter(|v| !v.is_empty())
}

/// Client address as seen by the tracking endpoint.
///
/// Headers are consulted in order `cf-connecting-ip`, `x-real-ip`,
/// `x-forwarded-for`, `x-client-ip`, `x-cluster-client-ip`; the first
/// comma-separated entry of the first present header wins.
pub fn tracking_client_ip<'a>(header: impl Fn(&str) -> Option<&'a str>) -> Option<&'a str> {
    [
        "cf-connecting-ip",
        "x-real-ip",
        "x-forwarded-for",
        "x-client-ip",
        "x-cluster-client-ip",
    ]
    .into_iter()
    .find_map(|name| header(name).filter(|v| !v.is_empty()))
    .and_then(|v| v.split(',').next())
    .map(str::trim)
    .filter(|v| !v.is_empty())
}

/// Reviewer address: first `x-forwarded-for` entry, then
/// `cf-connecting-ip`, then `x-real-ip`, normalised with [`normalize_ip`].
pub fn reviewer_ip<'a>(header: impl Fn(&str) -> Option<&'a str>) -> String {
    let raw = if let Some(forwarded) = header("x-forwarded-for").filter(|v| !v.is_empty()) {
        forwarded.split(',').next().map(str::trim).unwrap_or_default()
    } else {
        header("cf-connecting-ip")
            .filter(|v| !v.is_empty())
            .or_else(|| header("x-real-ip").filter(|v| !v.is_empty()))
            .unwrap_or_default()
    };
    normalize_ip(raw)
}

/// Canonical form of a client IP, or [`LOOPBACK_IP`] when it is unusable.
///
/// Strips IPv6 brackets, an IPv4 port suffix and an IPv6 zone id.
#[must_use]
pub fn normalize_ip(raw: &str) -> String {
    let mut candidate = raw.trim();
    if candidate.is_empty() || candidate == "unknown" || candidate == "::1" {
        return LOOPBACK_IP.to_string();
    }

    if let Some((first, _)) = candidate.split_once(',') {
        candidate = first.trim();
    }
    if let Some(inner) = candidate
        .strip_prefix('[')
        .and_then(|c| c.strip_suffix(']'))
    {
        candidate = inner;
    }
    if let Some(caps) = IPV4_WITH_PORT.captures(candidate) {
        if let Some(host) = caps.get(1) {
            candidate = host.as_str();
        }
    }
    if let Some((addr, _zone)) = candidate.split_once('%') {
        candidate = addr;
    }

    let valid_v4 = IPV4.is_match(candidate);
    let likely_v6 = candidate.contains(':') && IPV6_LIKE.is_match(candidate);
    if valid_v4 || likely_v6 {
        candidate.to_string()
    } else {
        LOOPBACK_IP.to_string()
    }
}
