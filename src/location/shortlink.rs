//! Short-link classification and redirect resolution.
//!
//! Resolution flow: direct redirect-following request → relays in order → exhausted.
//! Each attempt yields a typed [`AttemptOutcome`]; the first `Resolved` wins and
//! the remaining relays are never contacted.

use crate::config::{RelayConfig, RelayStyle, ResolverConfig};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

static SHORTENER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?:^|[/.@])g\.co/kgs/",
        r"(?:^|[/.@])goo\.gl/maps/",
        r"(?:^|[/.@])maps\.app\.goo\.gl/",
        r"(?:^|[/.@])gmaps\.tinyurl\.com/",
        r"(?:^|[/.@])tinyurl\.com/[A-Za-z0-9]+",
        r"(?:^|[/.@])bit\.ly/[A-Za-z0-9]+",
        r"(?:^|[/.@])is\.gd/[A-Za-z0-9]+",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid shortener regex"))
    .collect()
});

static OPAQUE_MAPS_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"google\.com/maps/([A-Za-z0-9_-]+)/?$").expect("valid opaque maps path regex")
});

/// Path words that start a readable maps URL rather than an opaque short id.
const MAPS_PATH_WORDS: &[&str] = &["place", "search", "dir", "data", "embed", "preview", "contrib"];

/// Substrings that identify a URL as belonging to a maps provider.
const MAP_URL_MARKERS: &[&str] = &[
    "google.com/maps",
    "maps.google.",
    "maps.apple.com",
    "bing.com/maps",
    "openstreetmap.org",
    "here.com",
    "waze.com",
];

/// Does this URL point at a known shortener or an opaque maps short path?
pub fn is_short_link(url: &str) -> bool {
    if SHORTENER_PATTERNS.iter().any(|re| re.is_match(url)) {
        return true;
    }
    if url.contains('?') {
        return false;
    }
    OPAQUE_MAPS_PATH
        .captures(url)
        .and_then(|caps| caps.get(1))
        .is_some_and(|segment| !MAPS_PATH_WORDS.contains(&segment.as_str()))
}

/// Does this URL carry a recognized maps-provider path?
pub fn is_map_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    MAP_URL_MARKERS.iter().any(|marker| lower.contains(marker))
}

// ─── HTTP boundary ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchMethod {
    Head,
    Get,
}

/// What a redirect-following request ended up at.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedLink {
    /// URL after every redirect was followed.
    pub final_url: String,
    /// `x-final-url` response header, set by some relays.
    pub final_url_header: Option<String>,
    /// Response body, only read for `GET`.
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
}

/// Performs one redirect-following HTTP request.
pub trait LinkFetcher: Send + Sync {
    fn fetch(&self, method: FetchMethod, url: &str) -> Result<FetchedLink, FetchError>;
}

/// [`LinkFetcher`] backed by a `ureq` agent with bounded timeouts.
pub struct UreqFetcher {
    agent: ureq::Agent,
}

impl UreqFetcher {
    pub fn new(config: &ResolverConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirects(config.max_redirects)
            .user_agent(&config.user_agent)
            .build();
        Self { agent }
    }
}

impl LinkFetcher for UreqFetcher {
    fn fetch(&self, method: FetchMethod, url: &str) -> Result<FetchedLink, FetchError> {
        let request = match method {
            FetchMethod::Head => self.agent.head(url),
            FetchMethod::Get => self.agent.get(url),
        };

        let response = match request.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code, _)) => return Err(FetchError::Status(code)),
            Err(ureq::Error::Transport(e)) => return Err(FetchError::Transport(e.to_string())),
        };

        let final_url = response.get_url().to_string();
        let final_url_header = response.header("x-final-url").map(str::to_string);
        let body = match method {
            FetchMethod::Head => None,
            FetchMethod::Get => response.into_string().ok(),
        };

        Ok(FetchedLink {
            final_url,
            final_url_header,
            body,
        })
    }
}

// ─── Resolution ─────────────────────────────────────────────────

/// Why an attempt did not produce a usable URL.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The endpoint refused us (401/403/429/451).
    Blocked(u16),
    /// Any other HTTP status or transport failure.
    Failed(String),
    /// The redirect chain ended where it started.
    Unchanged,
    /// The final URL is not a maps-provider URL.
    NotAMapUrl(String),
    /// The relay answered but did not expose a final URL.
    NoFinalUrl,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Resolved(String),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShortLinkError {
    #[error("all {attempts} resolution attempts failed for {url}")]
    Exhausted {
        url: String,
        attempts: usize,
        /// At least one endpoint refused the request outright.
        blocked: bool,
    },
}

impl ShortLinkError {
    pub fn is_blocked(&self) -> bool {
        match self {
            Self::Exhausted { blocked, .. } => *blocked,
        }
    }
}

/// Resolves short links to their final URL: direct first, then each relay.
#[derive(Clone)]
pub struct ShortLinkResolver {
    fetcher: Arc<dyn LinkFetcher>,
    relays: Vec<RelayConfig>,
}

impl ShortLinkResolver {
    pub fn new(fetcher: Arc<dyn LinkFetcher>, relays: Vec<RelayConfig>) -> Self {
        Self { fetcher, relays }
    }

    pub fn resolve(&self, url: &str) -> Result<String, ShortLinkError> {
        let mut blocked = false;
        let mut attempts = 0;

        let direct = self.try_direct(url);
        attempts += 1;
        match direct {
            AttemptOutcome::Resolved(final_url) => {
                info!(%url, %final_url, "short link resolved directly");
                return Ok(final_url);
            }
            AttemptOutcome::Skipped(reason) => {
                debug!(%url, ?reason, "direct resolution skipped");
                blocked |= matches!(reason, SkipReason::Blocked(_));
            }
        }

        for relay in &self.relays {
            attempts += 1;
            match self.try_relay(relay, url) {
                AttemptOutcome::Resolved(final_url) => {
                    info!(%url, %final_url, relay = %relay.name, "short link resolved via relay");
                    return Ok(final_url);
                }
                AttemptOutcome::Skipped(reason) => {
                    debug!(%url, relay = %relay.name, ?reason, "relay skipped");
                    blocked |= matches!(reason, SkipReason::Blocked(_));
                }
            }
        }

        warn!(%url, attempts, blocked, "short link unresolvable");
        Err(ShortLinkError::Exhausted {
            url: url.to_string(),
            attempts,
            blocked,
        })
    }

    fn try_direct(&self, url: &str) -> AttemptOutcome {
        let fetched = match self.fetcher.fetch(FetchMethod::Head, url) {
            Err(FetchError::Status(405)) => self.fetcher.fetch(FetchMethod::Get, url),
            other => other,
        };
        match fetched {
            Ok(link) if same_url(&link.final_url, url) => AttemptOutcome::Skipped(SkipReason::Unchanged),
            Ok(link) if !is_map_url(&link.final_url) => {
                AttemptOutcome::Skipped(SkipReason::NotAMapUrl(link.final_url))
            }
            Ok(link) => AttemptOutcome::Resolved(link.final_url),
            Err(e) => AttemptOutcome::Skipped(skip_for(e)),
        }
    }

    fn try_relay(&self, relay: &RelayConfig, url: &str) -> AttemptOutcome {
        let target = relay.target_for(url);
        let method = match relay.style {
            RelayStyle::Json => FetchMethod::Get,
            RelayStyle::Redirect | RelayStyle::Header => FetchMethod::Head,
        };

        let link = match self.fetcher.fetch(method, &target) {
            Ok(link) => link,
            Err(e) => return AttemptOutcome::Skipped(skip_for(e)),
        };

        let candidate = match relay.style {
            RelayStyle::Redirect => Some(link.final_url).filter(|u| !same_url(u, &target)),
            RelayStyle::Header => link.final_url_header,
            RelayStyle::Json => link.body.as_deref().and_then(final_url_from_json),
        };

        match candidate {
            None => AttemptOutcome::Skipped(SkipReason::NoFinalUrl),
            Some(final_url) if same_url(&final_url, url) => AttemptOutcome::Skipped(SkipReason::Unchanged),
            Some(final_url) if !is_map_url(&final_url) => {
                AttemptOutcome::Skipped(SkipReason::NotAMapUrl(final_url))
            }
            Some(final_url) => AttemptOutcome::Resolved(final_url),
        }
    }
}

fn skip_for(error: FetchError) -> SkipReason {
    match error {
        FetchError::Status(code @ (401 | 403 | 429 | 451)) => SkipReason::Blocked(code),
        other => SkipReason::Failed(other.to_string()),
    }
}

fn same_url(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

/// Read `status.url` out of an allorigins-style JSON envelope.
fn final_url_from_json(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("status")
        .and_then(|status| status.get("url"))
        .and_then(|url| url.as_str())
        .map(str::to_string)
}
