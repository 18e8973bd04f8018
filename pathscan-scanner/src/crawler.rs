use crate::client::{self, DEFAULT_USER_AGENT};
use crate::error::{Result, ScanError};
use crate::rate_limit::RateLimiter;
use crate::result::{UrlRecord, UrlSource};
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::{Origin, Url};

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

/// Called with each URL right before it is fetched.
pub type FetchCallback = std::sync::Arc<dyn Fn(&str) + Send + Sync>;

/// Same-origin link crawler for one scan session. The visited set and rate
/// limiter belong to this instance only.
pub struct LinkCrawler {
    client: Client,
    base_origin: Origin,
    rate_limiter: RateLimiter,
    visited: HashSet<String>,
    timeout: Duration,
    errors: usize,
    fetch_callback: Option<FetchCallback>,
}

impl LinkCrawler {
    pub fn new(base_url: &str, requests_per_second: u32, timeout: Duration) -> Result<Self> {
        let client = client::build_client(timeout, DEFAULT_USER_AGENT)?;
        Self::with_client(client, base_url, requests_per_second, timeout)
    }

    pub fn with_client(
        client: Client,
        base_url: &str,
        requests_per_second: u32,
        timeout: Duration,
    ) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        Ok(Self {
            client,
            base_origin: parsed.origin(),
            rate_limiter: RateLimiter::per_second(requests_per_second),
            visited: HashSet::new(),
            timeout,
            errors: 0,
            fetch_callback: None,
        })
    }

    pub fn with_fetch_callback(mut self, callback: FetchCallback) -> Self {
        self.fetch_callback = Some(callback);
        self
    }

    /// Replaces the crawler's limiter, e.g. with one shared by the rest of a
    /// scan session. Its last-request time carries over.
    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    /// Hands the limiter back so later requests of the session keep pacing.
    pub fn into_rate_limiter(self) -> RateLimiter {
        self.rate_limiter
    }

    /// Honors a robots.txt crawl-delay by raising the minimum interval.
    pub fn tighten_rate_limit(&mut self, crawl_delay: Duration) {
        self.rate_limiter.tighten_interval(crawl_delay);
    }

    pub fn rate_limit_interval(&self) -> Duration {
        self.rate_limiter.interval()
    }

    /// Fetches `url` and returns its unvisited same-origin links at
    /// `current_depth + 1`. Returns nothing, without any request, when the
    /// depth limit is reached or `url` was already crawled. Fetch failures
    /// are counted in `error_count` and also return nothing.
    pub async fn crawl(&mut self, url: &str, current_depth: usize, max_depth: usize) -> Vec<UrlRecord> {
        if current_depth >= max_depth {
            return Vec::new();
        }

        let key = visit_key(url);
        if !self.visited.insert(key) {
            debug!("Already visited {}", url);
            return Vec::new();
        }

        self.rate_limiter.wait().await;

        if let Some(ref callback) = self.fetch_callback {
            callback(url);
        }

        let html = match client::fetch_html(&self.client, url, self.timeout).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Crawl error for {}: {}", url, e);
                self.errors += 1;
                return Vec::new();
            }
        };

        let links = extract_links(&html, url);
        debug!("Found {} links on {}", links.len(), url);

        links
            .into_iter()
            .filter(|link| self.is_same_origin(link))
            .filter(|link| !self.visited.contains(&visit_key(link)))
            .map(|link| UrlRecord::new(link, UrlSource::Crawl, current_depth + 1))
            .collect()
    }

    fn is_same_origin(&self, url: &str) -> bool {
        Url::parse(url)
            .map(|u| u.origin() == self.base_origin)
            .unwrap_or(false)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn reset(&mut self) {
        info!("Resetting crawler state ({} visited)", self.visited.len());
        self.visited.clear();
        self.errors = 0;
    }
}

/// Absolute, fragment-free link targets of `a[href]` elements, in document
/// order and without duplicates.
pub fn extract_links(html: &str, page_url: &str) -> Vec<String> {
    let Ok(base) = Url::parse(page_url) else {
        return Vec::new();
    };
    let document = Html::parse_document(html);

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&LINK_SELECTOR) {
        if let Some(href) = element.value().attr("href")
            && let Some(absolute) = resolve_url(&base, href)
            && seen.insert(absolute.clone())
        {
            links.push(absolute);
        }
    }

    links
}

fn resolve_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let mut resolved = base.join(href).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        // javascript:, mailto:, tel: and friends
        return None;
    }
    resolved.set_fragment(None);
    Some(resolved.to_string())
}

fn visit_key(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}
