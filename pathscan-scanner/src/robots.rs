// robots.txt parsing and path checks

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Rules for one user-agent block of a robots.txt file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotsDirective {
    pub user_agent: String,
    pub disallow: Vec<String>,
    pub allow: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crawl_delay_seconds: Option<f64>,
    pub sitemap_urls: Vec<String>,
}

impl RobotsDirective {
    /// The allow-everything directive used when robots.txt is absent or broken.
    pub fn permissive() -> Self {
        Self::for_agent("*")
    }

    fn for_agent(user_agent: &str) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            disallow: Vec::new(),
            allow: Vec::new(),
            crawl_delay_seconds: None,
            sitemap_urls: Vec::new(),
        }
    }

    /// Crawl-delay as a `Duration`, if present and representable.
    pub fn crawl_delay(&self) -> Option<Duration> {
        self.crawl_delay_seconds
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }
}

impl Default for RobotsDirective {
    fn default() -> Self {
        Self::permissive()
    }
}

/// Parses robots.txt content and returns the block for `*`, or the first
/// named block when there is no `*` block.
pub fn parse(content: &str) -> RobotsDirective {
    // Insertion order matters for the first-named-block fallback.
    let mut blocks: Vec<RobotsDirective> = Vec::new();
    let mut current: Option<usize> = None;
    let mut sitemaps: Vec<String> = Vec::new();

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let Some((key, value)) = trimmed.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        match key.as_str() {
            "user-agent" => {
                current = Some(block_index(&mut blocks, value));
            }
            "disallow" => {
                let idx = *current.get_or_insert_with(|| block_index(&mut blocks, "*"));
                blocks[idx].disallow.push(value.to_string());
            }
            "allow" => {
                let idx = *current.get_or_insert_with(|| block_index(&mut blocks, "*"));
                blocks[idx].allow.push(value.to_string());
            }
            "crawl-delay" => match value.parse::<f64>() {
                Ok(delay) if delay.is_finite() && delay >= 0.0 => {
                    let idx = *current.get_or_insert_with(|| block_index(&mut blocks, "*"));
                    blocks[idx].crawl_delay_seconds = Some(delay);
                }
                _ => debug!("Ignoring unparseable crawl-delay '{}'", value),
            },
            "sitemap" => {
                if !sitemaps.iter().any(|s| s == value) {
                    sitemaps.push(value.to_string());
                }
            }
            _ => {}
        }
    }

    let position = blocks.iter().position(|b| b.user_agent == "*");
    let mut directive = match position {
        Some(idx) => blocks.swap_remove(idx),
        None if !blocks.is_empty() => blocks.swap_remove(0),
        None => RobotsDirective::permissive(),
    };
    // Sitemap lines are global, not tied to a user-agent block.
    directive.sitemap_urls = sitemaps;
    directive
}

fn block_index(blocks: &mut Vec<RobotsDirective>, user_agent: &str) -> usize {
    if let Some(idx) = blocks.iter().position(|b| b.user_agent == user_agent) {
        return idx;
    }
    blocks.push(RobotsDirective::for_agent(user_agent));
    blocks.len() - 1
}

/// Fetches `{origin}/robots.txt`. Any failure yields the permissive directive.
pub async fn fetch_and_parse(client: &Client, origin: &str, timeout: Duration) -> RobotsDirective {
    let robots_url = match Url::parse(origin).and_then(|u| u.join("/robots.txt")) {
        Ok(u) => u,
        Err(e) => {
            warn!("Cannot build robots.txt URL for {}: {}", origin, e);
            return RobotsDirective::permissive();
        }
    };

    let response = match client.get(robots_url.as_str()).timeout(timeout).send().await {
        Ok(response) => response,
        Err(e) => {
            if e.is_timeout() {
                warn!("robots.txt fetch timeout: {}", robots_url);
            } else {
                warn!("robots.txt fetch error for {}: {}", robots_url, e);
            }
            return RobotsDirective::permissive();
        }
    };

    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        info!("No robots.txt at {}", robots_url);
        return RobotsDirective::permissive();
    }
    if !status.is_success() {
        warn!("robots.txt returned {} for {}", status, robots_url);
        return RobotsDirective::permissive();
    }

    match response.text().await {
        Ok(body) => parse(&body),
        Err(e) => {
            warn!("Failed to read robots.txt body from {}: {}", robots_url, e);
            RobotsDirective::permissive()
        }
    }
}

/// Allow rules are checked first and any match grants access; then any
/// matching Disallow rule denies. No match means allowed.
pub fn is_allowed(path: &str, directive: &RobotsDirective) -> bool {
    if directive.allow.iter().any(|p| matches_pattern(path, p)) {
        return true;
    }
    if directive.disallow.iter().any(|p| matches_pattern(path, p)) {
        return false;
    }
    true
}

fn matches_pattern(path: &str, pattern: &str) -> bool {
    if pattern == "/" {
        return true;
    }
    if pattern.is_empty() {
        return false;
    }
    match pattern.strip_suffix('*') {
        Some(prefix) => path.starts_with(prefix),
        None => path.starts_with(pattern),
    }
}
