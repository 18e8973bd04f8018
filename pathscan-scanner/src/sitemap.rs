// sitemap.xml and sitemap index parsing

use reqwest::Client;
use sitemap::reader::{SiteMapEntity, SiteMapReader};
use std::io::Cursor;
use std::time::Duration;
use tracing::{debug, warn};
use xml::reader::{EventReader, XmlEvent};

/// A parsed sitemap document, distinguished by its root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// `<urlset>`: page URLs.
    UrlSet(Vec<String>),
    /// `<sitemapindex>`: URLs of child sitemaps, not pages.
    Index(Vec<String>),
}

impl SitemapDocument {
    pub fn into_urls(self) -> Vec<String> {
        match self {
            SitemapDocument::UrlSet(urls) | SitemapDocument::Index(urls) => urls,
        }
    }
}

/// Parses sitemap XML into a flat URL list. For a sitemap index these are the
/// child sitemap URLs; callers decide whether to fetch them.
pub fn parse(content: &str) -> Vec<String> {
    parse_document(content)
        .map(SitemapDocument::into_urls)
        .unwrap_or_default()
}

/// Parses sitemap XML, returning `None` for empty input, malformed XML or an
/// unrecognized root element.
pub fn parse_document(content: &str) -> Option<SitemapDocument> {
    if content.trim().is_empty() {
        return None;
    }

    let root = match root_element(content) {
        Some(root) => root,
        None => {
            warn!("Sitemap parse error: no root element");
            return None;
        }
    };

    let is_index = match root.as_str() {
        "urlset" => false,
        "sitemapindex" => true,
        other => {
            debug!("Unrecognized sitemap root <{}>", other);
            return None;
        }
    };

    let mut urls = Vec::new();
    let reader = SiteMapReader::new(Cursor::new(content.as_bytes()));

    for entity in reader {
        match entity {
            SiteMapEntity::Url(entry) if !is_index => {
                // Relative or missing <loc> values do not parse as URLs
                if let Some(url) = entry.loc.get_url()
                    && matches!(url.scheme(), "http" | "https")
                {
                    urls.push(url.to_string());
                }
            }
            SiteMapEntity::SiteMap(entry) if is_index => {
                if let Some(url) = entry.loc.get_url() {
                    urls.push(url.to_string());
                }
            }
            SiteMapEntity::Err(e) => {
                warn!("Sitemap parse error: {}", e);
                return None;
            }
            _ => {}
        }
    }

    Some(if is_index {
        SitemapDocument::Index(urls)
    } else {
        SitemapDocument::UrlSet(urls)
    })
}

/// Local name of the first element. Anything the XML reader rejects before
/// reaching it yields `None`.
fn root_element(content: &str) -> Option<String> {
    for event in EventReader::new(content.as_bytes()) {
        match event {
            Ok(XmlEvent::StartElement { name, .. }) => return Some(name.local_name),
            Ok(_) => {}
            Err(e) => {
                debug!("Sitemap XML error before root element: {}", e);
                return None;
            }
        }
    }
    None
}

/// Fetches and parses a sitemap document. Failures yield `None`.
pub async fn fetch_document(client: &Client, url: &str, timeout: Duration) -> Option<SitemapDocument> {
    debug!("Fetching sitemap {}", url);

    let response = match client.get(url).timeout(timeout).send().await {
        Ok(response) => response,
        Err(e) => {
            if e.is_timeout() {
                warn!("Sitemap fetch timeout: {}", url);
            } else {
                warn!("Sitemap fetch error for {}: {}", url, e);
            }
            return None;
        }
    };

    if !response.status().is_success() {
        debug!("Failed to fetch sitemap {}: {}", url, response.status());
        return None;
    }

    match response.text().await {
        Ok(body) => parse_document(&body),
        Err(e) => {
            warn!("Failed to read sitemap body from {}: {}", url, e);
            None
        }
    }
}

/// Fetches and parses a sitemap into a flat URL list. Failures yield `[]`.
pub async fn fetch_and_parse(client: &Client, url: &str, timeout: Duration) -> Vec<String> {
    fetch_document(client, url, timeout)
        .await
        .map(SitemapDocument::into_urls)
        .unwrap_or_default()
}
