use pathscan_scanner::client::{self, DEFAULT_USER_AGENT};
use pathscan_scanner::error::{Result, ScanError};
use pathscan_scanner::{
    FormRecord, LinkCrawler, RateLimiter, RobotsDirective, SitemapDocument, UrlRecord, UrlSource,
    forms, normalize, robots, sitemap,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// Pages fetched for form extraction per scan unless configured otherwise.
/// Bounds request volume against arbitrary targets.
pub const FORM_EXTRACTION_LIMIT: usize = 20;

/// Options for a single scan. Range checks are left to the caller.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub max_depth: usize,
    /// Requests per second.
    pub rate_limit: u32,
    pub max_urls: usize,
    pub respect_robots: bool,
    pub timeout: Duration,
    pub form_extraction_limit: usize,
    pub user_agent: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            rate_limit: 2,
            max_urls: 100,
            respect_robots: true,
            timeout: Duration::from_millis(10_000),
            form_extraction_limit: FORM_EXTRACTION_LIMIT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ScanConfig {
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_rate_limit(mut self, requests_per_second: u32) -> Self {
        self.rate_limit = requests_per_second;
        self
    }

    pub fn with_max_urls(mut self, max_urls: usize) -> Self {
        self.max_urls = max_urls;
        self
    }

    pub fn with_respect_robots(mut self, respect: bool) -> Self {
        self.respect_robots = respect;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_form_extraction_limit(mut self, limit: usize) -> Self {
        self.form_extraction_limit = limit;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// The stages a scan moves through, strictly in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStage {
    Init,
    FetchRobots,
    FetchSitemaps,
    SeedFrontier,
    Crawling,
    ExtractingForms,
    Normalizing,
    Done,
}

impl ScanStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStage::Init => "init",
            ScanStage::FetchRobots => "fetch-robots",
            ScanStage::FetchSitemaps => "fetch-sitemaps",
            ScanStage::SeedFrontier => "seed-frontier",
            ScanStage::Crawling => "crawling",
            ScanStage::ExtractingForms => "extracting-forms",
            ScanStage::Normalizing => "normalizing",
            ScanStage::Done => "done",
        }
    }
}

/// Callback for reporting scan progress: the current stage and a detail
/// message (usually the URL being fetched).
pub type ScanProgressCallback = Arc<dyn Fn(ScanStage, &str) + Send + Sync>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub target: String,
    pub urls_discovered: usize,
    pub forms_found: usize,
    pub depth: usize,
    pub duration_seconds: f64,
    pub started_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlStats {
    pub sitemap_urls: usize,
    pub crawled_urls: usize,
    pub skipped_urls: usize,
    pub errors: usize,
    pub duration_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub summary: ScanSummary,
    pub urls: Vec<UrlRecord>,
    pub forms: Vec<FormRecord>,
    pub crawl_stats: CrawlStats,
    pub robots_directives: RobotsDirective,
}

impl ScanResult {
    pub fn high_value_urls(&self) -> impl Iterator<Item = &UrlRecord> {
        self.urls
            .iter()
            .filter(|u| u.bounty_potential == pathscan_scanner::BountyPotential::High)
    }

    pub fn forms_with_issues(&self) -> impl Iterator<Item = &FormRecord> {
        self.forms
            .iter()
            .filter(|f| !f.vulnerability_indicators.is_empty())
    }
}

/// Path used for robots.txt matching. Query and fragment are ignored;
/// unparseable input is returned as is.
pub fn extract_url_path(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) if parsed.path().is_empty() => "/".to_string(),
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.to_string(),
    }
}

/// Validates a scan target: it must be an absolute http(s) URL with a host.
pub fn parse_target(target: &str) -> Result<Url> {
    let url = Url::parse(target)
        .map_err(|e| ScanError::InvalidUrl(format!("Invalid target URL {}: {}", target, e)))?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ScanError::InvalidUrl(format!(
            "Invalid target URL {}: expected an http(s) URL with a host",
            target
        )));
    }

    Ok(url)
}

/// Orchestrates robots.txt, sitemaps, the link crawl and form extraction into
/// one bounded scan.
pub struct PathScanner {
    config: ScanConfig,
    client: Client,
    progress_callback: Option<ScanProgressCallback>,
}

impl PathScanner {
    pub fn new(config: ScanConfig) -> Result<Self> {
        let client = client::build_client(config.timeout, &config.user_agent)?;
        Ok(Self {
            config,
            client,
            progress_callback: None,
        })
    }

    pub fn with_progress_callback(mut self, callback: ScanProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    fn report(&self, stage: ScanStage, message: &str) {
        debug!("[{}] {}", stage.as_str(), message);
        if let Some(ref callback) = self.progress_callback {
            callback(stage, message);
        }
    }

    /// Runs a full scan of `target`. Only an invalid target is an error;
    /// network failures along the way are recovered and counted.
    pub async fn scan(&self, target: &str) -> Result<ScanResult> {
        let start = Instant::now();
        let started_at = chrono::Utc::now().to_rfc3339();

        self.report(ScanStage::Init, target);
        let target_url = parse_target(target)?;
        info!("Starting scan of {} (depth={}, rate={} req/s)", target, self.config.max_depth, self.config.rate_limit);

        let mut stats = CrawlStats::default();
        let timeout = self.config.timeout;

        self.report(ScanStage::FetchRobots, "robots.txt");
        let robots_directive = robots::fetch_and_parse(&self.client, target_url.as_str(), timeout).await;

        self.report(ScanStage::FetchSitemaps, "sitemap.xml");
        let sitemap_urls = self
            .fetch_sitemaps(&target_url, &robots_directive.sitemap_urls)
            .await;
        stats.sitemap_urls = sitemap_urls.len();

        self.report(ScanStage::SeedFrontier, &format!("{} sitemap URLs", sitemap_urls.len()));
        let mut records: Vec<UrlRecord> = Vec::new();
        let mut known: HashSet<String> = HashSet::new();

        // Disallowed URLs stay known so a later crawl hit is not counted again
        for url in sitemap_urls {
            if !known.insert(normalize::normalize(&url)) {
                continue;
            }
            if self.config.respect_robots && !robots::is_allowed(&extract_url_path(&url), &robots_directive) {
                debug!("robots.txt disallows {}", url);
                stats.skipped_urls += 1;
                continue;
            }
            records.push(UrlRecord::new(url, UrlSource::Sitemap, 0));
        }

        // The target is always scanned, whatever robots.txt says about it
        let target_key = normalize::normalize(target);
        known.insert(target_key.clone());
        if !records.iter().any(|r| normalize::normalize(&r.url) == target_key) {
            records.push(UrlRecord::new(target.to_string(), UrlSource::Initial, 0));
        }

        // One limiter paces every page fetch of the scan, crawl and forms alike
        let mut limiter = RateLimiter::per_second(self.config.rate_limit);
        if let Some(delay) = robots_directive.crawl_delay() {
            limiter.tighten_interval(delay);
            info!("Using Crawl-delay: {:?} from robots.txt", delay);
        }

        if self.config.max_depth > 0 {
            limiter = self
                .crawl(target, limiter, &robots_directive, &mut records, &mut known, &mut stats)
                .await?;
        }

        let forms = self.extract_forms(&mut limiter, &mut records, &mut stats).await;

        self.report(ScanStage::Normalizing, &format!("{} URLs", records.len()));
        let urls = normalize::process(records);

        let duration = start.elapsed().as_secs_f64();
        stats.duration_seconds = duration;

        info!(
            "Scan complete: {} URLs, {} forms in {:.1}s",
            urls.len(),
            forms.len(),
            duration
        );
        self.report(ScanStage::Done, target);

        Ok(ScanResult {
            summary: ScanSummary {
                target: target.to_string(),
                urls_discovered: urls.len(),
                forms_found: forms.len(),
                depth: self.config.max_depth,
                duration_seconds: duration,
                started_at,
            },
            urls,
            forms,
            crawl_stats: stats,
            robots_directives: robots_directive,
        })
    }

    /// Fetches `/sitemap.xml` and every robots.txt sitemap. Children of a
    /// sitemap index are fetched once; nested indexes are not followed.
    async fn fetch_sitemaps(&self, target: &Url, robots_sitemaps: &[String]) -> Vec<String> {
        let timeout = self.config.timeout;
        let mut candidates: Vec<String> = Vec::new();
        if let Ok(default) = target.join("/sitemap.xml") {
            candidates.push(default.to_string());
        }
        candidates.extend(robots_sitemaps.iter().cloned());

        let mut fetched: HashSet<String> = HashSet::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut urls: Vec<String> = Vec::new();

        for candidate in candidates {
            if !fetched.insert(candidate.clone()) {
                continue;
            }
            self.report(ScanStage::FetchSitemaps, &candidate);

            let page_urls = match sitemap::fetch_document(&self.client, &candidate, timeout).await {
                Some(SitemapDocument::UrlSet(page_urls)) => page_urls,
                Some(SitemapDocument::Index(children)) => {
                    let mut page_urls = Vec::new();
                    for child in children {
                        if !fetched.insert(child.clone()) {
                            continue;
                        }
                        self.report(ScanStage::FetchSitemaps, &child);
                        match sitemap::fetch_document(&self.client, &child, timeout).await {
                            Some(SitemapDocument::UrlSet(child_urls)) => page_urls.extend(child_urls),
                            Some(SitemapDocument::Index(_)) => {
                                debug!("Not following nested sitemap index {}", child)
                            }
                            None => {}
                        }
                    }
                    page_urls
                }
                None => Vec::new(),
            };

            for url in page_urls {
                if seen.insert(url.clone()) {
                    urls.push(url);
                }
            }
        }

        urls
    }

    /// Breadth-first crawl over the seeded records until the frontier runs
    /// out or `max_urls` is reached.
    async fn crawl(
        &self,
        target: &str,
        limiter: RateLimiter,
        robots_directive: &RobotsDirective,
        records: &mut Vec<UrlRecord>,
        known: &mut HashSet<String>,
        stats: &mut CrawlStats,
    ) -> Result<RateLimiter> {
        let max_depth = self.config.max_depth;
        let max_urls = self.config.max_urls;

        self.report(
            ScanStage::Crawling,
            &format!("depth={}, rate={} req/s", max_depth, self.config.rate_limit),
        );

        let mut crawler = LinkCrawler::with_client(
            self.client.clone(),
            target,
            self.config.rate_limit,
            self.config.timeout,
        )?
        .with_rate_limiter(limiter);
        if let Some(ref callback) = self.progress_callback {
            let callback = callback.clone();
            crawler = crawler.with_fetch_callback(Arc::new(move |url: &str| {
                callback(ScanStage::Crawling, url)
            }));
        }

        let mut frontier: VecDeque<usize> = (0..records.len()).collect();

        while let Some(idx) = frontier.pop_front() {
            if records.len() >= max_urls {
                warn!("Reached max URL limit ({})", max_urls);
                break;
            }

            let (url, depth) = (records[idx].url.clone(), records[idx].depth);
            if depth >= max_depth {
                continue;
            }

            let discovered = crawler.crawl(&url, depth, max_depth).await;
            stats.crawled_urls += discovered.len();

            for record in discovered {
                if records.len() >= max_urls {
                    break;
                }
                if !known.insert(normalize::normalize(&record.url)) {
                    continue;
                }
                if self.config.respect_robots
                    && !robots::is_allowed(&extract_url_path(&record.url), robots_directive)
                {
                    debug!("robots.txt disallows {}", record.url);
                    stats.skipped_urls += 1;
                    continue;
                }
                frontier.push_back(records.len());
                records.push(record);
            }
        }

        stats.errors += crawler.error_count();
        info!(
            "Crawl finished: {} pages visited, {} errors",
            crawler.visited_count(),
            crawler.error_count()
        );
        Ok(crawler.into_rate_limiter())
    }

    /// Fetches the first `form_extraction_limit` records (discovery order)
    /// and extracts their forms. Failures skip the URL.
    async fn extract_forms(
        &self,
        limiter: &mut RateLimiter,
        records: &mut [UrlRecord],
        stats: &mut CrawlStats,
    ) -> Vec<FormRecord> {
        let limit = records.len().min(self.config.form_extraction_limit);
        self.report(ScanStage::ExtractingForms, &format!("{} pages", limit));

        let mut all_forms = Vec::new();

        for record in records.iter_mut().take(limit) {
            limiter.wait().await;
            self.report(ScanStage::ExtractingForms, &record.url);

            let html = match client::fetch_html(&self.client, &record.url, self.config.timeout).await {
                Ok(html) => html,
                Err(ScanError::HttpStatus { status, .. }) => {
                    debug!("Skipping forms on {} (HTTP {})", record.url, status);
                    continue;
                }
                Err(ScanError::NotHtml(content_type)) => {
                    debug!("Skipping forms on {} ({})", record.url, content_type);
                    continue;
                }
                Err(e) => {
                    warn!("Form extraction failed for {}: {}", record.url, e);
                    stats.errors += 1;
                    continue;
                }
            };

            let page_forms = forms::extract(&html, &record.url);
            if page_forms.is_empty() {
                continue;
            }

            record.has_forms = true;
            record.form_count = page_forms.len();
            for form in &page_forms {
                record
                    .bounty_potential
                    .raise_to(forms::estimate_bounty_potential(&form.vulnerability_indicators));
            }
            all_forms.extend(page_forms);
        }

        all_forms
    }
}
