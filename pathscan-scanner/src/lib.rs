pub mod client;
pub mod crawler;
pub mod error;
pub mod forms;
pub mod normalize;
pub mod rate_limit;
pub mod result;
pub mod robots;
pub mod sitemap;

pub use crawler::{FetchCallback, LinkCrawler};
pub use error::ScanError;
pub use rate_limit::RateLimiter;
pub use result::{
    BountyPotential, FormField, FormMethod, FormRecord, UrlRecord, UrlSource,
    VulnerabilityIndicator,
};
pub use robots::RobotsDirective;
pub use sitemap::SitemapDocument;
