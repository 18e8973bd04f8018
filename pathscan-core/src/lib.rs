pub mod report;
pub mod scan;

pub use scan::{
    CrawlStats, PathScanner, ScanConfig, ScanProgressCallback, ScanResult, ScanStage, ScanSummary,
};
