// Report generation from scan results

use crate::scan::ScanResult;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

const RULE_WIDTH: usize = 60;
const TOP_N: usize = 10;
const ROBOTS_DISALLOW_SHOWN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Compact,
}

pub fn generate_report(result: &ScanResult, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(result)),
        ReportFormat::Json => generate_json_report(result),
        ReportFormat::Compact => Ok(generate_compact_report(result)),
    }
}

pub fn generate_text_report(result: &ScanResult) -> String {
    let rule = "━".repeat(RULE_WIDTH);
    let mut report = String::new();

    // Header
    report.push_str(&format!("{}\n", rule));
    report.push_str("PATHSCAN RESULTS\n");
    report.push_str(&format!("{}\n\n", rule));

    // Summary
    let summary = &result.summary;
    report.push_str("## Summary\n\n");
    report.push_str(&format!("Target:          {}\n", summary.target));
    report.push_str(&format!("URLs Discovered: {}\n", summary.urls_discovered));
    report.push_str(&format!("Forms Found:     {}\n", summary.forms_found));
    report.push_str(&format!("Max Depth:       {}\n", summary.depth));
    report.push_str(&format!("Duration:        {}\n", format_duration(summary.duration_seconds)));
    report.push('\n');

    // Crawl statistics
    let stats = &result.crawl_stats;
    report.push_str("## Crawl Statistics\n\n");
    report.push_str(&format!("├─ From sitemap: {}\n", stats.sitemap_urls));
    report.push_str(&format!("├─ From crawl:   {}\n", stats.crawled_urls));
    report.push_str(&format!("├─ Skipped:      {}\n", stats.skipped_urls));
    report.push_str(&format!("└─ Errors:       {}\n", stats.errors));
    report.push('\n');

    let high_value: Vec<_> = result.high_value_urls().collect();
    if !high_value.is_empty() {
        report.push_str("## High-Value Targets\n\n");
        for url in high_value.iter().take(TOP_N) {
            report.push_str(&format!("  • {}{}\n", url.url, form_count_suffix(url.has_forms, url.form_count)));
        }
        if high_value.len() > TOP_N {
            report.push_str(&format!("  ... and {} more\n", high_value.len() - TOP_N));
        }
        report.push('\n');
    }

    let flagged: Vec<_> = result.forms_with_issues().collect();
    if !flagged.is_empty() {
        report.push_str("## Forms with Potential Issues\n\n");
        for form in flagged.iter().take(TOP_N) {
            let issues: Vec<&str> = form
                .vulnerability_indicators
                .iter()
                .map(|i| i.as_str())
                .collect();
            report.push_str(&format!("  {}\n", form.page_url));
            report.push_str(&format!("  └─ {} → {}\n", form.method.as_str(), form.action_url));
            report.push_str(&format!("     Issues: {}\n\n", issues.join(", ")));
        }
        if flagged.len() > TOP_N {
            report.push_str(&format!("  ... and {} more\n\n", flagged.len() - TOP_N));
        }
    }

    let robots = &result.robots_directives;
    if !robots.disallow.is_empty() || !robots.sitemap_urls.is_empty() || robots.crawl_delay_seconds.is_some() {
        report.push_str("## Robots.txt\n\n");
        if let Some(delay) = robots.crawl_delay_seconds {
            report.push_str(&format!("Crawl-delay: {}s\n", delay));
        }
        if !robots.disallow.is_empty() {
            let shown: Vec<&str> = robots
                .disallow
                .iter()
                .take(ROBOTS_DISALLOW_SHOWN)
                .map(String::as_str)
                .collect();
            report.push_str(&format!("Disallowed: {}\n", shown.join(", ")));
            if robots.disallow.len() > ROBOTS_DISALLOW_SHOWN {
                report.push_str(&format!(
                    "... and {} more\n",
                    robots.disallow.len() - ROBOTS_DISALLOW_SHOWN
                ));
            }
        }
        if !robots.sitemap_urls.is_empty() {
            report.push_str(&format!("Sitemaps: {}\n", robots.sitemap_urls.len()));
        }
        report.push('\n');
    }

    // Footer
    report.push_str(&format!("{}\n", rule));
    report.push_str("Tip: use --json for machine-readable output\n");
    report.push_str(&format!("{}\n", rule));

    report
}

/// One line, for piping into other tools.
pub fn generate_compact_report(result: &ScanResult) -> String {
    let mut parts = vec![
        format!("Target: {}", result.summary.target),
        format!(
            "URLs: {}, Forms: {}",
            result.summary.urls_discovered, result.summary.forms_found
        ),
    ];

    let high_value = result.high_value_urls().count();
    if high_value > 0 {
        parts.push(format!("High-value: {}", high_value));
    }

    parts.join(", ")
}

/// The scan result as pretty JSON, using the camelCase field names of the
/// serialized types.
pub fn generate_json_report(result: &ScanResult) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(result)
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

fn form_count_suffix(has_forms: bool, count: usize) -> String {
    if !has_forms {
        return String::new();
    }
    if count == 1 {
        " (1 form)".to_string()
    } else {
        format!(" ({} forms)", count)
    }
}

fn format_duration(seconds: f64) -> String {
    if seconds < 60.0 {
        format!("{:.1}s", seconds)
    } else {
        let whole = seconds.round() as u64;
        format!("{}m {}s", whole / 60, whole % 60)
    }
}
