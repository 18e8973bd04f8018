use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use pathscan_core::report::{self, ReportFormat};
use pathscan_core::scan::{PathScanner, ScanConfig, ScanStage, extract_url_path};
use pathscan_scanner::{FormRecord, forms};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Everything `scan` needs, pulled out of the parsed arguments.
#[derive(Debug, Clone)]
pub struct ScanArgs {
    pub target: String,
    pub config: ScanConfig,
    pub format: ReportFormat,
    pub output: Option<PathBuf>,
}

impl ScanArgs {
    pub fn from_matches(sub_matches: &ArgMatches) -> Self {
        let defaults = ScanConfig::default();

        let target = sub_matches
            .get_one::<String>("TARGET")
            .cloned()
            .unwrap_or_default();
        let depth = sub_matches
            .get_one::<u64>("depth")
            .map(|d| *d as usize)
            .unwrap_or(defaults.max_depth);
        let rate_limit = sub_matches
            .get_one::<u32>("rate-limit")
            .copied()
            .unwrap_or(defaults.rate_limit);
        let max_urls = sub_matches
            .get_one::<u64>("max-urls")
            .map(|m| *m as usize)
            .unwrap_or(defaults.max_urls);
        let forms_limit = sub_matches
            .get_one::<u64>("forms-limit")
            .map(|f| *f as usize)
            .unwrap_or(defaults.form_extraction_limit);
        let timeout = sub_matches
            .get_one::<u64>("timeout")
            .map(|s| Duration::from_secs(*s))
            .unwrap_or(defaults.timeout);

        let format = if sub_matches.get_flag("json") {
            ReportFormat::Json
        } else if sub_matches.get_flag("compact") {
            ReportFormat::Compact
        } else {
            ReportFormat::Text
        };

        Self {
            target,
            config: defaults
                .with_max_depth(depth)
                .with_rate_limit(rate_limit)
                .with_max_urls(max_urls)
                .with_form_extraction_limit(forms_limit)
                .with_timeout(timeout)
                .with_respect_robots(!sub_matches.get_flag("no-respect-robots")),
            format,
            output: sub_matches.get_one::<PathBuf>("output").cloned(),
        }
    }
}

/// Log filter for our own crates; everything else stays at warn.
pub fn log_directive(verbosity: u8, quiet: bool) -> String {
    let level = match (quiet, verbosity) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    format!(
        "warn,pathscan={0},pathscan_core={0},pathscan_scanner={0}",
        level
    )
}

/// Logs go to stderr so reports on stdout stay pipeable. `RUST_LOG` wins
/// over the verbosity flags.
pub fn init_tracing(verbosity: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_directive(verbosity, quiet)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn print_banner() {
    eprintln!(
        "{}",
        r#"
                 _   _
   _ __   __ _  | |_| |__  ___  ___ __ _ _ __
  | '_ \ / _` | | __| '_ \/ __|/ __/ _` | '_ \
  | |_) | (_| | | |_| | | \__ \ (_| (_| | | | |
  | .__/ \__,_|  \__|_| |_|___/\___\__,_|_| |_|
  |_|"#
            .bright_cyan()
            .bold()
    );
    eprintln!(
        "  {} {}\n",
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed(),
        "For authorized security testing only.".yellow()
    );
}

fn new_spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

pub async fn handle_scan(args: &ScanArgs, quiet: bool) -> Result<()> {
    if !quiet {
        eprintln!("{} {}", "Scanning".bright_green().bold(), args.target);
        eprintln!(
            "Depth: {}  Rate: {} req/s  Max URLs: {}  Robots: {}\n",
            args.config.max_depth,
            args.config.rate_limit,
            args.config.max_urls,
            if args.config.respect_robots { "respected" } else { "ignored" }
        );
    }

    debug!("Scan config: {:?}", args.config);

    let spinner = new_spinner(quiet);
    let progress = spinner.clone();
    let scanner = PathScanner::new(args.config.clone())?.with_progress_callback(Arc::new(
        move |stage: ScanStage, message: &str| {
            let detail = if message.starts_with("http") {
                extract_url_path(message)
            } else {
                message.to_string()
            };
            progress.set_message(format!("[{}] {}", stage.as_str(), detail));
        },
    ));

    let result = scanner.scan(&args.target).await;
    spinner.finish_and_clear();
    let result = result.with_context(|| format!("Scan of {} failed", args.target))?;

    if !quiet {
        eprintln!(
            "{} {} URLs, {} forms\n",
            "✓ Scan complete:".green().bold(),
            result.summary.urls_discovered,
            result.summary.forms_found
        );
    }

    let rendered = report::generate_report(&result, args.format)?;

    match &args.output {
        Some(path) => {
            report::save_report(&rendered, path)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            if !quiet {
                eprintln!("{} {}", "Report saved to".green(), path.display());
            }
        }
        None => println!("{}", rendered),
    }

    Ok(())
}

/// Reads an HTML file from disk and extracts its forms as if it had been
/// served from `page_url`.
pub fn extract_forms_from_file(path: &Path, page_url: &Url) -> Result<Vec<FormRecord>> {
    let html = fs::read_to_string(path)
        .with_context(|| format!("Failed to read HTML file {}", path.display()))?;
    Ok(forms::extract(&html, page_url.as_str()))
}

pub fn format_forms(records: &[FormRecord]) -> String {
    if records.is_empty() {
        return "No forms found.\n".to_string();
    }

    let mut out = String::new();
    for (idx, form) in records.iter().enumerate() {
        let potential = forms::estimate_bounty_potential(&form.vulnerability_indicators);
        out.push_str(&format!(
            "[{}] {} → {}  (bounty potential: {})\n",
            idx + 1,
            form.method.as_str(),
            form.action_url,
            potential.as_str()
        ));

        let fields: Vec<String> = form
            .fields
            .iter()
            .map(|f| format!("{}:{}", f.name, f.field_type))
            .collect();
        if !fields.is_empty() {
            out.push_str(&format!("    Fields: {}\n", fields.join(", ")));
        }
        out.push_str(&format!(
            "    CSRF token: {}\n",
            if form.has_csrf_token { "yes" } else { "no" }
        ));
        if !form.vulnerability_indicators.is_empty() {
            let issues: Vec<&str> = form
                .vulnerability_indicators
                .iter()
                .map(|i| i.as_str())
                .collect();
            out.push_str(&format!("    Issues: {}\n", issues.join(", ")));
        }
    }
    out
}

pub fn handle_forms(sub_matches: &ArgMatches) -> Result<()> {
    let path = sub_matches
        .get_one::<PathBuf>("FILE")
        .context("No HTML file given")?;
    let page_url = sub_matches
        .get_one::<Url>("page-url")
        .context("No page URL given")?;

    let records = extract_forms_from_file(path, page_url)?;
    debug!("Found {} forms in {}", records.len(), path.display());

    if sub_matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        print!("{}", format_forms(&records));
    }
    Ok(())
}
