use crate::CLAP_STYLING;
use clap::{arg, command};
use url::Url;

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("pathscan")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("pathscan")
        .about("Polite path discovery and form reconnaissance for authorized testing")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner, progress and non-essential output")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" ... "Increase log verbosity (-v info, -vv debug, -vvv trace)")
                .required(false)
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(
            command!("scan")
                .about(
                    "Discover paths on a target through robots.txt, sitemaps and a \
                polite same-origin crawl, then flag forms worth a closer look.",
                )
                .arg(
                    arg!(<TARGET>)
                        .required(true)
                        .help("The http(s) URL to scan"),
                )
                .arg(
                    arg!(-d --"depth" <DEPTH>)
                        .required(false)
                        .help("Maximum crawl depth (0 disables crawling)")
                        .value_parser(clap::value_parser!(u64).range(0..=3))
                        .default_value("2"),
                )
                .arg(
                    arg!(-r --"rate-limit" <RPS>)
                        .required(false)
                        .help("Requests per second")
                        .value_parser(clap::value_parser!(u32).range(1..=5))
                        .default_value("2"),
                )
                .arg(
                    arg!(-m --"max-urls" <COUNT>)
                        .required(false)
                        .help("Stop crawling once this many URLs are known")
                        .value_parser(clap::value_parser!(u64).range(1..))
                        .default_value("100"),
                )
                .arg(
                    arg!(--"forms-limit" <COUNT>)
                        .required(false)
                        .help("How many discovered pages to fetch for form extraction")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("20"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Request timeout in seconds")
                        .value_parser(clap::value_parser!(u64).range(1..))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"no-respect-robots")
                        .required(false)
                        .help("Ignore robots.txt Allow/Disallow rules")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"json")
                        .required(false)
                        .help("Print the full result as JSON")
                        .action(clap::ArgAction::SetTrue)
                        .conflicts_with("compact"),
                )
                .arg(
                    arg!(--"compact")
                        .required(false)
                        .help("Print a one-line summary")
                        .action(clap::ArgAction::SetTrue)
                        .conflicts_with("json"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                ),
        )
        .subcommand(
            command!("forms")
                .about("Extract forms and vulnerability indicators from a local HTML file")
                .arg(
                    arg!(<FILE>)
                        .required(true)
                        .help("Path to the HTML file")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-u --"page-url" <URL>)
                        .required(false)
                        .help("URL the page was served from, used to resolve form actions")
                        .value_parser(clap::value_parser!(Url))
                        .default_value("http://localhost/"),
                )
                .arg(
                    arg!(--"json")
                        .required(false)
                        .help("Print the forms as JSON")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
}
