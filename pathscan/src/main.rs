use colored::Colorize;
use pathscan::commands::command_argument_builder;
use pathscan::handlers::{ScanArgs, handle_forms, handle_scan, init_tracing, print_banner};

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");
    let verbosity = chosen_command.get_count("verbose");

    init_tracing(verbosity, quiet);

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    let outcome = match chosen_command.subcommand() {
        Some(("scan", sub_matches)) => handle_scan(&ScanArgs::from_matches(sub_matches), quiet).await,
        Some(("forms", sub_matches)) => handle_forms(sub_matches),
        // No subcommand provided, just show the banner
        None => return,
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if let Err(e) = outcome {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}
