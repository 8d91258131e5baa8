//! epub-upgrade - detect the EPUB version and upgrade EPUB 2 to EPUB 3

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use epubfix::cli::{init_tracing, print_error};
use epubfix::upgrade::DEFAULT_TARGET_VERSION;
use epubfix::{UpgradeOptions, UpgradeOutcome, UpgradeStatus, run_upgrade};

#[derive(Parser)]
#[command(name = "epub-upgrade")]
#[command(version, about = "Detect EPUB version and upgrade EPUB 2 to EPUB 3", long_about = None)]
#[command(after_help = "EXAMPLES:
    epub-upgrade old.epub -o new.epub
    epub-upgrade old.epub -o new.epub --dry-run
    epub-upgrade book.epub -o book3.epub --force-rewrite --report upgrade.json")]
struct Cli {
    /// Input EPUB file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output EPUB file
    #[arg(short, long, value_name = "OUTPUT")]
    output: PathBuf,

    /// Version written to the package
    #[arg(long, default_value = DEFAULT_TARGET_VERSION)]
    target_version: String,

    /// Write a JSON report
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// Upgrade even if the book is already EPUB 3
    #[arg(long)]
    force_rewrite: bool,

    /// Detect and report only, write no output
    #[arg(long)]
    dry_run: bool,

    /// Log more (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress the summary
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut options = UpgradeOptions::new(&cli.input, &cli.output)
        .target_version(&cli.target_version)
        .force_rewrite(cli.force_rewrite)
        .dry_run(cli.dry_run);
    if let Some(report) = &cli.report {
        options = options.report(report);
    }

    match run_upgrade(&options) {
        Ok(outcome) => {
            if !cli.quiet {
                print_outcome(&cli, &outcome);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            print_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn print_outcome(cli: &Cli, outcome: &UpgradeOutcome) {
    if outcome.status == UpgradeStatus::DryRun {
        println!("\nEPUB Version Detection (Dry Run)");
        println!("{}", "=".repeat(50));
        println!("Input file: {}", cli.input.display());
        println!("Detected version: {}", outcome.version);
        if outcome.version.is_epub3() {
            println!("Status: Already EPUB 3, no upgrade needed");
        } else {
            println!("Status: Would upgrade to EPUB {}", cli.target_version);
        }
    } else {
        outcome.report.print_summary();
    }

    if let Some(report) = &cli.report {
        println!("\nReport written to: {}", report.display());
    }
}
