//! epub-format-fix - repair EPUB markup and stylesheets

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use epubfix::cli::{init_tracing, print_error};
use epubfix::{Mode, RepairOptions, RepairSummary, run_repair};

#[derive(Parser)]
#[command(name = "epub-format-fix")]
#[command(version, about = "Repair EPUB structure and styling", long_about = None)]
#[command(after_help = "EXAMPLES:
    epub-format-fix book.epub -o fixed.epub
    epub-format-fix book.epub -o fixed.epub --aggressive --report report.json")]
struct Cli {
    /// Input EPUB file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output EPUB file
    #[arg(short, long, value_name = "OUTPUT")]
    output: PathBuf,

    /// Apply only safe fixes (default)
    #[arg(long, group = "mode")]
    safe: bool,

    /// Also strip font families
    #[arg(long, group = "mode")]
    aggressive: bool,

    /// Write a report (.json for JSON, anything else for text)
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

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

    let mode = if cli.aggressive {
        Mode::Aggressive
    } else {
        Mode::Safe
    };
    let mut options = RepairOptions::new(&cli.input, &cli.output).mode(mode);
    if let Some(report) = &cli.report {
        options = options.report(report);
    }

    match run_repair(&options) {
        Ok(summary) => {
            if !cli.quiet {
                print_summary(&summary);
                if let Some(report) = &cli.report {
                    println!("\nReport written to: {}", report.display());
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            print_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn print_summary(summary: &RepairSummary) {
    println!("\nRepair Summary:");
    println!("{}", "=".repeat(50));
    for (category, count) in &summary.counters {
        println!("  {category}: {count}");
    }
    println!("\nTotal files modified: {}", summary.total_files_modified);
}
