//! Readmit Insight - Hospital readmission analysis from the command line
//!
//! Loads an HRRP-style CSV, cleans it, prints exploratory statistics, writes
//! charts and trains two baseline classifiers for 30-day readmission.

use anyhow::Result;
use clap::Parser;
use readmit_insight::{pipeline, Args};
use std::time::Instant;

/// Logs go to stderr; with `--json` nothing is initialised so stdout holds
/// only the report.
fn init_logging(level: &str, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.json);

    let json_output = args.json;
    let config = args.into_config()?;

    let start = Instant::now();
    let report = pipeline::run(&config)?;

    if json_output {
        println!("{}", report.to_json()?);
    } else {
        report.print_console();
        println!(
            "\nReport written to {} ({:.2}s)",
            config.report_path().display(),
            start.elapsed().as_secs_f64()
        );
    }

    Ok(())
}
