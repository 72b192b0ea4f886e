//! CLI tool for reconstructing MBP-10 snapshots from an MBO CSV file.
//!
//! # Usage
//!
//! ```bash
//! cargo run --release --bin reconstruct_mbp10 -- data/mbo.csv > mbp10.csv
//!
//! # Per-event trace on stderr
//! RUST_LOG=debug cargo run --release --bin reconstruct_mbp10 -- data/mbo.csv > mbp10.csv
//! ```
//!
//! Snapshots go to stdout, logs to stderr. Exit status is 0 on success, 1 on
//! any I/O or parse failure and 2 on a usage error.

use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use mbo_mbp_reconstructor::{
    replay_file, BookObserver, CsvSnapshotWriter, LogObserver, NoopObserver, ReplayConfig,
    ReplaySummary, Result,
};

const EXIT_FAILURE: u8 = 1;
const EXIT_USAGE: u8 = 2;

enum Command {
    Run(PathBuf),
    Help,
}

fn parse_args() -> std::result::Result<Command, String> {
    let args: Vec<String> = env::args().skip(1).collect();

    match args.as_slice() {
        [flag] if flag == "--help" || flag == "-h" => Ok(Command::Help),
        [flag] if flag.starts_with('-') => Err(format!("Unknown option: {flag}")),
        [input] => Ok(Command::Run(PathBuf::from(input))),
        [] => Err("Input path is required".to_string()),
        _ => Err(format!("Expected one argument, got {}", args.len())),
    }
}

fn print_help() {
    eprintln!(
        r#"
Reconstruct MBP-10 snapshots from MBO events

USAGE:
    reconstruct_mbp10 <INPUT.csv>

Writes one MBP-10 CSV row per visible book change to stdout.
Set RUST_LOG=debug for a per-event trace on stderr.
"#
    );
}

fn run<O: BookObserver>(input: &Path, observer: O) -> Result<ReplaySummary> {
    let stdout = io::stdout();
    let mut writer = CsvSnapshotWriter::new(stdout.lock())?;
    replay_file(input, &ReplayConfig::default(), observer, &mut writer)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let input = match parse_args() {
        Ok(Command::Run(input)) => input,
        Ok(Command::Help) => {
            print_help();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Usage: reconstruct_mbp10 <INPUT.csv>");
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let result = if log::log_enabled!(log::Level::Debug) {
        run(&input, LogObserver)
    } else {
        run(&input, NoopObserver)
    };

    match result {
        Ok(summary) => {
            log::info!(
                "Wrote {} rows from {} events in {:.2}s ({:.0} events/s)",
                summary.rows_written,
                summary.events_read,
                summary.elapsed_secs,
                summary.events_per_sec
            );
            match summary.to_json() {
                Ok(json) => log::info!("Summary: {json}"),
                Err(e) => log::warn!("Failed to serialize summary: {e}"),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
