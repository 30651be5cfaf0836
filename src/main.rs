//! Reattach detached main thread samples of simpleperf traces to their root

#![deny(missing_docs)]

mod path;
mod repair;

use clap::Parser;
use std::{error::Error, path::PathBuf, process::ExitCode};

/// Fix main thread samples of a simpleperf trace whose call stack does not
/// reach the program's entry point
///
/// The stack walk performed by simpleperf sometimes stops partway up. This
/// tool completes such call stacks with frames from neighboring main thread
/// samples that did reach the entry point. The fixed trace is written next to
/// the input, with a "-fixed" suffix before the file extension.
///
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// simpleperf trace, as produced by `report_sample.py --protobuf`
    source: PathBuf,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let destination = path::destination_path(&args.source);
    println!(
        "Copying {} to {}",
        args.source.display(),
        destination.display()
    );
    match repair::fix_detached_main_samples(&args.source, &destination) {
        Ok(report) => {
            log::debug!("Trace version {}", report.version);
            println!(
                "Done fixing trace, fixed {} / {} main thread samples",
                report.stats.repaired_samples, report.stats.main_thread_samples
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprint!("Error: {e}");
            let mut source = e.source();
            while let Some(e) = source {
                eprint!(" ({e})");
                source = e.source();
            }
            eprintln!();
            ExitCode::FAILURE
        }
    }
}
