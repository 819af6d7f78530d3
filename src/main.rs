//! Rust Transfer Engine CLI
//!
//! Applies the transfers of one CSV file to the accounts of another.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- accounts.csv transfers.csv > final.csv
//! cargo run -- --strategy lock accounts.csv transfers.csv > final.csv
//! cargo run -- --strategy optimistic --max-retries 5 --outcomes outcomes.csv accounts.csv transfers.csv
//! RUST_LOG=debug cargo run -- --log-json accounts.csv transfers.csv > final.csv
//! ```
//!
//! The final account states go to stdout, logs go to stderr.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, unreadable accounts file, etc.)

use rust_transfer_engine::cli;
use rust_transfer_engine::logging;
use rust_transfer_engine::TransferPipeline;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::process;
use tracing::error;

fn main() {
    let args = cli::parse_args();

    if let Err(e) = logging::init_logging(&args.log_level, args.log_json) {
        eprintln!("Error: failed to install logger: {}", e);
    }

    let pipeline = TransferPipeline::new(
        args.strategy,
        args.to_batch_config(),
        args.to_retry_policy(),
    );

    let mut outcomes = match &args.outcomes_file {
        Some(path) => match File::create(path) {
            Ok(file) => Some(BufWriter::new(file)),
            Err(e) => {
                error!(path = %path.display(), error = %e, "cannot create outcomes file");
                process::exit(1);
            }
        },
        None => None,
    };

    let mut output = std::io::stdout();
    let result = pipeline.process(
        &args.accounts_file,
        &args.transfers_file,
        &mut output,
        outcomes.as_mut().map(|w| w as &mut dyn Write),
    );

    if let Err(e) = result {
        error!(error = %e, "transfer processing failed");
        process::exit(1);
    }
}
