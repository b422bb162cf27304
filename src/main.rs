//! Point Ledger CLI
//!
//! Replays a CSV of charge/use operations and prints final balances, and
//! optionally every user's history.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- operations.csv > balances.csv
//! cargo run -- operations.csv --history
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity

use point_ledger::{LedgerError, LedgerReplay, PointService, Result};
use std::env;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::process;

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let mut args = env::args().skip(1);
    let input_path = args.next().ok_or(LedgerError::MissingArgument)?;

    let mut with_history = false;
    for arg in args {
        match arg.as_str() {
            "--history" => with_history = true,
            _ => return Err(LedgerError::UnknownArgument(arg)),
        }
    }

    let file = File::open(&input_path)?;
    let reader = BufReader::new(file);

    let mut replay = LedgerReplay::new(PointService::in_memory());
    let summary = replay.process_csv(reader)?;
    log::info!(
        "Replayed {}: {} applied, {} rejected, {} malformed",
        input_path,
        summary.applied,
        summary.rejected,
        summary.malformed
    );

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    replay.write_balances(&mut handle)?;

    if with_history {
        writeln!(handle)?;
        replay.write_histories(&mut handle)?;
    }

    Ok(())
}
