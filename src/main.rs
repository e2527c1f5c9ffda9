use clap::Parser;
use env_logger::Env;
use log::{error, info};

mod batch;
mod cli;
mod error;
mod export;
mod io;
mod polygonize;
mod sieve;

use cli::Args;
use error::Result;

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logger
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    info!("=== GeoTIFF Vectorizer ===");

    if args.threshold < 1 {
        return Err(error::VectorizeError::InvalidThreshold(args.threshold));
    }

    let summary = batch::run(&args)?;

    info!(
        "=== Done: {} succeeded, {} failed ===",
        summary.succeeded, summary.failed
    );

    if summary.failed > 0 {
        error!("{} input(s) failed to process", summary.failed);
        std::process::exit(1);
    }
    Ok(())
}
