//! # receiptsync command-line entry point
//!
//! ```text
//! main()
//!   │
//!   ├─> Parse CLI arguments (clap)
//!   ├─> Initialize logging (console + rotating files)
//!   └─> Create Tokio runtime and execute the command
//! ```

#![warn(clippy::all, rust_2018_idioms)]
#![expect(clippy::print_stdout)] // CLI output goes to stdout

mod cli;

use anyhow::Result;
use clap::Parser as _;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Logging is best-effort: a read-only data dir should not block the CLI
    if let Err(e) = receiptsync::logging::init() {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_max_level(tracing::Level::WARN)
            .init();
        tracing::warn!("File logging unavailable: {e:#}");
    }

    tokio::runtime::Runtime::new()?.block_on(cli::run(cli))
}
