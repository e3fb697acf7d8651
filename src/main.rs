//! tig - a minimal local version control system.
//!
//! This is the command-line entry point.

use std::process::ExitCode;

fn main() -> ExitCode {
    // Set RUST_LOG=debug for verbose logging.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match tig::cli::parse(&args) {
        Ok(command) => tig::cli::run(command),
        Err(usage) => {
            eprintln!("{usage}");
            ExitCode::FAILURE
        }
    }
}
