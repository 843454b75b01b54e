//! # MediPOS Terminal Entry Point
//!
//! ```text
//! medipos-terminal [path/to/client.toml]
//! ```
//!
//! The actual setup is in lib.rs for better testability.

use std::path::PathBuf;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);

    match medipos_terminal_lib::run(config_path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
