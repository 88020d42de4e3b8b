//! Operator command-line interface.

pub mod commands;
pub mod context;
pub mod output;
pub mod types;

pub use context::{load_config, AppContext};
pub use types::{Cli, Commands};

/// Print a command failure and exit with status 1.
pub fn handle_error(err: &anyhow::Error, json: bool) -> ! {
    if json {
        let body = serde_json::json!({ "error": format!("{err:#}") });
        println!("{body}");
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
