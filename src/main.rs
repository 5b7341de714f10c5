mod actor;
mod cli;
mod clock;
mod config;
mod error;
mod lifecycle;
mod model;
mod policy;
mod registry;
mod store;
mod sync;

use std::process;

use tracing_subscriber::EnvFilter;

use config::Config;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = cli::run(&config) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
