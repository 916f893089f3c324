mod cli;
mod config;
mod openai;
mod prompt;
mod report;
mod shodan;
mod translate;

pub const USER_AGENT: &str = concat!("shodan-ai/", env!("CARGO_PKG_VERSION"));

use std::process::ExitCode;

use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(cli.log_filter(rust_log.as_deref())?)
        .init();

    Ok(cli::run(cli).await.unwrap_or_else(|e| {
        eprintln!("error: {e}");
        ExitCode::FAILURE
    }))
}
