use clap::Parser;

use aria::cli::{self, Cli};
use aria::config::LoggingConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    aria::bootstrap::load_env_files();

    let logging = LoggingConfig::resolve()?;
    cli::init_tracing(&logging);

    cli::run(Cli::parse()).await
}
