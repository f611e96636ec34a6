use anyhow::Context;
use clap::Parser;
use depot_tracker::{app, bootstrap};
use depot_tracker_configuration::{Configuration, Info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long, env = "DEPOT_TRACKER_CONFIG_PATH", default_value = "depot-tracker.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let info = Info::new(&args.config).context("failed to gather the configuration")?;
    let config = Configuration::load(&info).context("failed to load the configuration")?;

    bootstrap::logging::setup(&config);

    let running = app::start(&config).await?;

    tokio::signal::ctrl_c().await.context("failed to listen for shutdown signal")?;
    tracing::info!("shutting down");

    running.stop().await
}
