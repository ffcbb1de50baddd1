//! azsite — provision an Azure App Service plan and Web App, show the site,
//! then delete everything once the user presses Enter.
//!
//! Credentials come from `AZURE_TENANT_ID`, `AZURE_CLIENT_ID`,
//! `AZURE_CLIENT_SECRET` and `AZURE_SUBSCRIPTION_ID`, optionally loaded from
//! an environment file first.
//!
//! # Usage
//!
//! ```text
//! azsite --env-file .env --config azsite.toml
//! ```

use std::io;
use std::path::PathBuf;

use azsite_arm::ArmClient;
use azsite_core::{Credentials, SampleConfig};
use clap::Parser;
use tracing::{debug, info};

mod example;

#[derive(Parser)]
#[command(
    name = "azsite",
    about = "Provision an App Service plan and Web App, then tear them down",
    version
)]
struct Cli {
    /// Environment file loaded before reading credentials, relative to the
    /// working directory. Variables already set in the process take precedence.
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// TOML file overriding region, resource names, and plan SKU.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Delete the resources without waiting for Enter.
    #[arg(short, long)]
    yes: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("azsite=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match dotenv::from_path(&cli.env_file) {
        Ok(()) => debug!(path = %cli.env_file.display(), "environment file loaded"),
        Err(e) => debug!(path = %cli.env_file.display(), error = %e, "environment file not loaded"),
    }

    let config = match &cli.config {
        Some(path) => SampleConfig::from_file(path)?,
        None => SampleConfig::generate(),
    };
    info!(
        group = %config.group_name,
        site = %config.site_name,
        location = %config.location,
        "run configured"
    );

    let credentials = Credentials::from_env();
    let client = ArmClient::new(credentials)?;
    info!(subscription = client.subscription_id(), "management client ready");

    let mut stdin = io::stdin().lock();
    let input = if cli.yes { None } else { Some(&mut stdin) };
    let mut stdout = io::stdout().lock();

    example::run_example(&client, &config, input, &mut stdout).await
}
