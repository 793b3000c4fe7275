//! `ethapp` command-line entry point.

use anyhow::Result;
use clap::Parser;
use ethapp_node::app::build_config;
use ethapp_node::args::{Cli, Command};
use ethapp_node::services::default_catalog;
use ethapp_node::{commands, logging};
use tracing::error;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.log_config.as_deref(), cli.log_json)?;

    let config = match build_config(&cli.config_options(), &default_catalog()) {
        Ok(config) => config,
        Err(err) => {
            error!(target: "config", error = %err, "invalid configuration");
            return Err(err.into());
        }
    };

    match &cli.command {
        Command::Run(args) => commands::run(config, args).await,
        Command::Config => commands::show_config(&config),
        Command::Blocktest(args) => commands::blocktest(config, &args.file, &args.name).await,
        Command::Export(args) => commands::export(config, args).await,
    }
}
