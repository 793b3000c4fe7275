use crate::app::ConfigOptions;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments of the `ethapp` binary.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "ethapp",
    version,
    about = "Ethereum node container with block import and export"
)]
pub struct Cli {
    /// Alternative config file, used instead of <data-dir>/config.toml
    #[arg(short = 'C', long = "Config", value_name = "FILE")]
    pub alt_config: Option<PathBuf>,

    /// Single configuration parameter (<section>.<key>=<value>), may be repeated
    #[arg(short = 'c', value_name = "PARAM=VALUE", action = ArgAction::Append)]
    pub config_values: Vec<String>,

    /// Data directory
    #[arg(short = 'd', long = "data-dir", value_name = "DIR", env = "ETHAPP_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log levels per module, e.g. ":info,chain:debug"
    #[arg(short = 'l', long = "log-config", value_name = "SPEC", env = "ETHAPP_LOG_CONFIG")]
    pub log_config: Option<String>,

    /// Emit logs as JSON
    #[arg(long = "log-json")]
    pub log_json: bool,

    /// Single bootstrap node as enode://pubkey@host:port
    #[arg(short = 'b', long = "bootstrap-node", value_name = "ENODE")]
    pub bootstrap_node: Option<String>,

    /// Percent of CPU used for mining; 0 disables mining
    #[arg(short = 'm', long = "mining-pct", value_name = "PCT", default_value_t = 0)]
    pub mining_pct: u32,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn config_options(&self) -> ConfigOptions {
        ConfigOptions {
            alt_config: self.alt_config.clone(),
            params: self.config_values.clone(),
            data_dir: self.data_dir.clone(),
            bootstrap_node: self.bootstrap_node.clone(),
            mining_pct: self.mining_pct,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the node and run until a termination signal arrives
    Run(RunArgs),
    /// Print the resolved configuration
    Config,
    /// Import the blocks of a block test into a fresh in-memory chain
    Blocktest(BlocktestArgs),
    /// Write raw block records of the canonical chain to a file
    Export(ExportArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Development mode: tag the client version with the login name and
    /// abort the process on any panic
    #[arg(long)]
    pub dev: bool,

    /// Do not dial any peers
    #[arg(long)]
    pub nodial: bool,

    /// Use low-difficulty consensus parameters
    #[arg(long)]
    pub fake: bool,
}

#[derive(Args, Debug, Clone)]
pub struct BlocktestArgs {
    /// Block test file (JSON)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Name of the test inside the file
    #[arg(value_name = "NAME")]
    pub name: String,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// First block to export (default: 0)
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub from: Option<i64>,

    /// Last block to export (default: current head)
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub to: Option<i64>,

    /// Output file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}
