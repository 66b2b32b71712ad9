//! The `depot` command line.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use depot_core::{index::git::init_index_repository, IndexConfig};
use depot_server::{run_server, Config, DEFAULT_CONFIG_PATH};

#[derive(Parser)]
#[command(name = "depot")]
#[command(about = "An alternate Cargo registry with pluggable index and storage")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the registry server
    Serve {
        /// Configuration file
        #[arg(long, env = "DEPOT_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Override `general.bind_address`
        #[arg(long)]
        bind: Option<String>,
    },

    /// Create a new index repository with its `config.json`
    InitIndex {
        /// Directory of the new repository
        #[arg(long)]
        path: PathBuf,

        /// Download URL template for crate archives
        #[arg(long)]
        dl: String,

        /// Root URL of the registry API
        #[arg(long)]
        api: Option<String>,
    },

    /// Validate a configuration file and print the effective settings
    CheckConfig {
        /// Configuration file
        #[arg(long, env = "DEPOT_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
}

fn load_config(path: &PathBuf) -> Result<Config> {
    let config = Config::load_or_default(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, bind } => {
            let mut config = load_config(&config)?;
            if let Some(bind) = bind {
                config.general.bind_address = bind;
                config.validate().context("Invalid bind address")?;
            }

            let _guard = depot_logging::init_subscriber(&config.logging.clone().with_env_overrides())
                .context("Failed to initialise logging")?;
            run_server(config).await
        }
        Commands::InitIndex { path, dl, api } => {
            let config = IndexConfig { dl, api };
            init_index_repository(&path, &config).with_context(|| {
                format!("Failed to create index repository at {}", path.display())
            })?;
            println!("Created index repository at {}", path.display());
            Ok(())
        }
        Commands::CheckConfig { config } => {
            let config = load_config(&config)?;
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}
