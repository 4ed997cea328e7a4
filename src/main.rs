//! carprice - Main Entry Point
//!
//! Training pipeline and prediction server for used car prices.

use clap::Parser;
use carprice::cli::{cmd_info, cmd_predict, cmd_serve, cmd_train, load_config, Cli, Commands};
use carprice::inference::CarInput;
use carprice::server::ServerConfig;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carprice=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Train { data, artifacts, threshold } => {
            if let Some(data) = data {
                config = config.with_data_path(data);
            }
            if let Some(dir) = artifacts {
                config = config.with_artifacts_dir(dir);
            }
            if let Some(threshold) = threshold {
                config = config.with_acceptance_threshold(threshold);
            }
            config.validate()?;
            cmd_train(config).map(|_| ())
        }
        Commands::Predict { name, company, fuel_type, year, kms_driven, artifacts } => {
            if let Some(dir) = artifacts {
                config = config.with_artifacts_dir(dir);
            }
            let input = CarInput { name, company, fuel_type, year, kms_driven };
            cmd_predict(&config, input).map(|_| ())
        }
        Commands::Info { data } => {
            let path = data.unwrap_or_else(|| config.data.source_path.clone());
            cmd_info(&path)
        }
        Commands::Serve { port, host, catalog } => {
            let mut server = ServerConfig::from_app_config(&config).with_address(host, port);
            if let Some(catalog) = catalog {
                server.catalog_path = catalog;
            }
            // reqwest::blocking panics inside a runtime; only serving gets one
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?
                .block_on(cmd_serve(server))
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Command failed");
    }
    result
}
