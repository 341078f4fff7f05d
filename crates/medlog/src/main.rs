//! `medlogd` - HTTP service and CLI for medlog
//!
//! This binary runs the telemetry service and inspects its configuration.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::Context;
use clap::Parser;

use medlog::cli::{Cli, Command, ConfigCommand};
use medlog::{init_logging, server, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    match cli.command {
        Command::Serve(serve_cmd) => {
            let mut config = Config::load_from(cli.config.clone())
                .context("failed to load configuration")?;
            serve_cmd.apply(&mut config);
            config.validate().context("invalid command-line overrides")?;
            server::serve(&config).await.context("server failed")?;
        }
        Command::Config(config_cmd) => handle_config(cli.config, config_cmd)?,
    }

    Ok(())
}

fn handle_config(path: Option<std::path::PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(path).context("failed to load configuration")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Bind address:       {}", config.server.bind_address);
                println!("  Port:               {}", config.server.port);
                println!(
                    "  Static dir:         {}",
                    config
                        .server
                        .static_dir
                        .as_ref()
                        .map_or_else(|| "(none)".to_string(), |p| p.display().to_string())
                );
                println!();
                println!("[Store]");
                println!("  Capacity:           {}", config.store.capacity);
                println!("  Alert limit:        {}", config.store.alert_limit);
                println!("  Seed demo data:     {}", config.store.seed_demo_data);
                println!();
                println!("[Ingest]");
                println!("  Default device id:  {}", config.ingest.default_device_id);
            }
        }
        ConfigCommand::Path => {
            let path = path.unwrap_or_else(Config::default_config_path);
            println!("{}", path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.or(path).unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
