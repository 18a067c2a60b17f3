mod cleanup_loop;
mod config;
mod serve;

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use imgstage_core::ImageId;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "imgstage", version, about = "Staged image store")]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, global = true, default_value = "imgstage.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the configured store over JSON-RPC
    Serve {
        /// Override server.port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Stage an image from a file
    Save { id: String, file: PathBuf },
    /// Fetch an image (staged or committed)
    Load {
        id: String,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Move a staged image to committed storage
    Commit { id: String },
    /// Remove staged images older than the TTL
    Cleanup {
        /// Override cleanup.ttl_secs
        #[arg(long)]
        ttl_secs: Option<u64>,
    },
    /// Print the staged ids and the last cleanup time as JSON
    Staging,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load(&cli.config)?;

    match cli.command {
        Command::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            serve::run(&config).await
        }
        Command::Save { id, file } => {
            let data = tokio::fs::read(&file).await?;
            let store = config.persistent_store("save")?.build()?;
            store.save(&ImageId::new(id), &data).await?;
            Ok(())
        }
        Command::Load { id, out } => {
            let store = config.persistent_store("load")?.build()?;
            let data = store.load(&ImageId::new(id)).await?;
            match out {
                Some(path) => tokio::fs::write(path, &data).await?,
                None => {
                    let mut stdout = tokio::io::stdout();
                    stdout.write_all(&data).await?;
                    stdout.flush().await?;
                }
            }
            Ok(())
        }
        Command::Commit { id } => {
            let store = config.persistent_store("commit")?.build()?;
            store.commit(&ImageId::new(id)).await?;
            Ok(())
        }
        Command::Cleanup { ttl_secs } => {
            let ttl = ttl_secs
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.cleanup.ttl());
            let store = config.persistent_store("cleanup")?.build()?;

            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_interrupt.cancel();
                }
            });

            store.cleanup(&cancel, ttl).await?;
            Ok(())
        }
        Command::Staging => {
            let store = config.persistent_store("staging")?.build()?;
            let snapshot = store.get_staging_images().await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["imgstage", "staging", "--config", "other.toml"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("other.toml"));
        assert!(matches!(cli.command, Command::Staging));
    }

    #[test]
    fn cleanup_ttl_override() {
        let cli = Cli::try_parse_from(["imgstage", "cleanup", "--ttl-secs", "60"]).unwrap();
        assert!(matches!(cli.command, Command::Cleanup { ttl_secs: Some(60) }));
    }
}
