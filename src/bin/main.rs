use clap::Parser;
use duplex_bridge::config::{self, BridgeConfig, BridgeSettings};
use duplex_bridge::{Bridge, ConfigError, pump};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Copy a file through a buffered duplex bridge
#[derive(Parser)]
#[command(name = "duplex-bridge")]
#[command(version)]
#[command(about = "Copy a file through a buffered duplex bridge")]
struct Cli {
    /// TOML file with bridge settings; command line options take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// File to read from
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// File to write to (created or truncated)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pending bytes above which buffered writes are flushed
    #[arg(long)]
    writable_high_water_mark: Option<usize>,

    /// Size of each read request in bytes
    #[arg(long)]
    readable_high_water_mark: Option<usize>,
}

impl Cli {
    fn settings(&self) -> BridgeSettings {
        BridgeSettings {
            read_file_name: self.input.clone(),
            write_file_name: self.output.clone(),
            writable_high_water_mark: self.writable_high_water_mark,
            readable_high_water_mark: self.readable_high_water_mark,
        }
    }

    fn resolve_config(&self) -> Result<BridgeConfig, ConfigError> {
        let file_settings = match &self.config {
            Some(path) => Some(config::load_settings(path)?),
            None => None,
        };
        let merged = config::merge_settings(file_settings, Some(self.settings()))
            .unwrap_or_default();
        BridgeConfig::try_from(merged)
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = cli.resolve_config().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(2);
    });

    let mut bridge = Bridge::new(config).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(2);
    });

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!(target: "duplex_bridge::pump", "Interrupted, shutting down");
            token.cancel();
        }
    });

    match pump(&mut bridge, cancel).await {
        Ok(stats) => {
            eprintln!(
                "Copied {} bytes ({} chunks, {} flushes)",
                stats.bytes_written, stats.chunks, stats.flushes
            );
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
