use clap::Parser;
use pairkey::config;
use pairkey::console;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pairkey")]
#[command(about = "Short-lived, single-use pairing keys for device handshakes")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "pairkey.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = config::Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config from {:?}: {}", cli.config, e);
        eprintln!("Using default configuration");
        config::Config::default()
    });

    // Logs go to stderr; stdout carries console responses
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("pairkey v{}", env!("CARGO_PKG_VERSION"));

    let dictionary = config.pairing.dictionary()?;
    let symbols = dictionary.symbol_count();
    let store = Arc::new(config.pairing.build_store_with(dictionary)?);
    info!(
        "Key store ready: {} chars from a {}-symbol dictionary, ttl {}s, max {} attempts",
        store.key_length(),
        symbols,
        store.ttl().as_secs(),
        store.max_attempts()
    );

    // Blocking stdin reads live on their own thread so Ctrl+C is not held up
    let lines = console::spawn_line_reader(std::io::BufReader::new(std::io::stdin()))?;
    let stdout = tokio::io::stdout();
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    info!("Console running. Ctrl+D, Ctrl+C or `quit` to stop.");
    if let Err(e) = console::serve(store, lines, stdout, shutdown).await {
        error!("Console failed: {}", e);
        return Err(e);
    }
    info!("Shutting down...");

    Ok(())
}
