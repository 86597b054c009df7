use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use paper_xray::analysis::{AnalysisClient, GeminiTransport};
use paper_xray::config::XrayConfig;
use paper_xray::credentials::{CredentialState, FileCredentialStore};
use paper_xray::logging::{cleanup_old_logs, init_logging, log_system_info};
use paper_xray::tui;

#[derive(Parser)]
#[command(name = "xray")]
#[command(version)]
#[command(about = "Terminal PDF reader that explains selected equations with an LLM")]
struct Cli {
    /// PDF to open on startup
    pdf: Option<PathBuf>,

    /// Config file (defaults to the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long)]
    log_level: Option<String>,

    /// Log to stderr instead of the log directory
    #[arg(long)]
    no_file_log: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = XrayConfig::resolve(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.logging.level = level.to_lowercase();
    }
    if cli.no_file_log {
        config.logging.file_logging = false;
    }

    let logging = config.logging.to_logging_config();
    let _guard = init_logging(&logging)?;
    log_system_info();
    if let Err(e) = cleanup_old_logs(&logging) {
        warn!("Log cleanup failed: {}", e);
    }

    let store = FileCredentialStore::default_location()?;
    let credentials = CredentialState::load(&store, &config.analysis.api_key_env)?;

    let transport = GeminiTransport::new(&config.analysis)?;
    let client = AnalysisClient::new(transport, config.analysis.model.clone());
    info!("Model: {} at {}", config.analysis.model, config.analysis.endpoint);

    tui::run(&config, client, Box::new(store), credentials, cli.pdf).await
}
