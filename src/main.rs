use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use geostamp::config::Config;
use geostamp::web::{self, State};

#[derive(Parser, Debug)]
#[command(
    name = "geostamp",
    version,
    about = "HTTP service that embeds GPS coordinates into image EXIF metadata"
)]
struct Cli {
    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Override the configured bind address
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,

    /// Override the configured port
    #[arg(long, value_name = "PORT")]
    port: Option<u16>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[async_std::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    // Load config and apply CLI overrides
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    if config.auth.api_key.is_none() {
        log::warn!("No API key configured; the service accepts unauthenticated requests");
    }
    log::info!(
        "Payload ceiling: {} bytes, output quality: {}",
        config.limits.max_payload_bytes,
        geostamp::pipeline::JPEG_QUALITY
    );

    let address = config.server.bind_address.clone();
    let port = config.server.port;

    let state = State {
        config: Arc::new(config),
    };
    let mut app = tide::with_state(state);
    web::mount(&mut app);

    log::info!("Listening on {address}:{port}");
    app.listen((address.as_str(), port)).await?;

    Ok(())
}
