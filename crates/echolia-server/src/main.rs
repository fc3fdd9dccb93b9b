//! Echolia inference gateway binary.
//!
//! # Usage
//!
//! ```bash
//! JWT_SECRET=... GEMINI_API_KEY=... echolia-server --bind 0.0.0.0:8000
//! ```

use clap::Parser;
use echolia_server::{router, AppState, Config};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Echolia E2EE inference gateway
#[derive(Parser, Debug)]
#[command(name = "echolia-server")]
#[command(about = "Echolia end-to-end encrypted inference gateway")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:8000")]
    bind: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Echolia inference gateway starting");

    let config = Config::from_env()?;
    let state = AppState::from_config(&config)?;

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&args.bind).await?;
    tracing::info!("Gateway listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
