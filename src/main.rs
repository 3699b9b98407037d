use anyhow::{Context, Result};
use clap::Parser;
use star_studio::{create_router, AppState, Config, OpenAiFeedback, ReviewService};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "star-studio")]
#[command(about = "Behavioral interview practice server")]
struct Args {
    /// Config file path, without extension
    #[arg(short, long, default_value = "config/star-studio")]
    config: String,

    /// Override the HTTP bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the HTTP port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    let store = star_studio::store::connect(&cfg.persistence)?;
    info!("Persistence backend: {:?}", cfg.persistence.backend);

    let generator = OpenAiFeedback::from_config(&cfg.feedback)?;
    if !generator.is_configured() {
        warn!(
            "{} is not set; reviews will use fallback feedback",
            cfg.feedback.api_key_env
        );
    }

    let review = Arc::new(ReviewService::new(Arc::clone(&store), Arc::new(generator)));
    let state = AppState::new(store, review, cfg.recording.clone());
    let app = create_router(state);

    let bind = args.bind.unwrap_or(cfg.service.http.bind);
    let port = args.port.unwrap_or(cfg.service.http.port);
    let addr = format!("{}:{}", bind, port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
