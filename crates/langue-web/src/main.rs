//! LanguePro Web - HTTP front end for the language assistant.

mod helpers;
mod routes;
mod state;
mod templates;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, header},
    routing::{get, post},
};
use clap::Parser;
use langue_core::AppConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use state::AppState;

/// Largest accepted request body (uploads included)
const BODY_LIMIT: usize = 25 * 1024 * 1024;

#[derive(Parser, Debug)]
#[command(name = "langue-web")]
#[command(author, version, about = "LanguePro Web Server", long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "LLM_API_BASE")]
    api_base: Option<String>,

    /// API key for the LLM backend
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Chat model name
    #[arg(long, env = "LLM_MODEL")]
    model: Option<String>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// All routes with their middleware
fn app(state: Arc<AppState>) -> Router {
    Router::new()
        // Pages
        .route("/", get(routes::index))
        // JSON API
        .route("/api/features", get(routes::list_features))
        .route("/api/translate", post(routes::translate_text))
        .route("/api/chat", post(routes::create_chat))
        .route(
            "/api/chat/{session_id}",
            get(routes::chat_history)
                .post(routes::send_chat_message)
                .delete(routes::delete_chat),
        )
        // Binary responses
        .route("/api/speech", post(routes::synthesize_speech))
        .route("/api/caption", post(routes::caption_image))
        .route("/api/pdf/translate", post(routes::translate_pdf))
        .route("/api/pdf/audio", post(routes::pdf_to_audio))
        // Middleware
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store, max-age=0"),
        ))
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(path) = &args.config {
        AppConfig::from_file(path).context("Failed to load config file")?
    } else {
        AppConfig::load().context("Failed to load configuration")?
    };

    if let Some(api_base) = &args.api_base {
        config.llm.api_base.clone_from(api_base);
    }
    if args.api_key.is_some() {
        config.llm.api_key.clone_from(&args.api_key);
    }
    if let Some(model) = &args.model {
        config.llm.model.clone_from(model);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    // hyper and h2 are noisy below info
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default_level},hyper=info,h2=info")));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let config = load_config(&args)?;
    if config.llm.api_key.is_none() {
        tracing::warn!("No API key configured, LLM requests will be unauthenticated");
    }

    let state =
        Arc::new(AppState::new(config).context("Failed to initialize application state")?);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
