use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use quest_explorer::{AppState, config::ExploreConfig, create_router, models::TransportMode};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(author, version, about = "Quest explore service: enclosing circles and route metrics")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8080")]
    addr: SocketAddr,

    /// Quest catalogue JSON (overrides QUESTS_JSON)
    #[arg(long)]
    quests: Option<PathBuf>,

    /// Transport mode for the initial metrics (overrides DEFAULT_TRANSPORT_MODE)
    #[arg(long)]
    mode: Option<TransportMode>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quest_explorer=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut config = ExploreConfig::from_env()?;
    if let Some(path) = args.quests {
        config.quests_path = path;
    }
    if let Some(mode) = args.mode {
        config.transport_mode = mode;
    }

    let state = AppState::from_config(&config)?;
    let controller = state.controller.clone();
    tokio::spawn(async move {
        controller.mount().await;
    });

    let app = create_router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    tracing::info!("starting quest explorer on http://{}", args.addr);
    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
