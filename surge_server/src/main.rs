use clap::Parser;
use std::sync::Arc;
use surge_server::{build_engine, router, AppState, ServerArgs};
use surge_shared::load_game_config;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = ServerArgs::parse();

    let config = Arc::new(load_game_config(args.game_config.as_deref())?);
    info!(
        reels = config.reels(),
        rows = config.rows(),
        paylines = config.paylines().len(),
        "game config loaded"
    );
    let engine = build_engine(&args, config.clone())?;
    if let Some(hash) = engine.server_seed_hash() {
        info!(server_seed_hash = %hash, "provably-fair engine ready");
    }
    info!(mode = ?args.engine_mode, "engine selected");

    let state = Arc::new(
        AppState::new(config, engine, args.initial_balance, args.api_key.clone())
            .with_engine_timeout(args.engine_timeout()),
    );
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&args.bind).await?;
    info!("listening on {}", args.bind);
    axum::serve(listener, app).await?;
    Ok(())
}
