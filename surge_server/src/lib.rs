use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use surge_core::EngineConfig;
use surge_shared::{
    ApiError, BalanceResponse, ConfigSummary, ErrorResponse, PlayRequest, PlayResponse,
    SetBalanceRequest, VerifyResponse,
};
use tokio::sync::Mutex;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

pub mod engine;

use engine::{FairEngine, MockEngine, ProcessEngine, SpinEngine, DEFAULT_ENGINE_TIMEOUT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EngineMode {
    /// Entropy-seeded spins, no proof.
    Mock,
    /// HMAC provably-fair spins.
    Fair,
    /// Delegate to an external engine process.
    Process,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "surge-server", about = "HTTP backend for the Market Surge slot")]
pub struct ServerArgs {
    #[arg(long, env = "BIND", default_value = "127.0.0.1:8080")]
    pub bind: String,
    #[arg(long, value_enum, env = "ENGINE_MODE", default_value_t = EngineMode::Fair)]
    pub engine_mode: EngineMode,
    /// Command line used in `process` mode.
    #[arg(long, env = "ENGINE_COMMAND", default_value = "surge_cli")]
    pub engine_command: String,
    /// Secret for `fair` mode; random when unset.
    #[arg(long, env = "SERVER_SEED")]
    pub server_seed: Option<String>,
    #[arg(long, env = "CLIENT_SEED", default_value = "market-surge")]
    pub client_seed: String,
    #[arg(long, env = "INITIAL_BALANCE", default_value_t = 1000.0)]
    pub initial_balance: f64,
    #[arg(long, env = "API_KEY", default_value = "dev-key")]
    pub api_key: String,
    /// JSON game config; the built-in Market Surge game when unset.
    #[arg(long, env = "GAME_CONFIG")]
    pub game_config: Option<PathBuf>,
    /// Upper bound for one engine call; the bet is refunded when it passes.
    #[arg(long, env = "ENGINE_TIMEOUT_MS", default_value_t = 5000)]
    pub engine_timeout_ms: u64,
}

impl ServerArgs {
    pub fn engine_timeout(&self) -> Duration {
        Duration::from_millis(self.engine_timeout_ms)
    }
}

pub fn build_engine(
    args: &ServerArgs,
    config: Arc<EngineConfig>,
) -> anyhow::Result<Arc<dyn SpinEngine>> {
    let engine: Arc<dyn SpinEngine> = match args.engine_mode {
        EngineMode::Mock => Arc::new(MockEngine::new(config)),
        EngineMode::Fair => {
            let seed = args
                .server_seed
                .clone()
                .unwrap_or_else(FairEngine::random_seed);
            Arc::new(FairEngine::new(config, seed, args.client_seed.clone()))
        }
        EngineMode::Process => Arc::new(
            ProcessEngine::from_command_line(config, &args.engine_command)?
                .with_game_config(args.game_config.clone())
                .with_timeout(args.engine_timeout()),
        ),
    };
    Ok(engine)
}

pub struct AppState {
    pub config: Arc<EngineConfig>,
    pub engine: Arc<dyn SpinEngine>,
    pub api_key: String,
    engine_timeout: Duration,
    balance: Mutex<f64>,
}

impl AppState {
    pub fn new(
        config: Arc<EngineConfig>,
        engine: Arc<dyn SpinEngine>,
        initial_balance: f64,
        api_key: String,
    ) -> Self {
        Self {
            config,
            engine,
            api_key,
            engine_timeout: DEFAULT_ENGINE_TIMEOUT,
            balance: Mutex::new(initial_balance),
        }
    }

    pub fn with_engine_timeout(mut self, timeout: Duration) -> Self {
        self.engine_timeout = timeout;
        self
    }

    pub async fn balance(&self) -> f64 {
        *self.balance.lock().await
    }

    async fn debit(&self, bet: f64) -> Result<f64, ApiError> {
        let mut balance = self.balance.lock().await;
        if bet > *balance {
            return Err(ApiError::InsufficientFunds {
                bet,
                balance: *balance,
            });
        }
        *balance -= bet;
        Ok(*balance)
    }

    async fn credit(&self, amount: f64) -> f64 {
        let mut balance = self.balance.lock().await;
        *balance += amount;
        *balance
    }
}

/// `ApiError` as an HTTP response.
pub struct AppError(pub ApiError);

impl From<ApiError> for AppError {
    fn from(e: ApiError) -> Self {
        Self(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ApiError::InvalidBet
            | ApiError::BetOutOfRange { .. }
            | ApiError::InsufficientFunds { .. }
            | ApiError::Invalid(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Engine(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

async fn route_balance(State(state): State<Arc<AppState>>) -> Json<BalanceResponse> {
    Json(BalanceResponse {
        balance: state.balance().await,
    })
}

async fn route_config(State(state): State<Arc<AppState>>) -> Json<ConfigSummary> {
    Json(ConfigSummary::from(state.config.as_ref()))
}

async fn route_verify(State(state): State<Arc<AppState>>) -> Result<Json<VerifyResponse>, AppError> {
    let server_seed_hash = state.engine.server_seed_hash().ok_or(ApiError::NotFound)?;
    Ok(Json(VerifyResponse { server_seed_hash }))
}

async fn route_play(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PlayRequest>, JsonRejection>,
) -> Result<Json<PlayResponse>, AppError> {
    let Ok(Json(req)) = payload else {
        warn!("rejected play request with malformed body");
        return Err(ApiError::InvalidBet.into());
    };
    let bet = req.bet;
    if !(bet.is_finite() && bet > 0.0) {
        warn!(bet, "rejected non-positive bet");
        return Err(ApiError::InvalidBet.into());
    }
    let (min, max) = (state.config.min_bet(), state.config.max_bet());
    if bet < min || bet > max {
        warn!(bet, min, max, "rejected bet outside table limits");
        return Err(ApiError::BetOutOfRange { min, max }.into());
    }
    state.debit(bet).await.map_err(|e| {
        warn!(bet, "rejected bet: {e}");
        AppError(e)
    })?;

    let engine = state.engine.clone();
    let task = tokio::task::spawn_blocking(move || engine.compute_spin(bet));
    let outcome = match tokio::time::timeout(state.engine_timeout, task).await {
        Ok(Ok(Ok(outcome))) => outcome,
        Ok(Ok(Err(e))) => {
            state.credit(bet).await;
            error!(bet, "spin failed: {e}");
            return Err(e.into());
        }
        Ok(Err(e)) => {
            state.credit(bet).await;
            error!(bet, "spin task failed: {e}");
            return Err(ApiError::Internal.into());
        }
        // The late result, if any, is dropped with the task handle.
        Err(_) => {
            state.credit(bet).await;
            error!(bet, timeout_ms = state.engine_timeout.as_millis() as u64, "spin timed out");
            return Err(ApiError::Engine("engine timed out".into()).into());
        }
    };

    let balance = state.credit(outcome.result.total_win).await;
    info!(
        bet,
        total_win = outcome.result.total_win,
        wins = outcome.result.wins.len(),
        balance,
        "spin settled"
    );
    Ok(Json(PlayResponse {
        result: outcome.result,
        balance,
        proof: outcome.proof,
    }))
}

async fn route_admin_set_balance(
    State(state): State<Arc<AppState>>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    Json(req): Json<SetBalanceRequest>,
) -> Result<Json<BalanceResponse>, AppError> {
    match bearer {
        Some(TypedHeader(Authorization(token))) if token.token() == state.api_key => {}
        _ => return Err(ApiError::Unauthorized.into()),
    }
    if !(req.balance.is_finite() && req.balance >= 0.0) {
        return Err(ApiError::Invalid(format!("balance {} is not allowed", req.balance)).into());
    }
    *state.balance.lock().await = req.balance;
    info!(balance = req.balance, "balance reset by admin");
    Ok(Json(BalanceResponse {
        balance: req.balance,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/stake/play", post(route_play))
        .route("/api/stake/balance", get(route_balance))
        .route("/api/stake/config", get(route_config))
        .route("/verify", get(route_verify))
        .route("/admin/balance", post(route_admin_set_balance))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
