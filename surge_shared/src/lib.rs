use serde::{Deserialize, Serialize};
use surge_core::{EngineConfig, EngineError, SpinResult, Symbol, Win};

pub mod book;
pub mod config;

pub use book::{book_events, Book, BookEvent};
pub use config::{load_game_config, ConfigLoadError};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlayRequest {
    pub bet: f64,
}

/// Seeds needed to replay a provably-fair spin once the server seed is revealed.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SpinProof {
    pub server_seed_hash: String,
    pub client_seed: String,
    pub nonce: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SpinOutcome {
    pub result: SpinResult,
    pub proof: Option<SpinProof>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlayResponse {
    #[serde(flatten)]
    pub result: SpinResult,
    pub balance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<SpinProof>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BalanceResponse {
    pub balance: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SetBalanceRequest {
    pub balance: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VerifyResponse {
    pub server_seed_hash: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ConfigSummary {
    pub reels: usize,
    pub rows: usize,
    pub paylines: usize,
    pub symbols: Vec<Symbol>,
    pub target_rtp: f64,
    pub min_bet: f64,
    pub max_bet: f64,
    pub max_win_multiplier: f64,
}

impl From<&EngineConfig> for ConfigSummary {
    fn from(cfg: &EngineConfig) -> Self {
        Self {
            reels: cfg.reels(),
            rows: cfg.rows(),
            paylines: cfg.paylines().len(),
            symbols: cfg.symbols().to_vec(),
            target_rtp: cfg.target_rtp(),
            min_bet: cfg.min_bet(),
            max_bet: cfg.max_bet(),
            max_win_multiplier: cfg.max_win_multiplier(),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("invalid bet amount")]
    InvalidBet,
    #[error("bet must be between {min} and {max}")]
    BetOutOfRange { min: f64, max: f64 },
    #[error("insufficient balance")]
    InsufficientFunds { bet: f64, balance: f64 },
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("not found")]
    NotFound,
    #[error("engine failure: {0}")]
    Engine(String),
    #[error("internal server error")]
    Internal,
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::InvalidBet(_) => ApiError::InvalidBet,
            EngineError::Configuration(msg) => ApiError::Engine(msg),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Checks a result that arrived from outside the process against the
/// configured grid before it is trusted.
pub fn check_result(result: &SpinResult, cfg: &EngineConfig, bet: f64) -> ApiResult<()> {
    if result.board.len() != cfg.cells() {
        return Err(ApiError::Engine(format!(
            "board has {} cells, expected {}",
            result.board.len(),
            cfg.cells()
        )));
    }
    if !result.board.cells().iter().all(|s| cfg.symbols().contains(s)) {
        return Err(ApiError::Engine("board holds symbols outside the alphabet".into()));
    }
    let sum = result.wins.iter().fold(0.0, |acc, w: &Win| acc + w.payout);
    if (sum - result.total_win).abs() > 1e-9 || result.total_win < 0.0 {
        return Err(ApiError::Engine(format!(
            "total win {} does not match wins {}",
            result.total_win, sum
        )));
    }
    if (result.bet - bet).abs() > 1e-9 {
        return Err(ApiError::Engine(format!(
            "engine answered for bet {}, requested {}",
            result.bet, bet
        )));
    }
    Ok(())
}
