use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Static configuration is unusable; fatal at startup.
    #[error("invalid configuration: {0}")]
    Configuration(String),
    /// Bet must be a positive, finite amount.
    #[error("invalid bet: {0}")]
    InvalidBet(f64),
}

pub type EngineResult<T> = Result<T, EngineError>;

pub(crate) fn config_err(msg: impl Into<String>) -> EngineError {
    EngineError::Configuration(msg.into())
}
