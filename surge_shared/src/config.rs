use std::path::{Path, PathBuf};
use surge_core::{EngineConfig, EngineError, GameConfig};

#[derive(thiserror::Error, Debug)]
pub enum ConfigLoadError {
    #[error("cannot read game config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse game config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Invalid(#[from] EngineError),
}

/// Loads and validates a JSON game config, or the built-in Market Surge
/// game when no path is given.
pub fn load_game_config(path: Option<&Path>) -> Result<EngineConfig, ConfigLoadError> {
    let Some(path) = path else {
        return Ok(GameConfig::market_surge().validate()?);
    };
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let game: GameConfig = serde_json::from_str(&raw).map_err(|source| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(game.validate()?)
}
