use crate::{
    config::{BoardSource, EngineConfig},
    error::{config_err, EngineResult},
    symbols::{Board, Symbol},
};
use rand::Rng;

/// Draws `reels * rows` cells independently and uniformly from `alphabet`.
pub fn generate<R: Rng + ?Sized>(
    alphabet: &[Symbol],
    reels: usize,
    rows: usize,
    rng: &mut R,
) -> EngineResult<Board> {
    if alphabet.is_empty() {
        return Err(config_err("symbol alphabet is empty"));
    }
    if reels == 0 || rows == 0 {
        return Err(config_err(format!(
            "grid must be non-empty, got {reels}x{rows}"
        )));
    }
    let cells = (0..reels * rows)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
        .collect();
    Ok(Board::new(cells))
}

/// For each reel, picks a random stop on its strip and takes `rows` symbols
/// circularly. Cells are laid out reel-major like [`generate`].
pub fn generate_from_strips<R: Rng + ?Sized>(
    strips: &[Vec<Symbol>],
    rows: usize,
    rng: &mut R,
) -> EngineResult<Board> {
    if strips.is_empty() || rows == 0 {
        return Err(config_err("reel strips need at least one reel and row"));
    }
    let mut cells = Vec::with_capacity(strips.len() * rows);
    for (reel, strip) in strips.iter().enumerate() {
        if strip.is_empty() {
            return Err(config_err(format!("reel strip {reel} is empty")));
        }
        let start = rng.gen_range(0..strip.len());
        for r in 0..rows {
            cells.push(strip[(start + r) % strip.len()]);
        }
    }
    Ok(Board::new(cells))
}

/// Generates a board according to the configured [`BoardSource`].
pub fn generate_board<R: Rng + ?Sized>(config: &EngineConfig, rng: &mut R) -> EngineResult<Board> {
    match config.board_source() {
        BoardSource::Uniform => generate(config.symbols(), config.reels(), config.rows(), rng),
        BoardSource::ReelStrips(strips) => generate_from_strips(strips, config.rows(), rng),
    }
}
