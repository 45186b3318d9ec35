pub mod board;
pub mod config;
pub mod engine;
pub mod error;
pub mod paylines;
pub mod paytable;
pub mod rng;
pub mod sim;
pub mod symbols;

pub use crate::board::{generate, generate_board, generate_from_strips};
pub use crate::config::{
    market_surge_strips, BoardSource, BonusConfig, EngineConfig, GameConfig, Payline, ScatterConfig,
};
pub use crate::engine::{
    evaluate_board, spin, spin_with_seeds, validate_bet, verify_board, win_level, SpinResult,
};
pub use crate::error::{EngineError, EngineResult};
pub use crate::paylines::{evaluate, evaluate_line, scatter_win, Evaluation, LineRules, Win};
pub use crate::paytable::{Paytable, PaytableEntry};
pub use crate::rng::{derive_hash_hex, ProvablyFairRng};
pub use crate::sim::{simulate, SimulationStats};
pub use crate::symbols::{Board, ParseSymbolError, Symbol};
