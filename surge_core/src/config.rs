use crate::{
    error::{config_err, EngineResult},
    paytable::Paytable,
    symbols::Symbol,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Board indices visited by one payline, one per reel.
pub type Payline = Vec<usize>;

/// How cells are drawn for a fresh board.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "strips", rename_all = "snake_case")]
pub enum BoardSource {
    /// Every cell is an independent uniform draw from the alphabet.
    #[default]
    Uniform,
    /// Each reel stops at a random offset of its strip and shows `rows`
    /// consecutive symbols, wrapping around.
    ReelStrips(Vec<Vec<Symbol>>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterConfig {
    pub symbol: Symbol,
    /// Pay scatter wins from the paytable row of `symbol`.
    #[serde(default)]
    pub pays: bool,
    #[serde(default = "default_min_count")]
    pub min_count: usize,
}

fn default_min_count() -> usize {
    3
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusConfig {
    pub symbol: Symbol,
    pub trigger_count: usize,
}

/// Reference reel strips. Reel 1 carries IPO, reel 5 has no NEWS and one
/// BULL fewer per cycle.
pub fn market_surge_strips() -> Vec<Vec<Symbol>> {
    use Symbol::*;
    let base = [Bull, Bear, Gold, Oil, Chart, Coin, Bull, Bear, Gold, Oil, Chart, Coin];
    let cycle = |tail: &[Symbol]| -> Vec<Symbol> {
        let one: Vec<Symbol> = base.iter().chain(tail).copied().collect();
        one.repeat(3)
    };
    let last: Vec<Symbol> = [Bull, Bear, Gold, Oil, Chart, Coin, Bear, Gold, Oil, Chart, Coin, Surge]
        .repeat(3);
    vec![
        cycle(&[Surge, News, Ipo]),
        cycle(&[Surge, News]),
        cycle(&[Surge, News]),
        cycle(&[Surge, News]),
        last,
    ]
}

/// Game definition as loaded from JSON. Call [`GameConfig::validate`] to get
/// an [`EngineConfig`] the engine accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub reels: usize,
    pub rows: usize,
    pub symbols: Vec<Symbol>,
    #[serde(default)]
    pub wild: Option<Symbol>,
    #[serde(default)]
    pub non_anchoring: Vec<Symbol>,
    pub paylines: Vec<Payline>,
    pub paytable: Paytable,
    #[serde(default)]
    pub board_source: BoardSource,
    #[serde(default)]
    pub scatter: Option<ScatterConfig>,
    #[serde(default)]
    pub bonus: Option<BonusConfig>,
    pub min_bet: f64,
    pub max_bet: f64,
    pub max_win_multiplier: f64,
    pub target_rtp: f64,
}

impl GameConfig {
    /// The 5x3, 20-line Market Surge game.
    pub fn market_surge() -> Self {
        Self {
            reels: 5,
            rows: 3,
            symbols: Symbol::ALL.to_vec(),
            wild: Some(Symbol::Surge),
            non_anchoring: vec![Symbol::News],
            paylines: vec![
                // rows
                vec![0, 3, 6, 9, 12],
                vec![1, 4, 7, 10, 13],
                vec![2, 5, 8, 11, 14],
                // diagonals
                vec![0, 4, 8, 10, 12],
                vec![2, 4, 6, 10, 14],
                // v-shapes
                vec![0, 4, 6, 10, 12],
                vec![2, 4, 8, 10, 14],
                vec![1, 3, 7, 9, 13],
                vec![1, 5, 7, 11, 13],
                // zigzags
                vec![0, 3, 7, 11, 14],
                vec![2, 5, 7, 9, 12],
                vec![0, 5, 6, 11, 12],
                vec![2, 3, 8, 9, 14],
                vec![1, 3, 6, 11, 13],
                vec![1, 5, 8, 9, 13],
                vec![0, 4, 7, 9, 14],
                vec![2, 4, 7, 11, 12],
                vec![1, 4, 6, 9, 13],
                vec![1, 4, 8, 11, 13],
                vec![0, 5, 7, 10, 14],
            ],
            paytable: Paytable::market_surge(),
            board_source: BoardSource::Uniform,
            scatter: Some(ScatterConfig {
                symbol: Symbol::News,
                pays: false,
                min_count: 3,
            }),
            bonus: Some(BonusConfig {
                symbol: Symbol::Ipo,
                trigger_count: 3,
            }),
            min_bet: 0.1,
            max_bet: 100.0,
            max_win_multiplier: 1000.0,
            target_rtp: 96.5,
        }
    }

    /// [`GameConfig::market_surge`] drawing boards from [`market_surge_strips`].
    pub fn market_surge_strips() -> Self {
        Self {
            board_source: BoardSource::ReelStrips(market_surge_strips()),
            ..Self::market_surge()
        }
    }

    pub fn validate(self) -> EngineResult<EngineConfig> {
        if self.symbols.is_empty() {
            return Err(config_err("symbol alphabet is empty"));
        }
        if self.reels == 0 || self.rows == 0 {
            return Err(config_err(format!(
                "grid must be non-empty, got {}x{}",
                self.reels, self.rows
            )));
        }
        let alphabet: HashSet<Symbol> = self.symbols.iter().copied().collect();
        if alphabet.len() != self.symbols.len() {
            return Err(config_err("symbol alphabet contains duplicates"));
        }
        let member = |s: Symbol, role: &str| {
            if alphabet.contains(&s) {
                Ok(())
            } else {
                Err(config_err(format!("{role} symbol {s} is not in the alphabet")))
            }
        };
        if let Some(w) = self.wild {
            member(w, "wild")?;
        }
        for s in &self.non_anchoring {
            member(*s, "non-anchoring")?;
        }
        if let Some(sc) = &self.scatter {
            member(sc.symbol, "scatter")?;
        }
        if let Some(b) = &self.bonus {
            member(b.symbol, "bonus")?;
        }

        let cells = self.reels * self.rows;
        for (line, payline) in self.paylines.iter().enumerate() {
            if payline.len() != self.reels {
                return Err(config_err(format!(
                    "payline {line} has {} positions, expected {}",
                    payline.len(),
                    self.reels
                )));
            }
            if let Some(bad) = payline.iter().find(|i| **i >= cells) {
                return Err(config_err(format!(
                    "payline {line} index {bad} is outside the {cells}-cell board"
                )));
            }
        }

        for entry in self.paytable.entries() {
            member(entry.symbol, "paytable")?;
            if !entry.payout_multiplier.is_finite() || entry.payout_multiplier < 0.0 {
                return Err(config_err(format!(
                    "paytable {} x{} has invalid multiplier {}",
                    entry.symbol, entry.count, entry.payout_multiplier
                )));
            }
        }

        if let BoardSource::ReelStrips(strips) = &self.board_source {
            if strips.len() != self.reels {
                return Err(config_err(format!(
                    "{} reel strips for {} reels",
                    strips.len(),
                    self.reels
                )));
            }
            for (reel, strip) in strips.iter().enumerate() {
                if strip.is_empty() {
                    return Err(config_err(format!("reel strip {reel} is empty")));
                }
                for s in strip {
                    member(*s, "reel strip")?;
                }
            }
        }

        if !(self.min_bet > 0.0 && self.min_bet <= self.max_bet && self.max_bet.is_finite()) {
            return Err(config_err(format!(
                "bet range [{}, {}] is invalid",
                self.min_bet, self.max_bet
            )));
        }

        Ok(EngineConfig { game: self })
    }
}

/// Validated, immutable engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    game: GameConfig,
}

impl EngineConfig {
    pub fn market_surge() -> Self {
        // The reference configuration is known-good.
        Self {
            game: GameConfig::market_surge(),
        }
    }

    pub fn reels(&self) -> usize {
        self.game.reels
    }

    pub fn rows(&self) -> usize {
        self.game.rows
    }

    pub fn cells(&self) -> usize {
        self.game.reels * self.game.rows
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.game.symbols
    }

    pub fn wild(&self) -> Option<Symbol> {
        self.game.wild
    }

    pub fn non_anchoring(&self) -> &[Symbol] {
        &self.game.non_anchoring
    }

    pub fn paylines(&self) -> &[Payline] {
        &self.game.paylines
    }

    pub fn paytable(&self) -> &Paytable {
        &self.game.paytable
    }

    pub fn board_source(&self) -> &BoardSource {
        &self.game.board_source
    }

    pub fn scatter(&self) -> Option<&ScatterConfig> {
        self.game.scatter.as_ref()
    }

    pub fn bonus(&self) -> Option<&BonusConfig> {
        self.game.bonus.as_ref()
    }

    pub fn min_bet(&self) -> f64 {
        self.game.min_bet
    }

    pub fn max_bet(&self) -> f64 {
        self.game.max_bet
    }

    pub fn max_win_multiplier(&self) -> f64 {
        self.game.max_win_multiplier
    }

    pub fn target_rtp(&self) -> f64 {
        self.game.target_rtp
    }

    pub fn game(&self) -> &GameConfig {
        &self.game
    }
}
