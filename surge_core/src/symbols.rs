use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Market Surge symbol alphabet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum Symbol {
    Bull,
    Bear,
    Gold,
    Oil,
    Chart,
    Coin,
    Surge,
    News,
    Ipo,
}

impl Symbol {
    pub const ALL: [Symbol; 9] = [
        Symbol::Bull,
        Symbol::Bear,
        Symbol::Gold,
        Symbol::Oil,
        Symbol::Chart,
        Symbol::Coin,
        Symbol::Surge,
        Symbol::News,
        Symbol::Ipo,
    ];

    pub fn from_index(i: u8) -> Option<Self> {
        Self::ALL.get(i as usize).copied()
    }

    pub fn to_index(self) -> u8 {
        match self {
            Symbol::Bull => 0,
            Symbol::Bear => 1,
            Symbol::Gold => 2,
            Symbol::Oil => 3,
            Symbol::Chart => 4,
            Symbol::Coin => 5,
            Symbol::Surge => 6,
            Symbol::News => 7,
            Symbol::Ipo => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Symbol::Bull => "BULL",
            Symbol::Bear => "BEAR",
            Symbol::Gold => "GOLD",
            Symbol::Oil => "OIL",
            Symbol::Chart => "CHART",
            Symbol::Coin => "COIN",
            Symbol::Surge => "SURGE",
            Symbol::News => "NEWS",
            Symbol::Ipo => "IPO",
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown symbol {0:?}")]
pub struct ParseSymbolError(pub String);

impl FromStr for Symbol {
    type Err = ParseSymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|sym| sym.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| ParseSymbolError(s.to_string()))
    }
}

/// Flat symbol grid addressed as `reel * rows + row`.
///
/// Serializes as a plain array so the wire shape is `board: Symbol[]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board(Vec<Symbol>);

impl Board {
    pub fn new(cells: Vec<Symbol>) -> Self {
        Self(cells)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Symbol> {
        self.0.get(index).copied()
    }

    pub fn cells(&self) -> &[Symbol] {
        &self.0
    }

    pub fn count(&self, symbol: Symbol) -> usize {
        self.0.iter().filter(|s| **s == symbol).count()
    }

    /// Indices of every cell holding `symbol`, in board order.
    pub fn positions_of(&self, symbol: Symbol) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == symbol)
            .map(|(i, _)| i)
            .collect()
    }

    /// Row-major view (`rows` x reels) for display.
    pub fn window(&self, rows: usize) -> Vec<Vec<Symbol>> {
        if rows == 0 {
            return Vec::new();
        }
        let reels = self.0.len() / rows;
        (0..rows)
            .map(|r| (0..reels).map(|c| self.0[c * rows + r]).collect())
            .collect()
    }
}
