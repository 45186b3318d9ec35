//! Event books: the typed event stream a front end replays for one spin.

use serde::{Deserialize, Serialize};
use surge_core::{Board, SpinResult, Symbol};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookWin {
    pub symbol: Symbol,
    pub kind: usize,
    pub win: f64,
    pub positions: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BookEvent {
    #[serde(rename_all = "camelCase")]
    Reveal {
        index: usize,
        board: Board,
        game_type: String,
    },
    #[serde(rename_all = "camelCase")]
    WinInfo {
        index: usize,
        total_win: f64,
        wins: Vec<BookWin>,
    },
    #[serde(rename_all = "camelCase")]
    SetWin {
        index: usize,
        amount: f64,
        win_level: u8,
    },
    SetTotalWin { index: usize, amount: f64 },
    FinalWin { index: usize, amount: f64 },
}

pub const BASE_GAME: &str = "basegame";

/// Events for one spin: always a reveal, then the win sequence if anything paid.
pub fn book_events(result: &SpinResult) -> Vec<BookEvent> {
    let mut events = vec![BookEvent::Reveal {
        index: 0,
        board: result.board.clone(),
        game_type: BASE_GAME.to_string(),
    }];
    if !result.is_win() {
        return events;
    }
    let wins = result
        .wins
        .iter()
        .map(|w| BookWin {
            symbol: w.symbol,
            kind: w.count,
            win: w.payout,
            positions: w.positions.clone(),
            line: w.line,
        })
        .collect();
    events.push(BookEvent::WinInfo {
        index: 1,
        total_win: result.total_win,
        wins,
    });
    events.push(BookEvent::SetWin {
        index: 2,
        amount: result.total_win,
        win_level: result.win_level,
    });
    events.push(BookEvent::SetTotalWin {
        index: 3,
        amount: result.total_win,
    });
    events.push(BookEvent::FinalWin {
        index: 4,
        amount: result.total_win,
    });
    events
}

/// One simulated spin as written to a books file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: u64,
    pub payout_multiplier: f64,
    pub events: Vec<BookEvent>,
    pub criteria: String,
    pub base_game_wins: f64,
    pub free_game_wins: f64,
}

impl Book {
    pub fn from_result(id: u64, result: &SpinResult) -> Self {
        Self {
            id,
            payout_multiplier: result.payout_multiplier,
            events: book_events(result),
            criteria: BASE_GAME.to_string(),
            base_game_wins: result.payout_multiplier,
            free_game_wins: 0.0,
        }
    }
}
