use crate::{
    config::{EngineConfig, Payline, ScatterConfig},
    paytable::Paytable,
    symbols::{Board, Symbol},
};
use serde::{Deserialize, Serialize};

/// Shortest run that can pay.
pub const MIN_RUN: usize = 3;

/// One paying combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Win {
    pub symbol: Symbol,
    pub count: usize,
    pub payout: f64,
    pub positions: Vec<usize>,
    /// Payline index; `None` for scatter pays.
    pub line: Option<usize>,
}

/// Wild and anchor rules applied while walking a line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineRules {
    pub wild: Option<Symbol>,
    pub non_anchoring: Vec<Symbol>,
}

impl LineRules {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            wild: config.wild(),
            non_anchoring: config.non_anchoring().to_vec(),
        }
    }

    fn extends(&self, anchor: Symbol, symbol: Symbol) -> bool {
        symbol == anchor || Some(symbol) == self.wild
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    pub wins: Vec<Win>,
    pub total_win: f64,
}

/// Evaluates one payline. Returns `None` if the line is skipped, too short,
/// or the anchor symbol has no positive paytable entry for the run length.
pub fn evaluate_line(
    board: &Board,
    payline: &[usize],
    line: usize,
    paytable: &Paytable,
    rules: &LineRules,
    bet: f64,
) -> Option<Win> {
    let mut cells = payline.iter().map_while(|&i| board.get(i).map(|s| (i, s)));
    let (first_pos, anchor) = cells.next()?;
    if rules.non_anchoring.contains(&anchor) {
        return None;
    }

    let mut positions = vec![first_pos];
    positions.extend(
        cells
            .take_while(|(_, s)| rules.extends(anchor, *s))
            .map(|(i, _)| i),
    );
    let count = positions.len();
    if count < MIN_RUN {
        return None;
    }

    let multiplier = paytable.multiplier(anchor, count);
    if multiplier <= 0.0 {
        return None;
    }
    Some(Win {
        symbol: anchor,
        count,
        payout: bet * multiplier,
        positions,
        line: Some(line),
    })
}

/// Scans every payline in declaration order.
pub fn evaluate(
    board: &Board,
    paylines: &[Payline],
    paytable: &Paytable,
    rules: &LineRules,
    bet: f64,
) -> Evaluation {
    let mut out = Evaluation::default();
    for (line, payline) in paylines.iter().enumerate() {
        if let Some(win) = evaluate_line(board, payline, line, paytable, rules, bet) {
            out.total_win += win.payout;
            out.wins.push(win);
        }
    }
    out
}

/// Pays the scatter symbol anywhere on the board when `scatter.pays` is set.
pub fn scatter_win(
    board: &Board,
    scatter: &ScatterConfig,
    paytable: &Paytable,
    bet: f64,
) -> Option<Win> {
    if !scatter.pays {
        return None;
    }
    let positions = board.positions_of(scatter.symbol);
    let count = positions.len();
    if count < scatter.min_count.max(1) {
        return None;
    }
    let multiplier = paytable.multiplier(scatter.symbol, count);
    if multiplier <= 0.0 {
        return None;
    }
    Some(Win {
        symbol: scatter.symbol,
        count,
        payout: bet * multiplier,
        positions,
        line: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paytable::PaytableEntry;
    use Symbol::*;

    const LINE: [usize; 5] = [0, 3, 6, 9, 12];

    fn rules() -> LineRules {
        LineRules {
            wild: Some(Surge),
            non_anchoring: vec![News],
        }
    }

    /// Board of 15 COIN cells with `line` painted onto the top row.
    fn board_with_top_row(line: [Symbol; 5]) -> Board {
        let mut cells = vec![Coin; 15];
        for (reel, s) in line.into_iter().enumerate() {
            cells[reel * 3] = s;
        }
        Board::new(cells)
    }

    fn table(entries: &[(Symbol, u8, f64)]) -> Paytable {
        Paytable::from_entries(entries.iter().map(|(symbol, count, m)| PaytableEntry {
            symbol: *symbol,
            count: *count,
            payout_multiplier: *m,
        }))
    }

    #[test]
    fn wild_extends_run_until_mismatch() {
        let board = board_with_top_row([Bull, Surge, Bull, Bear, Bull]);
        let pt = table(&[(Bull, 3, 5.0)]);
        let win = evaluate_line(&board, &LINE, 0, &pt, &rules(), 2.0).unwrap();
        assert_eq!(win.symbol, Bull);
        assert_eq!(win.count, 3);
        assert_eq!(win.payout, 10.0);
        assert_eq!(win.positions, vec![0, 3, 6]);
        assert_eq!(win.line, Some(0));
    }

    #[test]
    fn all_wild_line_pays_as_wild() {
        let board = board_with_top_row([Surge; 5]);
        let pt = table(&[(Surge, 5, 200.0), (Bull, 5, 100.0)]);
        let win = evaluate_line(&board, &LINE, 0, &pt, &rules(), 1.5).unwrap();
        assert_eq!(win.symbol, Surge);
        assert_eq!(win.count, 5);
        assert_eq!(win.payout, 300.0);
    }

    #[test]
    fn wild_anchor_only_matches_itself() {
        // SURGE anchors like any symbol; BULL after it does not extend.
        let board = board_with_top_row([Surge, Surge, Bull, Bull, Bull]);
        let pt = table(&[(Surge, 3, 10.0), (Bull, 5, 100.0)]);
        assert!(evaluate_line(&board, &LINE, 0, &pt, &rules(), 1.0).is_none());
    }

    #[test]
    fn news_never_anchors() {
        let board = board_with_top_row([News; 5]);
        let pt = table(&[(News, 5, 50.0)]);
        assert!(evaluate_line(&board, &LINE, 0, &pt, &rules(), 1.0).is_none());
    }

    #[test]
    fn anchor_policy_is_configurable() {
        let board = board_with_top_row([Surge; 5]);
        let pt = table(&[(Surge, 5, 200.0)]);
        let mock_policy = LineRules {
            wild: Some(Surge),
            non_anchoring: vec![Surge, News],
        };
        assert!(evaluate_line(&board, &LINE, 0, &pt, &mock_policy, 1.0).is_none());
        assert!(evaluate_line(&board, &LINE, 0, &pt, &rules(), 1.0).is_some());
    }

    #[test]
    fn symbol_without_entry_never_pays() {
        let board = board_with_top_row([Gold; 5]);
        let pt = table(&[(Bull, 5, 100.0)]);
        assert!(evaluate_line(&board, &LINE, 0, &pt, &rules(), 1.0).is_none());
    }

    #[test]
    fn zero_multiplier_emits_nothing() {
        let board = board_with_top_row([Ipo; 5]);
        assert!(evaluate_line(&board, &LINE, 0, &Paytable::market_surge(), &rules(), 1.0).is_none());
    }

    #[test]
    fn two_in_a_row_is_not_a_win() {
        let board = board_with_top_row([Bull, Bull, Bear, Bull, Bull]);
        let pt = table(&[(Bull, 2, 1.0), (Bull, 3, 5.0)]);
        assert!(evaluate_line(&board, &LINE, 0, &pt, &rules(), 1.0).is_none());
    }

    #[test]
    fn without_wild_surge_breaks_the_run() {
        let board = board_with_top_row([Bull, Surge, Bull, Bull, Bull]);
        let pt = table(&[(Bull, 3, 5.0)]);
        let plain = LineRules::default();
        assert!(evaluate_line(&board, &LINE, 0, &pt, &plain, 1.0).is_none());
    }

    #[test]
    fn cells_are_shared_between_lines_and_order_is_kept() {
        // Every cell BULL: all lines pay the same, in declaration order.
        let board = Board::new(vec![Bull; 15]);
        let cfg = EngineConfig::market_surge();
        let eval = evaluate(&board, cfg.paylines(), cfg.paytable(), &rules(), 1.0);
        assert_eq!(eval.wins.len(), 20);
        let lines: Vec<_> = eval.wins.iter().map(|w| w.line.unwrap()).collect();
        assert_eq!(lines, (0..20).collect::<Vec<_>>());
        assert_eq!(eval.total_win, 2000.0);
    }

    #[test]
    fn order_follows_paylines_not_payout() {
        // top row pays BEAR x3, middle row pays BULL x5
        let mut cells = vec![Coin; 15];
        for reel in 0..5 {
            cells[reel * 3 + 1] = Bull;
        }
        for reel in 0..3 {
            cells[reel * 3] = Bear;
        }
        let board = Board::new(cells);
        let paylines = vec![LINE.to_vec(), vec![1, 4, 7, 10, 13]];
        let pt = Paytable::market_surge();
        let eval = evaluate(&board, &paylines, &pt, &rules(), 1.0);
        assert_eq!(eval.wins.len(), 2);
        assert_eq!(eval.wins[0].symbol, Bear);
        assert_eq!(eval.wins[1].symbol, Bull);
        assert_eq!(eval.total_win, 4.0 + 100.0);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let board = board_with_top_row([Bull, Surge, Bull, Bull, Gold]);
        let cfg = EngineConfig::market_surge();
        let a = evaluate(&board, cfg.paylines(), cfg.paytable(), &rules(), 3.0);
        let b = evaluate(&board, cfg.paylines(), cfg.paytable(), &rules(), 3.0);
        assert_eq!(a, b);
    }

    #[test]
    fn scatter_pays_anywhere_when_enabled() {
        let mut cells = vec![Coin; 15];
        cells[1] = News;
        cells[7] = News;
        cells[14] = News;
        let board = Board::new(cells);
        let mut scatter = ScatterConfig {
            symbol: News,
            pays: true,
            min_count: 3,
        };
        let pt = Paytable::market_surge();
        let win = scatter_win(&board, &scatter, &pt, 2.0).unwrap();
        assert_eq!(win.positions, vec![1, 7, 14]);
        assert_eq!(win.payout, 4.0);
        assert_eq!(win.line, None);

        scatter.pays = false;
        assert!(scatter_win(&board, &scatter, &pt, 2.0).is_none());
    }
}
