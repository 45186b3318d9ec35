use crate::{
    board::generate_board,
    config::EngineConfig,
    error::{EngineError, EngineResult},
    paylines::{evaluate, scatter_win, LineRules, Win},
    rng::ProvablyFairRng,
    symbols::Board,
};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Floor for the divisor of `payout_multiplier`.
pub const MIN_BET_DIVISOR: f64 = 1e-4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinResult {
    pub board: Board,
    pub wins: Vec<Win>,
    pub total_win: f64,
    pub payout_multiplier: f64,
    pub bet: f64,
    #[serde(default)]
    pub win_level: u8,
    #[serde(default)]
    pub bonus_triggered: bool,
}

impl SpinResult {
    /// Builds a result from an evaluated board, deriving the totals.
    pub fn new(board: Board, wins: Vec<Win>, bet: f64, bonus_triggered: bool) -> Self {
        let total_win = wins.iter().fold(0.0, |acc, w| acc + w.payout);
        let payout_multiplier = total_win / bet.max(MIN_BET_DIVISOR);
        Self {
            board,
            wins,
            total_win,
            payout_multiplier,
            bet,
            win_level: win_level(payout_multiplier),
            bonus_triggered,
        }
    }

    pub fn is_win(&self) -> bool {
        !self.wins.is_empty()
    }
}

/// Animation tier for a payout multiplier.
pub fn win_level(multiplier: f64) -> u8 {
    if multiplier <= 0.0 {
        0
    } else if multiplier < 10.0 {
        1
    } else if multiplier < 50.0 {
        2
    } else if multiplier < 100.0 {
        3
    } else {
        4
    }
}

pub fn validate_bet(bet: f64) -> EngineResult<()> {
    if bet.is_finite() && bet > 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidBet(bet))
    }
}

/// Scores an existing board. No randomness involved.
pub fn evaluate_board(board: Board, config: &EngineConfig, bet: f64) -> SpinResult {
    let rules = LineRules::from_config(config);
    let mut eval = evaluate(&board, config.paylines(), config.paytable(), &rules, bet);
    if let Some(win) = config
        .scatter()
        .and_then(|sc| scatter_win(&board, sc, config.paytable(), bet))
    {
        eval.wins.push(win);
    }
    let bonus_triggered = config
        .bonus()
        .is_some_and(|b| board.count(b.symbol) >= b.trigger_count);
    SpinResult::new(board, eval.wins, bet, bonus_triggered)
}

/// One spin: validate the bet, draw a board, score it.
pub fn spin<R: Rng + ?Sized>(bet: f64, config: &EngineConfig, rng: &mut R) -> EngineResult<SpinResult> {
    validate_bet(bet)?;
    let board = generate_board(config, rng)?;
    Ok(evaluate_board(board, config, bet))
}

/// Convenience: perform a spin creating the RNG from seeds.
pub fn spin_with_seeds(
    server_seed: &str,
    client_seed: &str,
    nonce: u64,
    config: &EngineConfig,
    bet: f64,
) -> EngineResult<SpinResult> {
    let mut rng = ProvablyFairRng::new(server_seed, client_seed, nonce);
    spin(bet, config, &mut rng)
}

/// Verify that a given board matches what the RNG would produce for the seeds.
pub fn verify_board(
    server_seed: &str,
    client_seed: &str,
    nonce: u64,
    config: &EngineConfig,
    expected: &Board,
) -> EngineResult<bool> {
    let mut rng = ProvablyFairRng::new(server_seed, client_seed, nonce);
    let board = generate_board(config, &mut rng)?;
    Ok(&board == expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{BoardSource, GameConfig},
        symbols::Symbol,
    };
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_spin_deterministic() {
        let cfg = EngineConfig::market_surge();
        let out1 = spin_with_seeds("server", "client", 1, &cfg, 1.0).unwrap();
        let out2 = spin_with_seeds("server", "client", 1, &cfg, 1.0).unwrap();
        assert_eq!(out1, out2);
        assert!(verify_board("server", "client", 1, &cfg, &out1.board).unwrap());
    }

    #[test]
    fn rejects_non_positive_bets() {
        let cfg = EngineConfig::market_surge();
        let mut rng = StdRng::seed_from_u64(0);
        for bet in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            match spin(bet, &cfg, &mut rng) {
                Err(EngineError::InvalidBet(_)) => {}
                other => panic!("bet {bet} gave {other:?}"),
            }
        }
    }

    #[test]
    fn invalid_bet_consumes_no_entropy() {
        let cfg = EngineConfig::market_surge();
        let mut rng = StdRng::seed_from_u64(5);
        assert!(spin(0.0, &cfg, &mut rng).is_err());
        let after_reject = spin(1.0, &cfg, &mut rng).unwrap();
        let fresh = spin(1.0, &cfg, &mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(after_reject.board, fresh.board);
    }

    #[test]
    fn totals_are_conserved() {
        let cfg = EngineConfig::market_surge();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            let out = spin(2.5, &cfg, &mut rng).unwrap();
            let sum: f64 = out.wins.iter().map(|w| w.payout).sum();
            assert_eq!(out.total_win, sum);
            assert_eq!(out.payout_multiplier, out.total_win / 2.5);
            assert_eq!(out.board.len(), 15);
        }
    }

    #[test]
    fn bonus_counts_ipo_cells() {
        let cfg = EngineConfig::market_surge();
        let mut cells = vec![Symbol::Coin; 15];
        cells[0] = Symbol::Ipo;
        cells[5] = Symbol::Ipo;
        let two = evaluate_board(Board::new(cells.clone()), &cfg, 1.0);
        assert!(!two.bonus_triggered);
        cells[14] = Symbol::Ipo;
        let three = evaluate_board(Board::new(cells), &cfg, 1.0);
        assert!(three.bonus_triggered);
    }

    #[test]
    fn scatter_win_is_appended_after_lines() {
        let mut game = GameConfig::market_surge();
        if let Some(sc) = game.scatter.as_mut() {
            sc.pays = true;
        }
        let cfg = game.validate().unwrap();
        let mut cells = vec![Symbol::Bull; 15];
        cells[2] = Symbol::News;
        cells[8] = Symbol::News;
        cells[11] = Symbol::News;
        let out = evaluate_board(Board::new(cells), &cfg, 1.0);
        let last = out.wins.last().unwrap();
        assert_eq!(last.line, None);
        assert_eq!(last.symbol, Symbol::News);
        assert_eq!(last.payout, 2.0);
        assert!(out.wins[..out.wins.len() - 1].iter().all(|w| w.line.is_some()));
    }

    #[test]
    fn strip_config_spins_reel_windows() {
        let cfg = GameConfig::market_surge_strips().validate().unwrap();
        let BoardSource::ReelStrips(strips) = cfg.board_source() else {
            panic!("expected reel strips");
        };
        let mut rng = StdRng::seed_from_u64(21);
        for _ in 0..50 {
            let out = spin(1.0, &cfg, &mut rng).unwrap();
            assert_eq!(out.board.len(), 15);
            for (reel, strip) in strips.iter().enumerate() {
                let window: Vec<Symbol> = (0..3).filter_map(|r| out.board.get(reel * 3 + r)).collect();
                let found = (0..strip.len())
                    .any(|start| (0..3).all(|r| strip[(start + r) % strip.len()] == window[r]));
                assert!(found, "reel {reel} window {window:?} is not on its strip");
            }
            // reel 5 never shows NEWS
            assert!((12..15).all(|i| out.board.get(i) != Some(Symbol::News)));
        }
    }

    #[test]
    fn win_levels() {
        assert_eq!(win_level(0.0), 0);
        assert_eq!(win_level(9.99), 1);
        assert_eq!(win_level(10.0), 2);
        assert_eq!(win_level(99.0), 3);
        assert_eq!(win_level(100.0), 4);
    }

    #[test]
    fn camel_case_wire_shape() {
        let out = evaluate_board(Board::new(vec![Symbol::Bull; 15]), &EngineConfig::market_surge(), 1.0);
        let v = serde_json::to_value(&out).unwrap();
        assert!(v.get("totalWin").is_some());
        assert!(v.get("payoutMultiplier").is_some());
        assert_eq!(v["board"].as_array().unwrap().len(), 15);
        assert_eq!(v["wins"][0]["symbol"], "BULL");
    }
}
