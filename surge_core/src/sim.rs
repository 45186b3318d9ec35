//! Bulk spin statistics: RTP, hit frequency, payout distribution.

use crate::{
    config::EngineConfig,
    engine::{spin, SpinResult},
    error::EngineResult,
};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Upper bounds (exclusive) of the payout-multiplier buckets; the last bucket
/// is open-ended. A multiplier of exactly 0 has its own bucket.
pub const BUCKET_LABELS: [&str; 6] = ["0x", "0-1x", "1-10x", "10-50x", "50-100x", "100x+"];
const BUCKET_BOUNDS: [f64; 4] = [1.0, 10.0, 50.0, 100.0];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationStats {
    pub spins: u64,
    pub total_bet: f64,
    pub total_win: f64,
    pub hits: u64,
    pub bonus_triggers: u64,
    pub max_multiplier: f64,
    pub buckets: [u64; 6],
}

impl SimulationStats {
    pub fn record(&mut self, result: &SpinResult) {
        self.spins += 1;
        self.total_bet += result.bet;
        self.total_win += result.total_win;
        if result.total_win > 0.0 {
            self.hits += 1;
        }
        if result.bonus_triggered {
            self.bonus_triggers += 1;
        }
        self.max_multiplier = self.max_multiplier.max(result.payout_multiplier);
        self.buckets[bucket_of(result.payout_multiplier)] += 1;
    }

    /// Combine stats from independently simulated chunks.
    pub fn merge(mut self, other: &SimulationStats) -> Self {
        self.spins += other.spins;
        self.total_bet += other.total_bet;
        self.total_win += other.total_win;
        self.hits += other.hits;
        self.bonus_triggers += other.bonus_triggers;
        self.max_multiplier = self.max_multiplier.max(other.max_multiplier);
        for (a, b) in self.buckets.iter_mut().zip(other.buckets) {
            *a += b;
        }
        self
    }

    /// Return to player, in percent.
    pub fn rtp(&self) -> f64 {
        if self.total_bet > 0.0 {
            self.total_win / self.total_bet * 100.0
        } else {
            0.0
        }
    }

    pub fn hit_frequency(&self) -> f64 {
        if self.spins > 0 {
            self.hits as f64 / self.spins as f64 * 100.0
        } else {
            0.0
        }
    }

    /// Mean payout multiplier over winning spins.
    pub fn average_win_multiplier(&self) -> f64 {
        if self.hits == 0 || self.spins == 0 {
            return 0.0;
        }
        let mean_bet = self.total_bet / self.spins as f64;
        self.total_win / mean_bet / self.hits as f64
    }

    pub fn distribution(&self) -> Vec<(&'static str, u64)> {
        BUCKET_LABELS.iter().copied().zip(self.buckets).collect()
    }
}

fn bucket_of(multiplier: f64) -> usize {
    if multiplier <= 0.0 {
        return 0;
    }
    BUCKET_BOUNDS
        .iter()
        .position(|bound| multiplier < *bound)
        .map_or(BUCKET_LABELS.len() - 1, |i| i + 1)
}

/// Runs `spins` spins at a flat `bet`, calling `on_spin` for each result.
pub fn simulate<R, F>(
    config: &EngineConfig,
    bet: f64,
    spins: u64,
    rng: &mut R,
    mut on_spin: F,
) -> EngineResult<SimulationStats>
where
    R: Rng + ?Sized,
    F: FnMut(u64, &SpinResult),
{
    let mut stats = SimulationStats::default();
    for i in 0..spins {
        let result = spin(bet, config, rng)?;
        stats.record(&result);
        on_spin(i, &result);
    }
    Ok(stats)
}
