//! Lookup-table re-weighting toward a target RTP.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Allowed distance from the target, in percentage points.
pub const RTP_TOLERANCE: f64 = 0.1;
pub const MAX_ITERATIONS: usize = 100;
/// Input weights are multiplied by this before re-weighting so integer
/// rounding keeps resolution.
pub const WEIGHT_SCALE: u64 = 1_000_000;

/// One row of `lookUpTable_{mode}.csv`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LookupRow {
    pub simulation_id: u64,
    pub weight: u64,
    pub payout_multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeReport {
    pub target_rtp_percent: f64,
    pub initial_rtp_percent: f64,
    pub final_rtp_percent: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Weight-averaged payout multiplier, in percent.
pub fn weighted_rtp(rows: &[LookupRow]) -> f64 {
    let total: f64 = rows.iter().map(|r| r.weight as f64).sum();
    if total == 0.0 {
        return 0.0;
    }
    let paid: f64 = rows
        .iter()
        .map(|r| r.payout_multiplier * r.weight as f64)
        .sum();
    paid / total * 100.0
}

/// Multiplies the weight of every row `pick` selects by `factor`, keeping
/// weights at 1 or more. Returns whether any weight changed.
fn rescale(rows: &mut [LookupRow], pick: impl Fn(&LookupRow) -> bool, factor: f64) -> bool {
    let mut changed = false;
    for row in rows.iter_mut() {
        if !pick(row) {
            continue;
        }
        let weight = ((row.weight as f64 * factor).round() as u64).max(1);
        changed |= weight != row.weight;
        row.weight = weight;
    }
    changed
}

/// Iteratively re-weights `rows` until the weighted RTP is within
/// [`RTP_TOLERANCE`] of `target_rtp` (percent).
///
/// Winning rows are scaled together against the losing mass. When winners
/// alone cannot reach a higher target, losing rows are halved instead. Stops
/// early once no weight moves.
pub fn optimize_weights(rows: &mut [LookupRow], target_rtp: f64) -> OptimizeReport {
    let initial = weighted_rtp(rows);
    for row in rows.iter_mut() {
        row.weight = row.weight.max(1).saturating_mul(WEIGHT_SCALE);
    }
    let target = target_rtp / 100.0;
    let mut rtp = weighted_rtp(rows);
    let mut iterations = 0;

    while (rtp - target_rtp).abs() >= RTP_TOLERANCE && iterations < MAX_ITERATIONS {
        iterations += 1;
        let (mut losing, mut winning, mut paid) = (0.0, 0.0, 0.0);
        for row in rows.iter() {
            let w = row.weight as f64;
            if row.payout_multiplier > 0.0 {
                winning += w;
                paid += w * row.payout_multiplier;
            } else {
                losing += w;
            }
        }
        // paid * a / (losing + winning * a) == target
        let denom = paid - target * winning;
        let changed = if winning > 0.0 && denom > 0.0 {
            rescale(rows, |r| r.payout_multiplier > 0.0, target * losing / denom)
        } else if rtp < target_rtp {
            rescale(rows, |r| r.payout_multiplier <= 0.0, 0.5)
        } else {
            false
        };
        if !changed {
            break;
        }
        rtp = weighted_rtp(rows);
    }

    OptimizeReport {
        target_rtp_percent: target_rtp,
        initial_rtp_percent: initial,
        final_rtp_percent: rtp,
        iterations,
        converged: (rtp - target_rtp).abs() < RTP_TOLERANCE,
    }
}

pub fn read_lookup(path: &Path) -> anyhow::Result<Vec<LookupRow>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
    let rows = reader
        .deserialize()
        .collect::<Result<Vec<LookupRow>, _>>()
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(rows)
}

pub fn write_lookup(path: &Path, rows: &[LookupRow]) -> anyhow::Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn lookup_path(lookup_dir: &Path, mode: &str) -> PathBuf {
    lookup_dir.join(format!("lookUpTable_{mode}.csv"))
}

pub fn optimized_path(lookup_dir: &Path, mode: &str) -> PathBuf {
    lookup_dir.join(format!("lookUpTable_{mode}_optimized.csv"))
}

/// Reads `lookUpTable_{mode}.csv`, re-weights it and writes
/// `lookUpTable_{mode}_optimized.csv` next to it.
pub fn optimize_table(
    lookup_dir: &Path,
    mode: &str,
    target_rtp: f64,
) -> anyhow::Result<OptimizeReport> {
    let mut rows = read_lookup(&lookup_path(lookup_dir, mode))?;
    let report = optimize_weights(&mut rows, target_rtp);
    let out = optimized_path(lookup_dir, mode);
    write_lookup(&out, &rows)?;
    info!(
        rows = rows.len(),
        initial_rtp = report.initial_rtp_percent,
        final_rtp = report.final_rtp_percent,
        iterations = report.iterations,
        converged = report.converged,
        out = %out.display(),
        "lookup table optimized"
    );
    Ok(report)
}
