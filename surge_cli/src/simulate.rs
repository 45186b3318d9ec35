use anyhow::Context;
use chrono::{DateTime, Utc};
use rand::{rngs::StdRng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use surge_core::{simulate, EngineConfig, SimulationStats, SpinResult};
use surge_shared::Book;
use tracing::info;

use crate::optimize::{lookup_path, optimize_table, LookupRow, OptimizeReport};

#[derive(Debug, Clone)]
pub struct SimulateOptions {
    pub spins: u64,
    pub bet: f64,
    pub threads: usize,
    pub seed: Option<u64>,
    pub out: PathBuf,
    pub mode: String,
    /// Re-weight the lookup table toward the configured target RTP.
    pub optimize: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParSheet {
    pub game_name: String,
    pub mode: String,
    pub generated_at: DateTime<Utc>,
    pub total_simulations: u64,
    pub winning_simulations: u64,
    pub hit_frequency_percent: f64,
    pub rtp_percent: f64,
    pub target_rtp_percent: f64,
    pub max_win_multiplier: f64,
    pub average_win_multiplier: f64,
    pub bonus_triggers: u64,
    pub paylines: usize,
    pub reels: String,
    pub payout_distribution: BTreeMap<String, u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimization: Option<OptimizeReport>,
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

impl ParSheet {
    pub fn new(config: &EngineConfig, mode: &str, stats: &SimulationStats) -> Self {
        Self {
            game_name: "Market Surge".to_string(),
            mode: mode.to_string(),
            generated_at: Utc::now(),
            total_simulations: stats.spins,
            winning_simulations: stats.hits,
            hit_frequency_percent: round2(stats.hit_frequency()),
            rtp_percent: round2(stats.rtp()),
            target_rtp_percent: config.target_rtp(),
            max_win_multiplier: stats.max_multiplier,
            average_win_multiplier: round2(stats.average_win_multiplier()),
            bonus_triggers: stats.bonus_triggers,
            paylines: config.paylines().len(),
            reels: format!("{}x{}", config.reels(), config.rows()),
            payout_distribution: stats
                .distribution()
                .into_iter()
                .map(|(label, n)| (label.to_string(), n))
                .collect(),
            optimization: None,
        }
    }
}

/// Splits `spins` into `threads` chunks; the last chunk takes the remainder.
fn chunk_sizes(spins: u64, threads: usize) -> Vec<u64> {
    let threads = threads.max(1) as u64;
    let base = spins / threads;
    (0..threads)
        .map(|k| {
            if k == threads - 1 {
                spins - base * (threads - 1)
            } else {
                base
            }
        })
        .collect()
}

/// Per-chunk output files, stitched together in chunk order afterwards.
struct ChunkFiles {
    books: PathBuf,
    lookup: PathBuf,
    criteria: PathBuf,
}

impl ChunkFiles {
    fn new(dir: &Path, chunk: usize) -> Self {
        Self {
            books: dir.join(format!("books_{chunk}.jsonl")),
            lookup: dir.join(format!("lookup_{chunk}.csv")),
            criteria: dir.join(format!("criteria_{chunk}.csv")),
        }
    }
}

fn headerless_csv(path: &Path) -> anyhow::Result<csv::Writer<File>> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))
}

fn write_spin(
    id: u64,
    result: &SpinResult,
    books: &mut impl Write,
    lookup: &mut csv::Writer<File>,
    criteria: &mut csv::Writer<File>,
) -> anyhow::Result<()> {
    let book = Book::from_result(id, result);
    serde_json::to_writer(&mut *books, &book)?;
    books.write_all(b"\n")?;
    lookup.serialize(LookupRow {
        simulation_id: id,
        weight: 1,
        payout_multiplier: result.payout_multiplier,
    })?;
    criteria.write_record([id.to_string(), book.criteria])?;
    Ok(())
}

/// Simulates one chunk, streaming every spin to `files`. Ids start at
/// `first_id`.
fn run_chunk(
    config: &EngineConfig,
    opts: &SimulateOptions,
    chunk: usize,
    first_id: u64,
    spins: u64,
    files: &ChunkFiles,
) -> anyhow::Result<SimulationStats> {
    let mut rng = match opts.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(chunk as u64)),
        None => StdRng::from_entropy(),
    };
    let mut books = BufWriter::new(
        File::create(&files.books).with_context(|| format!("creating {}", files.books.display()))?,
    );
    let mut lookup = headerless_csv(&files.lookup)?;
    let mut criteria = headerless_csv(&files.criteria)?;

    let mut failure: Option<anyhow::Error> = None;
    let stats = simulate(config, opts.bet, spins, &mut rng, |i, result| {
        if failure.is_none() {
            if let Err(e) = write_spin(first_id + i, result, &mut books, &mut lookup, &mut criteria) {
                failure = Some(e);
            }
        }
    })?;
    if let Some(e) = failure {
        return Err(e);
    }
    books.flush()?;
    lookup.flush()?;
    criteria.flush()?;
    info!(chunk, spins = stats.spins, rtp = stats.rtp(), "chunk finished");
    Ok(stats)
}

/// Writes `header` (if any) followed by every part, in order.
fn concat(parts: &[&Path], header: Option<&str>, dest: &Path) -> anyhow::Result<()> {
    let mut out = BufWriter::new(
        File::create(dest).with_context(|| format!("creating {}", dest.display()))?,
    );
    if let Some(header) = header {
        writeln!(out, "{header}")?;
    }
    for part in parts {
        let mut file =
            File::open(part).with_context(|| format!("opening {}", part.display()))?;
        io::copy(&mut file, &mut out)?;
    }
    out.flush()?;
    Ok(())
}

/// Runs the simulation and writes books, lookup tables and the PAR sheet
/// under `opts.out`. Spins stream to disk per chunk; only the stats stay in
/// memory.
pub fn run(config: &EngineConfig, opts: &SimulateOptions) -> anyhow::Result<ParSheet> {
    let books_dir = opts.out.join("books");
    let lookup_dir = opts.out.join("lookup_tables");
    let publish_dir = opts.out.join("publish_files");
    let mode = &opts.mode;
    let parts_dir = opts.out.join(format!(".parts_{mode}"));
    for dir in [&books_dir, &lookup_dir, &publish_dir, &parts_dir] {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let sizes = chunk_sizes(opts.spins, opts.threads);
    let first_ids: Vec<u64> = sizes
        .iter()
        .scan(1u64, |next, &n| {
            let first = *next;
            *next += n;
            Some(first)
        })
        .collect();
    let files: Vec<ChunkFiles> = (0..sizes.len())
        .map(|k| ChunkFiles::new(&parts_dir, k))
        .collect();

    let chunk_stats = (0..sizes.len())
        .into_par_iter()
        .map(|k| run_chunk(config, opts, k, first_ids[k], sizes[k], &files[k]))
        .collect::<anyhow::Result<Vec<SimulationStats>>>()?;
    let stats = chunk_stats
        .iter()
        .fold(SimulationStats::default(), |acc, s| acc.merge(s));

    let books: Vec<&Path> = files.iter().map(|f| f.books.as_path()).collect();
    let lookup: Vec<&Path> = files.iter().map(|f| f.lookup.as_path()).collect();
    let criteria: Vec<&Path> = files.iter().map(|f| f.criteria.as_path()).collect();
    concat(&books, None, &books_dir.join(format!("books_{mode}.jsonl")))?;
    concat(
        &lookup,
        Some("simulation_id,weight,payout_multiplier"),
        &lookup_path(&lookup_dir, mode),
    )?;
    concat(
        &criteria,
        Some("simulation_id,criteria"),
        &lookup_dir.join(format!("lookUpTableIdToCriteria_{mode}.csv")),
    )?;
    fs::remove_dir_all(&parts_dir)
        .with_context(|| format!("removing {}", parts_dir.display()))?;

    let mut par = ParSheet::new(config, mode, &stats);
    if opts.optimize {
        par.optimization = Some(optimize_table(&lookup_dir, mode, config.target_rtp())?);
    }
    write_par_sheet(&publish_dir.join(format!("par_sheet_{mode}.json")), &par)?;
    info!(
        spins = stats.spins,
        rtp = par.rtp_percent,
        hit_frequency = par.hit_frequency_percent,
        out = %opts.out.display(),
        "simulation written"
    );
    Ok(par)
}

fn write_par_sheet(path: &Path, par: &ParSheet) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), par)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::{optimized_path, read_lookup, weighted_rtp};

    fn opts(out: &Path, seed: Option<u64>) -> SimulateOptions {
        SimulateOptions {
            spins: 103,
            bet: 1.0,
            threads: 4,
            seed,
            out: out.to_path_buf(),
            mode: "base".to_string(),
            optimize: false,
        }
    }

    #[test]
    fn chunks_cover_every_spin() {
        assert_eq!(chunk_sizes(103, 4), vec![25, 25, 25, 28]);
        assert_eq!(chunk_sizes(5, 0), vec![5]);
        assert_eq!(chunk_sizes(2, 4).iter().sum::<u64>(), 2);
    }

    #[test]
    fn writes_all_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = EngineConfig::market_surge();
        let par = run(&cfg, &opts(dir.path(), Some(9))).unwrap();
        assert_eq!(par.total_simulations, 103);
        assert_eq!(par.paylines, 20);
        assert_eq!(par.reels, "5x3");

        let books = fs::read_to_string(dir.path().join("books/books_base.jsonl")).unwrap();
        let lines: Vec<&str> = books.lines().collect();
        assert_eq!(lines.len(), 103);
        let ids: Vec<u64> = lines
            .iter()
            .map(|l| serde_json::from_str::<Book>(l).unwrap().id)
            .collect();
        assert_eq!(ids, (1..=103).collect::<Vec<u64>>());
        assert!(!dir.path().join(".parts_base").exists());

        let mut lookup =
            csv::Reader::from_path(dir.path().join("lookup_tables/lookUpTable_base.csv")).unwrap();
        let headers: Vec<String> = lookup.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, ["simulation_id", "weight", "payout_multiplier"]);
        assert_eq!(lookup.records().count(), 103);

        let sheet: ParSheet = serde_json::from_str(
            &fs::read_to_string(dir.path().join("publish_files/par_sheet_base.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(sheet.winning_simulations, par.winning_simulations);
        assert_eq!(sheet.payout_distribution.values().sum::<u64>(), 103);
    }

    #[test]
    fn seeded_runs_repeat() {
        let cfg = EngineConfig::market_surge();
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let pa = run(&cfg, &opts(a.path(), Some(1))).unwrap();
        let pb = run(&cfg, &opts(b.path(), Some(1))).unwrap();
        assert_eq!(pa.rtp_percent, pb.rtp_percent);
        let books_a = fs::read_to_string(a.path().join("books/books_base.jsonl")).unwrap();
        let books_b = fs::read_to_string(b.path().join("books/books_base.jsonl")).unwrap();
        assert_eq!(books_a, books_b);
    }

    #[test]
    fn optimize_flag_writes_reweighted_table() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = EngineConfig::market_surge();
        let mut o = opts(dir.path(), Some(4));
        o.spins = 400;
        o.optimize = true;
        let par = run(&cfg, &o).unwrap();

        let report = par.optimization.clone().unwrap();
        assert_eq!(report.target_rtp_percent, cfg.target_rtp());
        assert!((report.initial_rtp_percent - par.rtp_percent).abs() < 0.01);
        let before = (report.initial_rtp_percent - report.target_rtp_percent).abs();
        let after = (report.final_rtp_percent - report.target_rtp_percent).abs();
        assert!(after < before);

        let lookup_dir = dir.path().join("lookup_tables");
        let rows = read_lookup(&optimized_path(&lookup_dir, "base")).unwrap();
        assert_eq!(rows.len(), 400);
        assert!(rows.iter().all(|r| r.weight >= 1));
        assert!((weighted_rtp(&rows) - report.final_rtp_percent).abs() < 1e-9);

        let sheet: ParSheet = serde_json::from_str(
            &fs::read_to_string(dir.path().join("publish_files/par_sheet_base.json")).unwrap(),
        )
        .unwrap();
        let written = sheet.optimization.unwrap();
        assert_eq!(written.iterations, report.iterations);
        assert!((written.final_rtp_percent - report.final_rtp_percent).abs() < 1e-9);
    }
}
