use clap::{Parser, Subcommand};
use rand::{rngs::StdRng, SeedableRng};
use std::path::PathBuf;
use surge_core::{
    spin, verify_board, Board, EngineConfig, GameConfig, ProvablyFairRng, SpinResult, Symbol,
};
use surge_shared::{load_game_config, ConfigSummary};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod optimize;
mod simulate;

#[derive(Parser)]
#[command(name = "surge-cli", about = "Operator CLI for the Market Surge slot")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// JSON game config; the built-in Market Surge game when unset.
    #[arg(long, global = true, env = "GAME_CONFIG")]
    game_config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single spin
    Play {
        #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
        bet: f64,
        /// Seed a deterministic RNG instead of OS entropy
        #[arg(long)]
        seed: Option<u64>,
        /// Provably-fair spin: server seed (requires --client-seed and --nonce)
        #[arg(long, requires_all = ["client_seed", "nonce"])]
        server_seed: Option<String>,
        #[arg(long)]
        client_seed: Option<String>,
        #[arg(long)]
        nonce: Option<u64>,
        /// Print the spin result as JSON on stdout
        #[arg(long)]
        json: bool,
    },
    /// Simulate many spins and write books, lookup tables and a PAR sheet
    Simulate {
        #[arg(long, default_value_t = 100_000)]
        spins: u64,
        #[arg(long, default_value_t = 1.0)]
        bet: f64,
        #[arg(long, default_value_t = 10)]
        threads: usize,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value = "library")]
        out: PathBuf,
        #[arg(long, default_value = "base")]
        mode: String,
        /// Also write a lookup table re-weighted toward the target RTP
        #[arg(long)]
        optimize: bool,
    },
    /// Re-weight an existing lookup table toward the target RTP
    Optimize {
        #[arg(long, default_value = "library")]
        out: PathBuf,
        #[arg(long, default_value = "base")]
        mode: String,
        /// Target RTP in percent; the game's target when unset
        #[arg(long)]
        target_rtp: Option<f64>,
    },
    /// Print the game configuration
    Config {
        /// Full game definition instead of the summary
        #[arg(long)]
        full: bool,
        /// Use the built-in game with reference reel strips instead of --game-config
        #[arg(long)]
        reel_strips: bool,
    },
    /// Check that a board came from the given seeds
    Verify {
        #[arg(long)]
        server_seed: String,
        #[arg(long)]
        client_seed: String,
        #[arg(long)]
        nonce: u64,
        /// Comma-separated symbols in board order, e.g. BULL,BEAR,...
        #[arg(long, value_delimiter = ',')]
        board: Vec<Symbol>,
    },
}

fn print_spin(config: &EngineConfig, result: &SpinResult) {
    for row in result.board.window(config.rows()) {
        let cells: Vec<String> = row.iter().map(|s| format!("{s:<5}")).collect();
        println!("{}", cells.join(" "));
    }
    for win in &result.wins {
        match win.line {
            Some(line) => println!(
                "line {line:>2}: {} x{} pays {} at {:?}",
                win.symbol, win.count, win.payout, win.positions
            ),
            None => println!(
                "scatter: {} x{} pays {} at {:?}",
                win.symbol, win.count, win.payout, win.positions
            ),
        }
    }
    println!(
        "bet={} total_win={} multiplier={:.2} bonus={}",
        result.bet, result.total_win, result.payout_multiplier, result.bonus_triggered
    );
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    let config = load_game_config(cli.game_config.as_deref())?;

    match cli.command {
        Commands::Play {
            bet,
            seed,
            server_seed,
            client_seed,
            nonce,
            json,
        } => {
            let result = match (server_seed, client_seed, nonce) {
                (Some(server), Some(client), Some(nonce)) => {
                    let mut rng = ProvablyFairRng::new(server, client, nonce);
                    info!(server_seed_hash = %rng.server_seed_hash_hex(), nonce, "provably-fair spin");
                    spin(bet, &config, &mut rng)?
                }
                _ => {
                    let mut rng = match seed {
                        Some(seed) => StdRng::seed_from_u64(seed),
                        None => StdRng::from_entropy(),
                    };
                    spin(bet, &config, &mut rng)?
                }
            };
            if json {
                println!("{}", serde_json::to_string(&result)?);
            } else {
                print_spin(&config, &result);
            }
        }
        Commands::Simulate {
            spins,
            bet,
            threads,
            seed,
            out,
            mode,
            optimize,
        } => {
            let opts = simulate::SimulateOptions {
                spins,
                bet,
                threads,
                seed,
                out,
                mode,
                optimize,
            };
            info!(spins, threads, "running simulation");
            let par = simulate::run(&config, &opts)?;
            println!("{}", serde_json::to_string_pretty(&par)?);
        }
        Commands::Optimize {
            out,
            mode,
            target_rtp,
        } => {
            let target = target_rtp.unwrap_or(config.target_rtp());
            let report = optimize::optimize_table(&out.join("lookup_tables"), &mode, target)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Config { full, reel_strips } => {
            let config = if reel_strips {
                GameConfig::market_surge_strips().validate()?
            } else {
                config
            };
            if full {
                println!("{}", serde_json::to_string_pretty(config.game())?);
            } else {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&ConfigSummary::from(&config))?
                );
            }
        }
        Commands::Verify {
            server_seed,
            client_seed,
            nonce,
            board,
        } => {
            let expected = Board::new(board);
            let ok = verify_board(&server_seed, &client_seed, nonce, &config, &expected)?;
            if ok {
                println!("board verified for nonce {nonce}");
            } else {
                anyhow::bail!("board does not match seeds for nonce {nonce}");
            }
        }
    }

    Ok(())
}
