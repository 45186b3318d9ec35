use surge_core::{spin, EngineConfig, ProvablyFairRng};

fn main() {
    // Example end-to-end provably-fair spin
    let server_seed = "example-server-seed";
    let client_seed = "example-client-seed";
    let nonce = 1u64;
    let mut rng = ProvablyFairRng::new(server_seed, client_seed, nonce);
    let config = EngineConfig::market_surge();
    match spin(1.0, &config, &mut rng) {
        Ok(outcome) => {
            println!("server_seed_hash={}", rng.server_seed_hash_hex());
            for row in outcome.board.window(config.rows()) {
                let names: Vec<_> = row.iter().map(|s| format!("{s:<5}")).collect();
                println!("{}", names.join(" "));
            }
            println!("total_win={} wins={}", outcome.total_win, outcome.wins.len());
        }
        Err(e) => eprintln!("spin failed: {e}"),
    }
}
