use rand::{rngs::StdRng, RngCore, SeedableRng};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use surge_core::{derive_hash_hex, spin, EngineConfig, ProvablyFairRng, SpinResult};
use surge_shared::{check_result, ApiError, ApiResult, SpinOutcome, SpinProof};
use tracing::{debug, warn};

/// Anything that can turn a bet into a spin result. Implementations are
/// picked once at startup.
pub trait SpinEngine: Send + Sync {
    fn compute_spin(&self, bet: f64) -> ApiResult<SpinOutcome>;

    /// Commitment to the server seed, for engines that have one.
    fn server_seed_hash(&self) -> Option<String> {
        None
    }
}

/// Fresh OS-seeded RNG for every spin.
pub struct MockEngine {
    config: Arc<EngineConfig>,
}

impl MockEngine {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self { config }
    }
}

impl SpinEngine for MockEngine {
    fn compute_spin(&self, bet: f64) -> ApiResult<SpinOutcome> {
        let mut rng = StdRng::from_entropy();
        let result = spin(bet, &self.config, &mut rng)?;
        Ok(SpinOutcome {
            result,
            proof: None,
        })
    }
}

/// HMAC-seeded spins; every call takes the next nonce.
pub struct FairEngine {
    config: Arc<EngineConfig>,
    server_seed: String, // secret
    server_seed_hash: String,
    client_seed: String,
    nonce: AtomicU64,
}

impl FairEngine {
    pub fn new(config: Arc<EngineConfig>, server_seed: String, client_seed: String) -> Self {
        let server_seed_hash = derive_hash_hex(server_seed.as_bytes());
        Self {
            config,
            server_seed,
            server_seed_hash,
            client_seed,
            nonce: AtomicU64::new(0),
        }
    }

    /// 32 random bytes, hex encoded.
    pub fn random_seed() -> String {
        let mut bytes = [0u8; 32];
        StdRng::from_entropy().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }
}

impl SpinEngine for FairEngine {
    fn compute_spin(&self, bet: f64) -> ApiResult<SpinOutcome> {
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst) + 1;
        let mut rng = ProvablyFairRng::new(&self.server_seed, &self.client_seed, nonce);
        let result = spin(bet, &self.config, &mut rng)?;
        Ok(SpinOutcome {
            result,
            proof: Some(SpinProof {
                server_seed_hash: self.server_seed_hash.clone(),
                client_seed: self.client_seed.clone(),
                nonce,
            }),
        })
    }

    fn server_seed_hash(&self) -> Option<String> {
        Some(self.server_seed_hash.clone())
    }
}

/// Default limit for one engine call.
pub const DEFAULT_ENGINE_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs an external program as `<program> <args..> play --bet <bet> --json`
/// and accepts only a well-formed spin result on stdout. The child is killed
/// once `timeout` passes.
pub struct ProcessEngine {
    config: Arc<EngineConfig>,
    program: String,
    args: Vec<String>,
    game_config: Option<PathBuf>,
    timeout: Duration,
}

impl ProcessEngine {
    pub fn new(config: Arc<EngineConfig>, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            config,
            program: program.into(),
            args,
            game_config: None,
            timeout: DEFAULT_ENGINE_TIMEOUT,
        }
    }

    /// Splits a command line on whitespace into program and arguments.
    pub fn from_command_line(config: Arc<EngineConfig>, command: &str) -> ApiResult<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| ApiError::Invalid("engine command is empty".into()))?;
        Ok(Self::new(config, program, parts.collect()))
    }

    /// Hands the server's game file to the child as `GAME_CONFIG`, so both
    /// sides evaluate the same paytable.
    pub fn with_game_config(mut self, path: Option<PathBuf>) -> Self {
        self.game_config = path;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn run(&self, bet: f64) -> ApiResult<Output> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .args(["play", "--bet", &bet.to_string(), "--json"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(path) = &self.game_config {
            command.env("GAME_CONFIG", path);
        }
        let mut child = command
            .spawn()
            .map_err(|e| ApiError::Engine(format!("cannot run {}: {e}", self.program)))?;

        // Pipes drain on their own threads; a full pipe would stall the child.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    warn!(
                        program = %self.program,
                        timeout_ms = self.timeout.as_millis() as u64,
                        "engine process killed"
                    );
                    return Err(ApiError::Engine(format!(
                        "{} timed out after {}ms",
                        self.program,
                        self.timeout.as_millis()
                    )));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    return Err(ApiError::Engine(format!(
                        "waiting for {}: {e}",
                        self.program
                    )));
                }
            }
        };
        let collect = |pipe: Option<thread::JoinHandle<Vec<u8>>>| {
            pipe.and_then(|h| h.join().ok()).unwrap_or_default()
        };
        Ok(Output {
            status,
            stdout: collect(stdout),
            stderr: collect(stderr),
        })
    }
}

const POLL_INTERVAL: Duration = Duration::from_millis(5);

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

impl SpinEngine for ProcessEngine {
    fn compute_spin(&self, bet: f64) -> ApiResult<SpinOutcome> {
        surge_core::validate_bet(bet)?;
        debug!(program = %self.program, bet, "spawning engine process");
        let output = self.run(bet)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ApiError::Engine(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        let result: SpinResult = serde_json::from_slice(&output.stdout)
            .map_err(|e| ApiError::Engine(format!("malformed engine output: {e}")))?;
        check_result(&result, &self.config, bet)?;
        Ok(SpinOutcome {
            result,
            proof: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use surge_core::{evaluate_board, Board, Symbol};

    fn config() -> Arc<EngineConfig> {
        Arc::new(EngineConfig::market_surge())
    }

    #[test]
    fn fair_engine_advances_nonce() {
        let engine = FairEngine::new(config(), "server".into(), "client".into());
        let a = engine.compute_spin(1.0).unwrap();
        let b = engine.compute_spin(1.0).unwrap();
        assert_eq!(a.proof.as_ref().unwrap().nonce, 1);
        assert_eq!(b.proof.as_ref().unwrap().nonce, 2);
        let replay =
            surge_core::spin_with_seeds("server", "client", 1, &EngineConfig::market_surge(), 1.0)
                .unwrap();
        assert_eq!(replay, a.result);
        assert_eq!(engine.server_seed_hash(), Some(derive_hash_hex(b"server")));
    }

    #[test]
    fn mock_engine_rejects_bad_bet() {
        let engine = MockEngine::new(config());
        assert_eq!(engine.compute_spin(0.0), Err(ApiError::InvalidBet));
        let out = engine.compute_spin(1.0).unwrap();
        assert_eq!(out.result.board.len(), 15);
        assert!(out.proof.is_none());
    }

    #[test]
    fn random_seeds_differ() {
        assert_ne!(FairEngine::random_seed(), FairEngine::random_seed());
        assert_eq!(FairEngine::random_seed().len(), 64);
    }

    #[test]
    fn empty_command_is_rejected() {
        assert!(ProcessEngine::from_command_line(config(), "   ").is_err());
    }

    #[cfg(unix)]
    fn shell_engine(script: &str) -> ProcessEngine {
        // extra args land in $1.. and are ignored by the script
        ProcessEngine::new(
            config(),
            "sh",
            vec!["-c".into(), script.into(), "engine".into()],
        )
    }

    #[cfg(unix)]
    #[test]
    fn process_engine_parses_stdout() {
        let result = evaluate_board(Board::new(vec![Symbol::Oil; 15]), &config(), 1.0);
        let json = serde_json::to_string(&result).unwrap();
        let engine = shell_engine(&format!("printf '%s' '{json}'"));
        let out = engine.compute_spin(1.0).unwrap();
        assert_eq!(out.result, result);
    }

    #[cfg(unix)]
    #[test]
    fn process_engine_rejects_garbage() {
        let engine = shell_engine("echo '{\"anything\": true}'");
        assert!(matches!(engine.compute_spin(1.0), Err(ApiError::Engine(_))));
    }

    #[cfg(unix)]
    #[test]
    fn process_engine_reports_exit_status() {
        let engine = shell_engine("echo boom >&2; exit 3");
        match engine.compute_spin(1.0) {
            Err(ApiError::Engine(msg)) => assert!(msg.contains("boom")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn process_engine_kills_hung_child() {
        let engine = shell_engine("sleep 30").with_timeout(Duration::from_millis(200));
        let started = Instant::now();
        match engine.compute_spin(1.0) {
            Err(ApiError::Engine(msg)) => assert!(msg.contains("timed out"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    fn process_engine_passes_game_config() {
        let result = evaluate_board(Board::new(vec![Symbol::Oil; 15]), &config(), 1.0);
        let json = serde_json::to_string(&result).unwrap();
        let script = format!(
            "test \"$GAME_CONFIG\" = /srv/game.json || exit 9; printf '%s' '{json}'"
        );
        let engine = shell_engine(&script);
        assert!(engine.compute_spin(1.0).is_err());
        let engine = shell_engine(&script).with_game_config(Some("/srv/game.json".into()));
        assert_eq!(engine.compute_spin(1.0).unwrap().result, result);
    }

    #[cfg(unix)]
    #[test]
    fn process_engine_checks_bet_echo() {
        let result = evaluate_board(Board::new(vec![Symbol::Oil; 15]), &config(), 2.0);
        let json = serde_json::to_string(&result).unwrap();
        let engine = shell_engine(&format!("printf '%s' '{json}'"));
        assert!(engine.compute_spin(1.0).is_err());
    }
}
