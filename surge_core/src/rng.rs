use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};

// Provably-fair stream: HMAC-SHA256(server_seed, "client_seed:nonce") gives the
// first 32-byte block; block k > 0 uses "client_seed:nonce:k".

pub type HmacSha256 = Hmac<Sha256>;

pub fn derive_hash_hex(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone)]
pub struct ProvablyFairRng {
    server_seed: String, // secret
    client_seed: String,
    nonce: u64,
    block: u64,
    buffer: [u8; 32],
    pos: usize,
}

impl ProvablyFairRng {
    pub fn new(server_seed: impl Into<String>, client_seed: impl Into<String>, nonce: u64) -> Self {
        let mut rng = Self {
            server_seed: server_seed.into(),
            client_seed: client_seed.into(),
            nonce,
            block: 0,
            buffer: [0u8; 32],
            pos: 0,
        };
        rng.buffer = rng.hmac_block(0);
        rng
    }

    pub fn client_seed(&self) -> &str {
        &self.client_seed
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn server_seed_hash_hex(&self) -> String {
        derive_hash_hex(self.server_seed.as_bytes())
    }

    pub fn hmac_block(&self, block: u64) -> [u8; 32] {
        let mut mac = HmacSha256::new_from_slice(self.server_seed.as_bytes())
            .expect("HMAC accepts keys of any length");
        let msg = if block == 0 {
            format!("{}:{}", self.client_seed, self.nonce)
        } else {
            format!("{}:{}:{}", self.client_seed, self.nonce, block)
        };
        mac.update(msg.as_bytes());
        let res = mac.finalize().into_bytes();
        let mut out = [0u8; 32];
        out.copy_from_slice(&res);
        out
    }

    fn next_byte(&mut self) -> u8 {
        if self.pos == self.buffer.len() {
            self.block += 1;
            self.buffer = self.hmac_block(self.block);
            self.pos = 0;
        }
        let b = self.buffer[self.pos];
        self.pos += 1;
        b
    }
}

impl RngCore for ProvablyFairRng {
    fn next_u32(&mut self) -> u32 {
        let mut bytes = [0u8; 4];
        self.fill_bytes(&mut bytes);
        u32::from_be_bytes(bytes)
    }

    fn next_u64(&mut self) -> u64 {
        let hi = self.next_u32() as u64;
        let lo = self.next_u32() as u64;
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for b in dest.iter_mut() {
            *b = self.next_byte();
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
