//! Block id generation.
//!
//! Ids are 8 characters from a 64-symbol alphabet (48 bits). For `n` ids in
//! one document the chance of any collision is roughly `n² / 2^49`, about
//! one in 560 million for a thousand blocks. Callers pass a generator in, so
//! tests can use a deterministic one.

use rand::rngs::ThreadRng;
use rand::Rng;

/// Symbols used in block ids.
pub const BLOCK_ID_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// Length of a generated block id.
pub const BLOCK_ID_LEN: usize = 8;

/// Source of fresh block ids.
pub trait BlockIdGenerator {
    /// Produce the next id.
    fn next_id(&mut self) -> String;
}

impl<G: BlockIdGenerator + ?Sized> BlockIdGenerator for &mut G {
    fn next_id(&mut self) -> String {
        (**self).next_id()
    }
}

/// Ids drawn from a random number generator.
#[derive(Debug, Clone)]
pub struct RandomIdGenerator<R = ThreadRng> {
    rng: R,
}

impl RandomIdGenerator<ThreadRng> {
    /// Generator backed by the thread-local RNG.
    pub fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }
}

impl Default for RandomIdGenerator<ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> RandomIdGenerator<R> {
    /// Generator backed by a caller-supplied RNG.
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> BlockIdGenerator for RandomIdGenerator<R> {
    fn next_id(&mut self) -> String {
        (0..BLOCK_ID_LEN)
            .map(|_| BLOCK_ID_ALPHABET[self.rng.gen_range(0..BLOCK_ID_ALPHABET.len())] as char)
            .collect()
    }
}

/// Deterministic ids: blake3 keyed by a seed over an incrementing counter.
#[derive(Debug, Clone)]
pub struct SeededIdGenerator {
    seed: [u8; 32],
    counter: u64,
}

impl SeededIdGenerator {
    /// Create a generator from a seed.
    pub fn new(seed: [u8; 32]) -> Self {
        Self { seed, counter: 0 }
    }

    /// Create a generator from an arbitrary label.
    pub fn from_label(label: &str) -> Self {
        Self::new(*blake3::hash(label.as_bytes()).as_bytes())
    }
}

impl BlockIdGenerator for SeededIdGenerator {
    fn next_id(&mut self) -> String {
        let hash = blake3::keyed_hash(&self.seed, &self.counter.to_le_bytes());
        self.counter += 1;
        hash.as_bytes()[..BLOCK_ID_LEN]
            .iter()
            .map(|b| BLOCK_ID_ALPHABET[(b & 63) as usize] as char)
            .collect()
    }
}
