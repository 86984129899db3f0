//! Deterministic random number generation.
//!
//! RULE: Nothing in the pipeline may call any platform RNG.
//! All randomness flows through StageRng instances derived
//! from the single master seed handed to the engine.
//!
//! Each stage gets its own RNG stream, seeded deterministically from
//! (master_seed, stage slot, invocation discriminator). This means:
//!   - Adding a new stage never changes existing stages' streams.
//!   - Two FNOL invocations in one run draw from different streams.
//!   - A claims invocation's stream depends only on its trigger key,
//!     so redelivering the same notification replays the same draws.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

const SLOT_MIX: u64 = 0x9e37_79b9_7f4a_7c15;
const INVOCATION_MIX: u64 = 0xbf58_476d_1ce4_e5b9;

/// A named, deterministic RNG for a single stage invocation.
pub struct StageRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl StageRng {
    /// Create a stage RNG from the master seed, a stable stage index and
    /// an invocation discriminator.
    pub fn new(master_seed: u64, stage_index: u64, discriminator: u64) -> Self {
        let derived_seed = master_seed
            ^ stage_index.wrapping_mul(SLOT_MIX)
            ^ discriminator.wrapping_mul(INVOCATION_MIX);
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Draw a raw u64 (full range).
    pub fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Roll an integer in [lo, hi], both ends inclusive.
    pub fn range_inclusive(&mut self, lo: i64, hi: i64) -> i64 {
        assert!(lo <= hi, "empty range {lo}..={hi}");
        let span = (hi - lo) as u64 + 1;
        lo + self.next_u64_below(span) as i64
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Pick one element uniformly.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        assert!(!items.is_empty(), "pick() from empty slice");
        &items[self.next_u64_below(items.len() as u64) as usize]
    }

    pub fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest);
    }
}

/// Hands out stage RNGs for a single run.
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Stream for the `sequence`-th scheduled invocation of a stage.
    pub fn for_invocation(&self, slot: StageSlot, sequence: u64) -> StageRng {
        StageRng::new(self.master_seed, slot as u64, sequence).with_name(slot.name())
    }

    /// Stream for a triggered invocation, keyed by the object that fired it.
    pub fn for_key(&self, slot: StageSlot, key: &str) -> StageRng {
        StageRng::new(self.master_seed, slot as u64, fnv1a(key.as_bytes())).with_name(slot.name())
    }
}

/// Stable stage slot assignments.
/// NEVER reorder or remove entries. Append only.
/// Reordering changes every stage's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum StageSlot {
    Policy = 0,
    Fnol = 1,
    Claims = 2,
    // Add new stages here, append only.
}

impl StageSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Policy => "policy",
            Self::Fnol => "fnol",
            Self::Claims => "claims",
        }
    }
}

/// 64-bit FNV-1a over the raw bytes of a key.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let bank = RngBank::new(7);
        let mut a = bank.for_invocation(StageSlot::Fnol, 3);
        let mut b = bank.for_invocation(StageSlot::Fnol, 3);
        for _ in 0..32 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn invocations_and_slots_diverge() {
        let bank = RngBank::new(7);
        let first = bank.for_invocation(StageSlot::Fnol, 0).next_u64();
        let second = bank.for_invocation(StageSlot::Fnol, 1).next_u64();
        let other_slot = bank.for_invocation(StageSlot::Claims, 0).next_u64();
        assert_ne!(first, second);
        assert_ne!(first, other_slot);
    }

    #[test]
    fn keyed_streams_follow_the_key() {
        let bank = RngBank::new(99);
        let key = "raw/fnol_events/fnol_20250615_120000.json";
        assert_eq!(
            bank.for_key(StageSlot::Claims, key).next_u64(),
            bank.for_key(StageSlot::Claims, key).next_u64()
        );
        assert_ne!(
            bank.for_key(StageSlot::Claims, key).next_u64(),
            bank.for_key(StageSlot::Claims, "raw/fnol_events/other.json").next_u64()
        );
    }

    #[test]
    fn range_inclusive_hits_both_ends() {
        let mut rng = RngBank::new(1).for_invocation(StageSlot::Policy, 0);
        let mut seen = [false; 5];
        for _ in 0..500 {
            let v = rng.range_inclusive(1, 5);
            assert!((1..=5).contains(&v));
            seen[(v - 1) as usize] = true;
        }
        assert!(seen.iter().all(|s| *s), "every value in 1..=5 drawn: {seen:?}");
    }

    #[test]
    fn negative_ranges_are_supported() {
        let mut rng = RngBank::new(2).for_invocation(StageSlot::Claims, 0);
        for _ in 0..200 {
            let v = rng.range_inclusive(-2000, 5000);
            assert!((-2000..=5000).contains(&v));
        }
    }
}
