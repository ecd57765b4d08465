//! Random sources.
//!
//! Sampling code never owns or seeds a generator. It draws from a
//! [`DrawSource`] passed in by the caller, which is either a real `rand`
//! generator (seeded once per session) or a [`ScriptedDraws`] replaying a
//! fixed script so that rankings can be pinned exactly in tests.
//!
//! For several independent runs in one process, [`RngHierarchy`] expands a
//! master seed into per-run sub-seeds via BLAKE3. Derivation is hash-based,
//! not order-dependent, so run 3 gets the same stream whether or not runs
//! 0..3 were executed first.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// The draws the sampler and simulator need from a random source.
pub trait DrawSource {
    /// Uniform integer in `[0, bound)`. Returns 0 when `bound` is 0.
    fn below(&mut self, bound: u64) -> u64;

    /// `true` with probability `p`.
    fn chance(&mut self, p: f64) -> bool;
}

impl<R: Rng> DrawSource for R {
    fn below(&mut self, bound: u64) -> u64 {
        if bound == 0 {
            return 0;
        }
        self.gen_range(0..bound)
    }

    fn chance(&mut self, p: f64) -> bool {
        self.gen::<f64>() < p
    }
}

/// Deterministic source replaying a fixed script.
///
/// Integer draws and coin flips are kept in separate scripts, each replayed
/// cyclically. Integer draws are reduced modulo the requested bound so a
/// draw always lands in range.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDraws {
    draws: Vec<u64>,
    coins: Vec<bool>,
    next_draw: usize,
    next_coin: usize,
}

impl ScriptedDraws {
    pub fn new(draws: impl Into<Vec<u64>>) -> Self {
        Self {
            draws: draws.into(),
            ..Self::default()
        }
    }

    /// Script the results of `chance()` calls. An empty script always yields `false`.
    pub fn with_coins(mut self, coins: impl Into<Vec<bool>>) -> Self {
        self.coins = coins.into();
        self
    }

    /// Number of integer draws consumed so far.
    pub fn draws_taken(&self) -> usize {
        self.next_draw
    }
}

impl DrawSource for ScriptedDraws {
    fn below(&mut self, bound: u64) -> u64 {
        if bound == 0 || self.draws.is_empty() {
            return 0;
        }
        let value = self.draws[self.next_draw % self.draws.len()];
        self.next_draw += 1;
        value % bound
    }

    fn chance(&mut self, _p: f64) -> bool {
        if self.coins.is_empty() {
            return false;
        }
        let value = self.coins[self.next_coin % self.coins.len()];
        self.next_coin += 1;
        value
    }
}

/// The one generator for a session: seeded if a seed is given, from OS
/// entropy otherwise. Call once at startup and pass it down.
pub fn session_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Deterministic per-run seed derivation.
#[derive(Debug, Clone)]
pub struct RngHierarchy {
    master_seed: u64,
}

impl RngHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Sub-seed for run `run_index` of the configuration identified by `run_id`.
    pub fn sub_seed(&self, run_id: &str, run_index: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(run_id.as_bytes());
        hasher.update(&run_index.to_le_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    pub fn rng_for(&self, run_id: &str, run_index: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(run_id, run_index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_draws_cycle_and_wrap() {
        let mut source = ScriptedDraws::new(vec![0, 5, 12]);
        assert_eq!(source.below(10), 0);
        assert_eq!(source.below(10), 5);
        assert_eq!(source.below(10), 2);
        assert_eq!(source.below(10), 0);
        assert_eq!(source.draws_taken(), 4);
    }

    #[test]
    fn scripted_coins_default_to_false() {
        let mut source = ScriptedDraws::new(vec![]);
        assert!(!source.chance(1.0));

        let mut source = ScriptedDraws::new(vec![]).with_coins(vec![true, false]);
        assert!(source.chance(0.0));
        assert!(!source.chance(1.0));
        assert!(source.chance(0.0));
    }

    #[test]
    fn rng_draws_stay_in_range() {
        let mut rng = session_rng(Some(7));
        for bound in 1..50u64 {
            assert!(rng.below(bound) < bound);
        }
        assert_eq!(rng.below(0), 0);
    }

    #[test]
    fn chance_extremes() {
        let mut rng = session_rng(Some(7));
        for _ in 0..100 {
            assert!(!rng.chance(0.0));
            assert!(rng.chance(1.0));
        }
    }

    #[test]
    fn seeded_sessions_repeat() {
        let mut a = session_rng(Some(99));
        let mut b = session_rng(Some(99));
        let xs: Vec<u64> = (0..20).map(|_| a.below(1000)).collect();
        let ys: Vec<u64> = (0..20).map(|_| b.below(1000)).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn sub_seeds_are_deterministic() {
        let hierarchy = RngHierarchy::new(42);
        assert_eq!(hierarchy.sub_seed("run", 0), hierarchy.sub_seed("run", 0));
    }

    #[test]
    fn different_runs_different_seeds() {
        let hierarchy = RngHierarchy::new(42);
        assert_ne!(hierarchy.sub_seed("run", 0), hierarchy.sub_seed("run", 1));
        assert_ne!(hierarchy.sub_seed("run", 0), hierarchy.sub_seed("other", 0));
    }

    #[test]
    fn derivation_order_independent() {
        let hierarchy = RngHierarchy::new(42);
        let first = hierarchy.sub_seed("run", 3);
        let _ = hierarchy.sub_seed("run", 0);
        let _ = hierarchy.sub_seed("run", 1);
        assert_eq!(first, hierarchy.sub_seed("run", 3));
    }

    #[test]
    fn different_master_seeds_different_output() {
        let h1 = RngHierarchy::new(42);
        let h2 = RngHierarchy::new(43);
        assert_ne!(h1.sub_seed("run", 0), h2.sub_seed("run", 0));
    }
}
