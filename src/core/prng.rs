// Minimal seedable PRNG (no external crates).
//
// This is NOT cryptographically secure.
// It drives the visitation order of the sequential scheduler, so the same seed
// must always yield the same sequence of permutations.

use crate::topology::NodeId;

#[derive(Debug, Clone)]
pub struct Prng {
    state: u64,
}

impl Prng {
    pub fn new(seed: u64) -> Self {
        Self::from_state(seed)
    }

    pub(crate) fn from_state(state: u64) -> Self {
        // Avoid a zero state.
        let state = if state == 0 {
            0x9E3779B97F4A7C15
        } else {
            state
        };
        Self { state }
    }

    pub(crate) fn state(&self) -> u64 {
        self.state
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        // xorshift64*
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    #[inline]
    pub fn next_f32_01(&mut self) -> f32 {
        // 24 random mantissa bits keep the result strictly below 1.0.
        let x = self.next_u32() >> 8;
        (x as f32) / ((1u32 << 24) as f32)
    }

    #[inline]
    pub fn gen_range_usize(&mut self, low: usize, high: usize) -> usize {
        if high <= low {
            return low;
        }
        let span = (high - low) as u64;
        let v = self.next_u64() % span;
        low + v as usize
    }

    /// In-place Fisher-Yates shuffle.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.gen_range_usize(0, i + 1);
            items.swap(i, j);
        }
    }

    /// Draw a fresh random visitation order over `population`.
    pub fn permutation(&mut self, population: &[NodeId]) -> Vec<NodeId> {
        let mut order = population.to_vec();
        self.shuffle(&mut order);
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_seed_is_remapped() {
        let mut a = Prng::new(0);
        assert_ne!(a.state(), 0);
        assert_ne!(a.next_u32(), 0);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = Prng::new(7);
        let mut items: Vec<usize> = (0..32).collect();
        rng.shuffle(&mut items);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..32).collect::<Vec<_>>());
    }

    #[test]
    fn unit_interval_draws_stay_in_range() {
        let mut rng = Prng::new(99);
        for _ in 0..1000 {
            let x = rng.next_f32_01();
            assert!((0.0..1.0).contains(&x));
        }
    }
}
