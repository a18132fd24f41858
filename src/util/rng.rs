//! Seeded per-bot random generator
//!
//! Every bot owns its own linear congruential generator so that a session
//! replayed with the same seeds makes the same decisions. Nothing here touches
//! the thread-local RNG.

/// 32-bit linear congruential generator (Numerical Recipes constants)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotRng {
    state: u32,
}

const MULTIPLIER: u32 = 1_664_525;
const INCREMENT: u32 = 1_013_904_223;

impl BotRng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Derive a seed from a player id so bots in one session diverge
    pub fn seed_from_bytes(bytes: &[u8]) -> u32 {
        // FNV-1a
        bytes.iter().fold(0x811c_9dc5u32, |hash, &b| {
            (hash ^ b as u32).wrapping_mul(0x0100_0193)
        })
    }

    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(MULTIPLIER).wrapping_add(INCREMENT);
        self.state
    }

    /// Uniform in [0, 1)
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        // Top 24 bits give an exactly representable f32 mantissa
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }

    /// Uniform in [0, n). Returns 0 when n is 0.
    pub fn next_index(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        (self.next_f32() * n as f32) as usize % n
    }

    /// Uniform in [min, max)
    pub fn range_f32(&mut self, min: f32, max: f32) -> f32 {
        min + (max - min) * self.next_f32()
    }

    pub fn state(&self) -> u32 {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = BotRng::new(42);
        let mut b = BotRng::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut a = BotRng::new(1);
        let mut b = BotRng::new(2);
        let same = (0..20).filter(|_| a.next_u32() == b.next_u32()).count();
        assert!(same < 20);
    }

    #[test]
    fn test_f32_in_unit_range() {
        let mut rng = BotRng::new(7);
        for _ in 0..1000 {
            let v = rng.next_f32();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_next_index_bounds() {
        let mut rng = BotRng::new(99);
        for _ in 0..1000 {
            assert!(rng.next_index(8) < 8);
        }
        assert_eq!(rng.next_index(0), 0);
    }

    #[test]
    fn test_seed_from_bytes_is_stable() {
        let a = BotRng::seed_from_bytes(b"bot-1");
        let b = BotRng::seed_from_bytes(b"bot-1");
        let c = BotRng::seed_from_bytes(b"bot-2");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
