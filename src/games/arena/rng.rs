//! Seeded randomness for loot, affix rolls, wander directions and boss
//! ability chances. One `GameRng` lives in the simulation context so a
//! fixed seed reproduces a whole run in tests.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[derive(Clone, Debug)]
pub struct GameRng {
    inner: ChaCha8Rng,
}

impl GameRng {
    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Uniform float in `[0, 1)`.
    pub fn unit(&mut self) -> f64 {
        self.inner.random::<f64>()
    }

    /// True with probability `p` (clamped to `[0, 1]`).
    pub fn chance(&mut self, p: f64) -> bool {
        if !p.is_finite() || p <= 0.0 {
            return false;
        }
        self.inner.random_bool(p.min(1.0))
    }

    /// Uniform integer in `[lo, hi]`; returns `lo` when the range is empty.
    pub fn int_inclusive(&mut self, lo: i64, hi: i64) -> i64 {
        if hi <= lo {
            return lo;
        }
        self.inner.random_range(lo..=hi)
    }

    /// Uniform float in `[lo, hi]`; returns `lo` when the range is empty.
    pub fn float_inclusive(&mut self, lo: f64, hi: f64) -> f64 {
        if !(hi > lo) {
            return lo;
        }
        self.inner.random_range(lo..=hi)
    }

    /// Uniform index below `len`; `None` for an empty collection.
    pub fn index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            None
        } else {
            Some(self.inner.random_range(0..len))
        }
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        let i = self.index(items.len())?;
        items.get(i)
    }

    /// Weighted draw over `(value, weight)` pairs. Non-positive weights are
    /// never selected; `None` when nothing has positive weight.
    pub fn weighted<T: Copy>(&mut self, table: &[(T, f64)]) -> Option<T> {
        let total: f64 = table.iter().map(|(_, w)| w.max(0.0)).sum();
        if total <= 0.0 {
            return None;
        }
        let mut roll = self.unit() * total;
        for (value, weight) in table {
            if *weight <= 0.0 {
                continue;
            }
            if roll < *weight {
                return Some(*value);
            }
            roll -= weight;
        }
        table.iter().rev().find(|(_, w)| *w > 0.0).map(|(v, _)| *v)
    }

    /// Random unit vector.
    pub fn direction(&mut self) -> Vec2 {
        let angle = self.inner.random_range(0.0..std::f32::consts::TAU);
        Vec2::from_angle(angle)
    }
}
