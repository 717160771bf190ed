//! Random number generation seam.
//!
//! Particle creation and momentum sampling only ever need a handful of
//! primitive draws, so rather than thread a concrete `rand::Rng` generic
//! through every density profile and distribution we abstract over a small
//! trait. Tests and deterministic replays can hand in a fixed-seed
//! generator; production code uses the blanket impl over any `rand::Rng`.

use crate::Float;
use rand::Rng;
use rand_distr::{Distribution, Normal, StandardNormal};

pub trait UniformDraw {
    /// Uniform draw in `[0, 1)`.
    fn uniform(&mut self) -> Float;

    /// Uniform draw in `[lo, hi)`.
    fn uniform_range(&mut self, lo: Float, hi: Float) -> Float {
        lo + self.uniform() * (hi - lo)
    }

    /// Standard normal draw, mean 0 variance 1.
    fn normal(&mut self) -> Float;
}

impl<R: Rng + ?Sized> UniformDraw for R {
    fn uniform(&mut self) -> Float {
        self.gen::<Float>()
    }

    fn normal(&mut self) -> Float {
        let z: Float = StandardNormal.sample(self);
        z
    }
}

/// Draws a normal deviate with the given mean and standard deviation.
pub fn normal_with(rng: &mut impl UniformDraw, mean: Float, std_dev: Float) -> Float {
    mean + std_dev * rng.normal()
}

/// Builds a `rand_distr::Normal` for callers that need repeated draws from
/// the same distribution and prefer to avoid re-deriving mean/std each call.
pub fn normal_distribution(mean: Float, std_dev: Float) -> Normal<Float> {
    Normal::new(mean, std_dev).expect("non-negative standard deviation")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn uniform_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1000 {
            let u = rng.uniform_range(-2.0, 3.0);
            assert!(u >= -2.0 && u < 3.0);
        }
    }
}
