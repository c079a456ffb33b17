use crate::complex::Complex;
use crate::fractal::{Fractal, IterationResult};

/// A Julia set: `z_{n+1} = z_n² + seed`, where `z₀` is the point itself.
#[derive(Debug, Clone, Copy)]
pub struct Julia {
    seed: Complex,
    max_iterations: u32,
}

impl Julia {
    pub fn new(seed: Complex, max_iterations: u32) -> Self {
        Self {
            seed,
            max_iterations,
        }
    }

    /// The constant defining this Julia set.
    pub fn seed(&self) -> Complex {
        self.seed
    }
}

impl Fractal for Julia {
    fn iterate(&self, point: Complex) -> IterationResult {
        let mut z = point;
        for n in 0..self.max_iterations {
            if z.norm_sq() > 4.0 {
                let iterations = n + 1;
                return if iterations >= self.max_iterations {
                    IterationResult::Interior
                } else {
                    IterationResult::Escaped { iterations }
                };
            }
            z = z.square_add(self.seed);
        }
        IterationResult::Interior
    }

    fn max_iterations(&self) -> u32 {
        self.max_iterations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_seed_unit_disc_is_interior() {
        let j = Julia::new(Complex::ZERO, 128);
        assert_eq!(j.iterate(Complex::new(0.5, 0.5)), IterationResult::Interior);
    }

    #[test]
    fn outside_bailout_escapes_on_first_check() {
        let j = Julia::new(Complex::new(-0.7, 0.27015), 128);
        assert_eq!(
            j.iterate(Complex::new(3.0, 0.0)),
            IterationResult::Escaped { iterations: 1 }
        );
    }

    #[test]
    fn seed_is_kept() {
        let seed = Complex::new(-0.8, 0.156);
        assert_eq!(Julia::new(seed, 64).seed(), seed);
    }
}
