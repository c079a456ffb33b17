use crate::complex::Complex;
use crate::fractal::{Fractal, IterationResult};

/// The Mandelbrot set: `z_{n+1} = z_n² + c`, starting from `z₀ = 0`.
#[derive(Debug, Clone, Copy)]
pub struct Mandelbrot {
    max_iterations: u32,
}

impl Mandelbrot {
    pub fn new(max_iterations: u32) -> Self {
        Self { max_iterations }
    }
}

/// Returns `true` if `c` lies inside the main cardioid.
#[inline]
fn in_cardioid(re: f64, im: f64) -> bool {
    let im2 = im * im;
    let q = (re - 0.25) * (re - 0.25) + im2;
    q * (q + (re - 0.25)) <= 0.25 * im2
}

/// Returns `true` if `c` lies inside the period-2 bulb.
#[inline]
fn in_period2_bulb(re: f64, im: f64) -> bool {
    (re + 1.0) * (re + 1.0) + im * im <= 0.0625
}

impl Fractal for Mandelbrot {
    fn iterate(&self, c: Complex) -> IterationResult {
        // Both regions never escape, so skipping them cannot change a result.
        if in_cardioid(c.re, c.im) || in_period2_bulb(c.re, c.im) {
            return IterationResult::Interior;
        }

        let mut z = Complex::ZERO;
        let mut n = 0u32;
        while z.norm_sq() < 4.0 {
            z = z.square_add(c);
            n += 1;
            if n > self.max_iterations {
                break;
            }
        }

        if n >= self.max_iterations {
            IterationResult::Interior
        } else {
            IterationResult::Escaped { iterations: n }
        }
    }

    fn max_iterations(&self) -> u32 {
        self.max_iterations
    }
}
