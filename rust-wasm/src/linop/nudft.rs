//! Non-uniform discrete Fourier transform
//!
//! Evaluates the Fourier transform of a batch of 2D images at arbitrary
//! k-space locations by direct summation:
//!
//! y_b(t) = (nx·ny)^(-1/2) Σ_{x,y} img_b(x,y) exp(-2πi [kx(t)(x - nx/2)/nx + ky(t)(y - ny/2)/ny])
//!
//! Coordinates are in cycles per FOV, so the sampled extent of k-space is
//! `[-n/2, n/2]`. The exponential is separable along x and y, so only the
//! 1D factors are stored.

use num_complex::Complex64;
use std::f64::consts::PI;

use super::LinearOperator;
use crate::error::{PtxError, Result};

/// NUDFT `[batch, ny, nx] -> [batch, nt]`
#[derive(Debug, Clone)]
pub struct Nudft {
    nx: usize,
    ny: usize,
    n_samples: usize,
    batch: usize,
    /// exp(-2πi kx(t) (x - nx/2)/nx), layout [t][x]
    phase_x: Vec<Complex64>,
    /// exp(-2πi ky(t) (y - ny/2)/ny), layout [t][y]
    phase_y: Vec<Complex64>,
    scale: f64,
    ishape: Vec<usize>,
    oshape: Vec<usize>,
}

/// 1D phase factors for a centered grid of length `n`
fn phase_factors(k: impl Iterator<Item = f64>, n: usize) -> Vec<Complex64> {
    let center = (n / 2) as f64;
    let mut out = Vec::new();
    for kt in k {
        for i in 0..n {
            let arg = -2.0 * PI * kt * (i as f64 - center) / n as f64;
            out.push(Complex64::from_polar(1.0, arg));
        }
    }
    out
}

impl Nudft {
    /// # Arguments
    /// * `batch` - Number of images transformed together (coils)
    /// * `nx`, `ny` - Image grid
    /// * `coord` - k-space sample locations `[kx, ky]` in cycles/FOV
    pub fn new(batch: usize, nx: usize, ny: usize, coord: &[[f64; 2]]) -> Result<Self> {
        if batch == 0 || nx == 0 || ny == 0 {
            return Err(PtxError::invalid("nudft", "batch and grid size must be > 0"));
        }
        if coord.is_empty() {
            return Err(PtxError::invalid("coord", "trajectory has no samples"));
        }
        if coord.iter().any(|k| !k[0].is_finite() || !k[1].is_finite()) {
            return Err(PtxError::invalid("coord", "trajectory contains non-finite samples"));
        }

        let n_samples = coord.len();
        let n_img = PtxError::checked_size("nudft", &[ny, nx])?;
        PtxError::checked_size("nudft", &[batch, n_img])?;
        PtxError::checked_size("nudft", &[batch, n_samples])?;
        PtxError::checked_size("coord", &[n_samples, nx.max(ny)])?;
        Ok(Self {
            nx,
            ny,
            n_samples,
            batch,
            phase_x: phase_factors(coord.iter().map(|k| k[0]), nx),
            phase_y: phase_factors(coord.iter().map(|k| k[1]), ny),
            scale: 1.0 / (n_img as f64).sqrt(),
            ishape: vec![batch, ny, nx],
            oshape: vec![batch, n_samples],
        })
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }
}

impl LinearOperator for Nudft {
    fn ishape(&self) -> &[usize] {
        &self.ishape
    }

    fn oshape(&self) -> &[usize] {
        &self.oshape
    }

    fn apply(&self, x: &[Complex64]) -> Vec<Complex64> {
        let (nx, ny, nt) = (self.nx, self.ny, self.n_samples);
        let n_img = nx * ny;
        debug_assert_eq!(x.len(), self.batch * n_img);

        let mut out = vec![Complex64::new(0.0, 0.0); self.batch * nt];
        for b in 0..self.batch {
            let img = &x[b * n_img..(b + 1) * n_img];
            for t in 0..nt {
                let ex = &self.phase_x[t * nx..(t + 1) * nx];
                let ey = &self.phase_y[t * ny..(t + 1) * ny];
                let mut acc = Complex64::new(0.0, 0.0);
                for j in 0..ny {
                    let row = &img[j * nx..(j + 1) * nx];
                    let row_sum: Complex64 = row.iter().zip(ex.iter()).map(|(v, e)| v * e).sum();
                    acc += ey[j] * row_sum;
                }
                out[b * nt + t] = acc * self.scale;
            }
        }
        out
    }

    fn apply_adjoint(&self, y: &[Complex64]) -> Vec<Complex64> {
        let (nx, ny, nt) = (self.nx, self.ny, self.n_samples);
        let n_img = nx * ny;
        debug_assert_eq!(y.len(), self.batch * nt);

        let mut out = vec![Complex64::new(0.0, 0.0); self.batch * n_img];
        for b in 0..self.batch {
            let img = &mut out[b * n_img..(b + 1) * n_img];
            for t in 0..nt {
                let v = y[b * nt + t] * self.scale;
                if v == Complex64::new(0.0, 0.0) {
                    continue;
                }
                let ex = &self.phase_x[t * nx..(t + 1) * nx];
                let ey = &self.phase_y[t * ny..(t + 1) * ny];
                for j in 0..ny {
                    let w = v * ey[j].conj();
                    for (o, e) in img[j * nx..(j + 1) * nx].iter_mut().zip(ex.iter()) {
                        *o += w * e.conj();
                    }
                }
            }
        }
        out
    }
}
