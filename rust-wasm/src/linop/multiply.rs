//! Coil-sensitivity multiply operator
//!
//! Maps a single image to one weighted copy per transmit coil:
//!
//! y_c(r) = S_c(r) · x(r)
//!
//! The adjoint combines coil images: x(r) = Σ_c conj(S_c(r)) · y_c(r).

use num_complex::Complex64;

use super::LinearOperator;
use crate::error::{PtxError, Result};

/// Sensitivity weighting `[ny, nx] -> [nc, ny, nx]`
#[derive(Debug, Clone)]
pub struct SensitivityMultiply {
    sens: Vec<Complex64>,
    n_coils: usize,
    n_voxels: usize,
    ishape: Vec<usize>,
    oshape: Vec<usize>,
}

impl SensitivityMultiply {
    /// Build from flattened maps (index = x + y*nx + c*nx*ny)
    pub fn new(sens: Vec<Complex64>, n_coils: usize, nx: usize, ny: usize) -> Result<Self> {
        if n_coils == 0 || nx == 0 || ny == 0 {
            return Err(PtxError::invalid("sens", "coil count and grid size must be > 0"));
        }
        let n_voxels = PtxError::checked_size("sens", &[ny, nx])?;
        let expected = PtxError::checked_size("sens", &[n_coils, n_voxels])?;
        PtxError::check_shape("sensitivity maps", &[expected], &[sens.len()])?;

        Ok(Self {
            sens,
            n_coils,
            n_voxels,
            ishape: vec![ny, nx],
            oshape: vec![n_coils, ny, nx],
        })
    }

    pub fn n_coils(&self) -> usize {
        self.n_coils
    }

    /// Sensitivity map of coil `c`
    pub fn coil_map(&self, c: usize) -> &[Complex64] {
        &self.sens[c * self.n_voxels..(c + 1) * self.n_voxels]
    }
}

impl LinearOperator for SensitivityMultiply {
    fn ishape(&self) -> &[usize] {
        &self.ishape
    }

    fn oshape(&self) -> &[usize] {
        &self.oshape
    }

    fn apply(&self, x: &[Complex64]) -> Vec<Complex64> {
        debug_assert_eq!(x.len(), self.n_voxels);
        let mut out = Vec::with_capacity(self.sens.len());
        for c in 0..self.n_coils {
            out.extend(self.coil_map(c).iter().zip(x.iter()).map(|(s, xi)| s * xi));
        }
        out
    }

    fn apply_adjoint(&self, y: &[Complex64]) -> Vec<Complex64> {
        debug_assert_eq!(y.len(), self.sens.len());
        let mut out = vec![Complex64::new(0.0, 0.0); self.n_voxels];
        for c in 0..self.n_coils {
            let yc = &y[c * self.n_voxels..(c + 1) * self.n_voxels];
            for ((o, s), yi) in out.iter_mut().zip(self.coil_map(c).iter()).zip(yc.iter()) {
                *o += s.conj() * yi;
            }
        }
        out
    }
}
