//! Target magnetization patterns
//!
//! A target is a complex 2D map on the design grid (index = x + y*nx).
//! Targets come either from a NIfTI image (magnitude into the real part)
//! or from simple procedural shapes.

use num_complex::Complex64;
use std::path::Path;

use crate::error::{PtxError, Result};
use crate::nifti_io::{self, NiftiData};

/// Desired excitation pattern
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub data: Vec<Complex64>,
    pub nx: usize,
    pub ny: usize,
}

impl Target {
    pub fn new(data: Vec<Complex64>, nx: usize, ny: usize) -> Result<Self> {
        if nx == 0 || ny == 0 {
            return Err(PtxError::invalid("target", "grid dimensions must be > 0"));
        }
        let n = PtxError::checked_size("target", &[ny, nx])?;
        PtxError::check_shape("target", &[n], &[data.len()])?;
        Ok(Self { data, nx, ny })
    }

    /// Build from real-valued pixels
    pub fn from_real(values: &[f64], nx: usize, ny: usize) -> Result<Self> {
        Self::new(values.iter().map(|&v| Complex64::new(v, 0.0)).collect(), nx, ny)
    }

    /// Uniform disc centered on the grid
    ///
    /// `radius` is a fraction of the half-FOV; pixels inside get `flip`.
    pub fn disc(nx: usize, ny: usize, radius: f64, flip: f64) -> Result<Self> {
        let values = shape_mask(nx, ny, |x, y| x * x + y * y <= radius * radius)?
            .into_iter()
            .map(|inside| if inside { flip } else { 0.0 })
            .collect::<Vec<_>>();
        Self::from_real(&values, nx, ny)
    }

    /// Axis-aligned rectangle centered on the grid
    ///
    /// `half_width`, `half_height` are fractions of the half-FOV.
    pub fn rect(nx: usize, ny: usize, half_width: f64, half_height: f64, flip: f64) -> Result<Self> {
        let values = shape_mask(nx, ny, |x, y| x.abs() <= half_width && y.abs() <= half_height)?
            .into_iter()
            .map(|inside| if inside { flip } else { 0.0 })
            .collect::<Vec<_>>();
        Self::from_real(&values, nx, ny)
    }

    /// Load from NIfTI bytes; 3D volumes contribute their first slice
    pub fn from_nifti_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_nifti(nifti_io::load_nifti(bytes)?)
    }

    pub fn from_nifti_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_nifti(nifti_io::load_nifti_file(path)?)
    }

    fn from_nifti(nifti: NiftiData) -> Result<Self> {
        let (nx, ny, _) = nifti.dims;
        let slice = &nifti.data[..nx * ny];
        if slice.iter().any(|v| !v.is_finite()) {
            return Err(PtxError::Nifti("target contains non-finite values".to_string()));
        }
        Self::from_real(slice, nx, ny)
    }

    /// Magnitude image, for display and export
    pub fn magnitude(&self) -> Vec<f64> {
        self.data.iter().map(|c| c.norm()).collect()
    }
}

/// Evaluate `inside(x, y)` on normalized coordinates in [-1, 1)
fn shape_mask(nx: usize, ny: usize, inside: impl Fn(f64, f64) -> bool) -> Result<Vec<bool>> {
    let half_x = nx as f64 / 2.0;
    let half_y = ny as f64 / 2.0;
    let mut mask = Vec::with_capacity(PtxError::checked_size("target", &[ny, nx])?);
    for j in 0..ny {
        let y = (j as f64 - half_y) / half_y;
        for i in 0..nx {
            let x = (i as f64 - half_x) / half_x;
            mask.push(inside(x, y));
        }
    }
    Ok(mask)
}
