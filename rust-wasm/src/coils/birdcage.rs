//! Simulated birdcage-coil sensitivity maps
//!
//! Each of `nc` coil elements sits on a circle of radius `r` (in units of
//! the half-FOV) around the grid center. The field of element c at
//! normalized position (x, y) is modeled as
//!
//! S_c = exp(i (atan2(x - x_c, -(y - y_c)) - 2πc/nc)) / |(x, y) - (x_c, y_c)|
//!
//! and the maps are normalized by their root-sum-of-squares so that
//! Σ_c |S_c|² = 1 at every voxel.

use num_complex::Complex64;
use std::f64::consts::{PI, SQRT_2};

use crate::error::{PtxError, Result};

/// Generate birdcage sensitivity maps
///
/// # Arguments
/// * `n_coils` - Number of transmit coils
/// * `nx`, `ny` - Grid dimensions
/// * `radius` - Coil circle radius relative to the half-FOV (must exceed √2)
///
/// # Returns
/// Flattened maps of size nc*nx*ny, index = x + y*nx + c*nx*ny
pub fn birdcage_maps(n_coils: usize, nx: usize, ny: usize, radius: f64) -> Result<Vec<Complex64>> {
    if n_coils == 0 {
        return Err(PtxError::invalid("n_coils", "must be > 0"));
    }
    if nx == 0 || ny == 0 {
        return Err(PtxError::invalid("grid", "dimensions must be > 0"));
    }
    // Keep every coil outside the imaged square
    if !radius.is_finite() || radius <= SQRT_2 {
        return Err(PtxError::invalid("radius", format!("must be finite and > √2, got {}", radius)));
    }

    let n_vox = PtxError::checked_size("grid", &[ny, nx])?;
    let mut maps = vec![Complex64::new(0.0, 0.0); PtxError::checked_size("grid", &[n_coils, n_vox])?];
    let half_x = nx as f64 / 2.0;
    let half_y = ny as f64 / 2.0;

    for c in 0..n_coils {
        let angle = c as f64 * 2.0 * PI / n_coils as f64;
        let coil_x = radius * angle.cos();
        let coil_y = radius * angle.sin();

        for j in 0..ny {
            let y_co = (j as f64 - half_y) / half_y - coil_y;
            for i in 0..nx {
                let x_co = (i as f64 - half_x) / half_x - coil_x;
                let rr = (x_co * x_co + y_co * y_co).sqrt();
                let phi = x_co.atan2(-y_co) - angle;
                maps[c * n_vox + j * nx + i] = Complex64::from_polar(1.0 / rr, phi);
            }
        }
    }

    // Root-sum-of-squares normalization
    for v in 0..n_vox {
        let rss: f64 = (0..n_coils)
            .map(|c| maps[c * n_vox + v].norm_sqr())
            .sum::<f64>()
            .sqrt();
        for c in 0..n_coils {
            maps[c * n_vox + v] /= rss;
        }
    }

    Ok(maps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rss_normalized() {
        let (nc, nx, ny) = (8, 16, 12);
        let maps = birdcage_maps(nc, nx, ny, 1.5).unwrap();
        assert_eq!(maps.len(), nc * nx * ny);

        for v in 0..nx * ny {
            let ss: f64 = (0..nc).map(|c| maps[c * nx * ny + v].norm_sqr()).sum();
            assert!((ss - 1.0).abs() < 1e-10, "sum of squares at voxel {} is {}", v, ss);
        }
    }

    #[test]
    fn test_coil_nearest_voxel_is_strongest() {
        // Coil 0 sits on the +x axis, so it dominates the right edge
        let (nc, n) = (4, 16);
        let maps = birdcage_maps(nc, n, n, 1.5).unwrap();
        let v = (n / 2) * n + (n - 1);
        let mags: Vec<f64> = (0..nc).map(|c| maps[c * n * n + v].norm()).collect();
        for c in 1..nc {
            assert!(mags[0] > mags[c], "coil 0 should dominate: {:?}", mags);
        }
    }

    #[test]
    fn test_rejects_coil_inside_fov() {
        assert!(birdcage_maps(8, 16, 16, 1.0).is_err());
        assert!(birdcage_maps(0, 16, 16, 1.5).is_err());
        assert!(birdcage_maps(8, 0, 16, 1.5).is_err());
        assert!(birdcage_maps(2, usize::MAX, 2, 1.5).is_err());
    }

    #[test]
    fn test_deterministic() {
        let a = birdcage_maps(3, 8, 8, 2.0).unwrap();
        let b = birdcage_maps(3, 8, 8, 2.0).unwrap();
        assert_eq!(a, b);
    }
}
