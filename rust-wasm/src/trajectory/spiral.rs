//! Archimedean spiral design under gradient hardware limits
//!
//! The spiral k(θ) = λθ·e^{iθ} with λ = 1/(2π·FOV) advances one FOV⁻¹ in
//! radius per turn and ends at kmax = 1/(2·res). Time evolution of θ is
//! integrated on a fine grid: each substep takes the largest angular
//! acceleration the slew limit allows, then clamps angular velocity to the
//! gradient amplitude limit. Samples are kept on the gradient raster.
//!
//! With θ' = ω and θ'' = a:
//!
//! dk/dt   = λ e^{iθ} ω (1 + iθ)
//! d²k/dt² = λ e^{iθ} [a (1 + iθ) + ω² (2i - θ)]

use num_complex::Complex64;

use crate::error::{PtxError, Result};

/// Gyromagnetic ratio of ¹H over 2π (Hz/T)
pub const GAMMA_BAR: f64 = 42.576e6;

/// Integration substeps per gradient raster interval
const OVERSAMPLING: usize = 8;

/// Upper bound on raster samples, guards against degenerate limits
const MAX_SAMPLES: usize = 1_000_000;

/// Spiral-out trajectory on the gradient raster
#[derive(Debug, Clone)]
pub struct SpiralTrajectory {
    /// k-space samples (1/m), starting at the origin
    pub k: Vec<[f64; 2]>,
    /// Gradient waveform (mT/m), one entry per raster interval
    pub gradient: Vec<[f64; 2]>,
    /// Slew rate (T/m/s) between consecutive gradient samples
    pub slew: Vec<[f64; 2]>,
    /// Raster time (s)
    pub dt: f64,
}

impl SpiralTrajectory {
    pub fn len(&self) -> usize {
        self.k.len()
    }

    pub fn is_empty(&self) -> bool {
        self.k.is_empty()
    }

    /// Sample times (s)
    pub fn times(&self) -> Vec<f64> {
        (0..self.k.len()).map(|i| i as f64 * self.dt).collect()
    }

    pub fn duration(&self) -> f64 {
        self.k.len().saturating_sub(1) as f64 * self.dt
    }

    /// Excitation k-space coordinates in cycles/FOV
    ///
    /// The trajectory is time-reversed so that it ends at the k-space
    /// origin at the end of the pulse.
    pub fn excitation_coords(&self, fov: f64) -> Vec<[f64; 2]> {
        self.k.iter().rev().map(|k| [k[0] * fov, k[1] * fov]).collect()
    }

    /// Gradient waveform (mT/m) that plays the excitation trajectory
    pub fn excitation_gradient(&self) -> Vec<[f64; 2]> {
        self.gradient.iter().rev().map(|g| [-g[0], -g[1]]).collect()
    }

    /// Largest gradient amplitude (mT/m)
    pub fn max_gradient(&self) -> f64 {
        self.gradient.iter().map(|g| g[0].hypot(g[1])).fold(0.0, f64::max)
    }

    /// Largest slew rate (T/m/s)
    pub fn max_slew(&self) -> f64 {
        self.slew.iter().map(|s| s[0].hypot(s[1])).fold(0.0, f64::max)
    }
}

/// Largest angular acceleration keeping |d²k/dt²| ≤ γ·smax/λ
#[inline]
fn max_angular_accel(theta: f64, omega: f64, limit: f64) -> f64 {
    let a = Complex64::new(1.0, theta);
    let b = Complex64::new(-theta * omega * omega, 2.0 * omega * omega);

    // |a·x + b|² = limit² → aa·x² + 2·ab·x + bb - limit² = 0
    let aa = a.norm_sqr();
    let ab = (a.conj() * b).re;
    let bb = b.norm_sqr();
    let disc = ab * ab - aa * (bb - limit * limit);

    if disc >= 0.0 {
        (-ab + disc.sqrt()) / aa
    } else {
        // Limit already exceeded by the centripetal term; minimize it
        -ab / aa
    }
}

/// Design a slew- and amplitude-limited Archimedean spiral
///
/// # Arguments
/// * `fov` - Field of view (m); use FOV/R for an undersampled spiral
/// * `res` - Spatial resolution (m)
/// * `dt` - Gradient raster time (s)
/// * `max_slew` - Slew rate limit (T/m/s)
/// * `max_amp` - Gradient amplitude limit (mT/m)
pub fn spiral_arch(fov: f64, res: f64, dt: f64, max_slew: f64, max_amp: f64) -> Result<SpiralTrajectory> {
    for (name, v) in [("fov", fov), ("res", res), ("dt", dt), ("max_slew", max_slew), ("max_amp", max_amp)] {
        if !v.is_finite() || v <= 0.0 {
            return Err(PtxError::invalid(name, format!("must be finite and > 0, got {}", v)));
        }
    }

    let lambda = 1.0 / (2.0 * std::f64::consts::PI * fov);
    let kmax = 1.0 / (2.0 * res);
    let theta_max = kmax / lambda;
    let g_max = max_amp * 1e-3;
    let accel_limit = GAMMA_BAR * max_slew / lambda;
    let h = dt / OVERSAMPLING as f64;

    let mut theta = 0.0f64;
    let mut omega = 0.0f64;
    let mut k = vec![[0.0, 0.0]];

    while theta < theta_max {
        for _ in 0..OVERSAMPLING {
            omega += max_angular_accel(theta, omega, accel_limit) * h;
            let omega_max = GAMMA_BAR * g_max / (lambda * (1.0 + theta * theta).sqrt());
            omega = omega.min(omega_max);
            theta += omega * h;
        }
        let r = lambda * theta;
        k.push([r * theta.cos(), r * theta.sin()]);

        if k.len() > MAX_SAMPLES {
            return Err(PtxError::invalid(
                "spiral",
                format!("exceeded {} samples; gradient limits too low for fov/res", MAX_SAMPLES),
            ));
        }
    }

    // g = Δk / (γ dt), reported in mT/m
    let gradient: Vec<[f64; 2]> = k.windows(2)
        .map(|w| {
            let scale = 1e3 / (GAMMA_BAR * dt);
            [(w[1][0] - w[0][0]) * scale, (w[1][1] - w[0][1]) * scale]
        })
        .collect();

    // slew = Δg / dt, from mT/m to T/m/s
    let slew: Vec<[f64; 2]> = gradient.windows(2)
        .map(|w| [(w[1][0] - w[0][0]) * 1e-3 / dt, (w[1][1] - w[0][1]) * 1e-3 / dt])
        .collect();

    tracing::debug!(
        samples = k.len(),
        duration_ms = (k.len() - 1) as f64 * dt * 1e3,
        "spiral trajectory designed"
    );

    Ok(SpiralTrajectory { k, gradient, slew, dt })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn radius(k: &[f64; 2]) -> f64 {
        k[0].hypot(k[1])
    }

    #[test]
    fn test_respects_hardware_limits() {
        let cases = [
            (0.25, 0.25 / 32.0, 4e-6, 150.0, 30.0),
            (0.25, 0.25 / 32.0, 4e-6, 200.0, 10.0),
            (0.2, 0.2 / 16.0, 10e-6, 100.0, 20.0),
        ];
        for &(fov, res, dt, smax, gmax) in &cases {
            let traj = spiral_arch(fov, res, dt, smax, gmax).unwrap();
            assert!(traj.max_gradient() <= gmax * 1.01,
                "gradient {} exceeds {} mT/m", traj.max_gradient(), gmax);
            assert!(traj.max_slew() <= smax * 1.01,
                "slew {} exceeds {} T/m/s", traj.max_slew(), smax);
        }
    }

    #[test]
    fn test_reaches_kmax() {
        let (fov, res) = (0.25, 0.25 / 16.0);
        let traj = spiral_arch(fov, res, 4e-6, 150.0, 30.0).unwrap();
        let kmax = 1.0 / (2.0 * res);
        let k_end = radius(traj.k.last().unwrap());
        assert!(k_end >= kmax && k_end < kmax * 1.01, "k_end {} vs kmax {}", k_end, kmax);
        assert_eq!(radius(&traj.k[0]), 0.0);
        assert_eq!(traj.gradient.len(), traj.len() - 1);
        assert_eq!(traj.slew.len(), traj.len() - 2);
    }

    #[test]
    fn test_excitation_coords_end_at_center() {
        let fov = 0.24;
        let n = 8.0;
        let traj = spiral_arch(fov, fov / n, 4e-6, 150.0, 30.0).unwrap();
        let coords = traj.excitation_coords(fov);
        assert_eq!(coords.len(), traj.len());
        assert_eq!(coords.last().unwrap(), &[0.0, 0.0]);
        // Starts at the edge of k-space, n/2 cycles per FOV
        let start = radius(&coords[0]);
        assert!(start >= n / 2.0 && start < n / 2.0 * 1.01, "start radius {}", start);

        let g = traj.excitation_gradient();
        assert_eq!(g.len(), traj.gradient.len());
        let last = traj.gradient.last().unwrap();
        assert_eq!(g[0], [-last[0], -last[1]]);
    }

    #[test]
    fn test_amplitude_limited_spiral_is_longer() {
        let fast = spiral_arch(0.25, 0.25 / 32.0, 4e-6, 200.0, 40.0).unwrap();
        let slow = spiral_arch(0.25, 0.25 / 32.0, 4e-6, 200.0, 10.0).unwrap();
        assert!(slow.duration() > fast.duration());
    }

    #[test]
    fn test_rejects_bad_limits() {
        assert!(spiral_arch(0.0, 0.01, 4e-6, 150.0, 30.0).is_err());
        assert!(spiral_arch(0.25, 0.01, 4e-6, -1.0, 30.0).is_err());
        assert!(spiral_arch(0.25, 0.01, f64::NAN, 150.0, 30.0).is_err());
    }

    #[test]
    fn test_times() {
        let traj = spiral_arch(0.2, 0.2 / 8.0, 4e-6, 150.0, 25.0).unwrap();
        let t = traj.times();
        assert_eq!(t.len(), traj.len());
        assert!((t[1] - 4e-6).abs() < 1e-15);
        assert!((traj.duration() - t[t.len() - 1]).abs() < 1e-15);
    }
}
