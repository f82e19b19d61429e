//! Small-tip spatial-domain parallel-transmit pulse design
//!
//! In the small-tip regime the excited transverse magnetization is linear
//! in the RF waveforms of the transmit coils. With coil sensitivities S
//! and a non-uniform Fourier operator F over the excitation k-space
//! trajectory, the excitation model is
//!
//! m = A b,    A = (F S)^H
//!
//! mapping pulses b (coil × time) to magnetization m (y × x). Pulses are
//! found by conjugate gradient on the normal equations A^H A b = A^H m_target,
//! starting from zero.
//!
//! Reference:
//! Grissom W, et al. Spatial domain method for the design of RF pulses in
//! multicoil parallel excitation. MRM 2006;56(3):620-9.

use num_complex::Complex64;
use tracing::info;

use super::target::Target;
use crate::coils::birdcage_maps;
use crate::config::DesignConfig;
use crate::error::{PtxError, Result};
use crate::linop::{compose, LinearOperator, LinearOperatorExt, Nudft, SensitivityMultiply};
use crate::solvers::{App, AppOutput, ConjugateGradient, IterationReport};
use crate::trajectory::{spiral_arch, SpiralTrajectory};
use crate::utils::complex_ops::nrmse_c64;

/// Designed pulses and the excitation they produce
#[derive(Debug, Clone)]
pub struct PulseDesign {
    /// RF waveforms, index = t + c*n_time
    pub pulses: Vec<Complex64>,
    pub n_coils: usize,
    pub n_time: usize,
    /// Predicted excitation A·b, index = x + y*nx
    pub excitation: Vec<Complex64>,
    /// NRMSE of the excitation against the target
    pub nrmse: f64,
    /// Normal-equation residual norms, initial value first
    pub residuals: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
}

impl PulseDesign {
    /// Waveform of coil `c`
    pub fn coil_pulse(&self, c: usize) -> &[Complex64] {
        &self.pulses[c * self.n_time..(c + 1) * self.n_time]
    }
}

/// Full design output including the generated inputs
#[derive(Debug, Clone)]
pub struct DesignRun {
    pub design: PulseDesign,
    pub trajectory: SpiralTrajectory,
    pub coords: Vec<[f64; 2]>,
    pub sens: Vec<Complex64>,
}

/// Excitation forward model A = (F S)^H, pulses -> magnetization
pub fn excitation_model(
    sens: &[Complex64],
    coords: &[[f64; 2]],
    nx: usize,
    ny: usize,
    n_coils: usize,
) -> Result<impl LinearOperator> {
    let s = SensitivityMultiply::new(sens.to_vec(), n_coils, nx, ny)?;
    let f = Nudft::new(n_coils, nx, ny, coords)?;
    Ok(compose(f, s)?.adjoint())
}

/// Design pTx pulses for a target pattern
///
/// # Arguments
/// * `target` - Desired magnetization (nx * ny)
/// * `sens` - Coil sensitivities (n_coils * nx * ny)
/// * `coords` - Excitation k-space trajectory in cycles/FOV
/// * `nx`, `ny` - Grid dimensions
/// * `n_coils` - Number of transmit coils
/// * `max_iter` - Maximum CG iterations
/// * `tol` - Relative CG tolerance
#[allow(clippy::too_many_arguments)]
pub fn design_pulses(
    target: &[Complex64],
    sens: &[Complex64],
    coords: &[[f64; 2]],
    nx: usize,
    ny: usize,
    n_coils: usize,
    max_iter: usize,
    tol: f64,
) -> Result<PulseDesign> {
    design_pulses_with_progress(target, sens, coords, nx, ny, n_coils, max_iter, tol, |_| {})
}

/// Design pTx pulses, reporting each CG iteration to `progress`
#[allow(clippy::too_many_arguments)]
pub fn design_pulses_with_progress<F>(
    target: &[Complex64],
    sens: &[Complex64],
    coords: &[[f64; 2]],
    nx: usize,
    ny: usize,
    n_coils: usize,
    max_iter: usize,
    tol: f64,
    progress: F,
) -> Result<PulseDesign>
where
    F: FnMut(&IterationReport),
{
    let n_voxels = PtxError::checked_size("target", &[ny, nx])?;
    PtxError::check_shape("target", &[n_voxels], &[target.len()])?;
    let a = excitation_model(sens, coords, nx, ny, n_coils)?;
    let n_time = coords.len();

    info!(nx, ny, n_coils, n_time, max_iter, tol, "starting small-tip pTx design");

    let rhs = a.apply_adjoint(target);
    let x0 = vec![Complex64::new(0.0, 0.0); n_coils * n_time];
    let cg = ConjugateGradient::new((&a).normal(), &rhs, x0, max_iter, tol)?;

    let AppOutput { output: pulses, residuals, iterations, converged } =
        App::new(cg).with_name("ptx_spatial").run_with_progress(progress);

    let excitation = a.apply(&pulses);
    let nrmse = nrmse_c64(&excitation, target);

    info!(iterations, converged, nrmse, "pTx design finished");

    Ok(PulseDesign {
        pulses,
        n_coils,
        n_time,
        excitation,
        nrmse,
        residuals,
        iterations,
        converged,
    })
}

/// Run the complete workflow from a configuration
///
/// Simulates birdcage sensitivities, designs a spiral from the gradient
/// limits, and solves for pulses that excite `target`.
pub fn design_from_config<F>(config: &DesignConfig, target: &Target, progress: F) -> Result<DesignRun>
where
    F: FnMut(&IterationReport),
{
    config.validate()?;
    let n = config.grid_size;
    if target.nx != n || target.ny != n {
        return Err(PtxError::ShapeMismatch {
            context: "target grid",
            expected: vec![n, n],
            found: vec![target.ny, target.nx],
        });
    }

    let sens = birdcage_maps(config.n_coils, n, n, config.coil_radius)?;

    let g = &config.gradient;
    let trajectory = spiral_arch(
        config.fov / config.accel,
        config.resolution(),
        g.dt,
        g.max_slew,
        g.max_amplitude,
    )?;
    let coords = trajectory.excitation_coords(config.fov);

    let design = design_pulses_with_progress(
        &target.data,
        &sens,
        &coords,
        n,
        n,
        config.n_coils,
        config.solver.max_iter,
        config.solver.tol,
        progress,
    )?;

    Ok(DesignRun { design, trajectory, coords, sens })
}
