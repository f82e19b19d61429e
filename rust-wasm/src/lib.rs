//! PTX-WASM: WebAssembly small-tip parallel-transmit RF pulse design
//!
//! This crate designs multi-coil excitation pulses with the small-tip
//! spatial-domain method and exposes the workflow to the browser, where
//! waveforms and excitation patterns are plotted.
//!
//! # Modules
//! - `linop`: Sensitivity multiply, non-uniform DFT, compose/adjoint/normal
//! - `solvers`: Conjugate gradient and the progress-reporting `App` driver
//! - `coils`: Simulated birdcage sensitivity maps
//! - `trajectory`: Slew/amplitude-limited spiral excitation trajectories
//! - `design`: Pulse designer and target patterns
//! - `config`: JSON-configurable design parameters
//! - `nifti_io`: NIfTI load/save for targets and results

// Core modules
pub mod config;
pub mod error;
pub mod utils;

// Algorithm modules
pub mod coils;
pub mod design;
pub mod linop;
pub mod solvers;
pub mod trajectory;

// I/O modules
pub mod nifti_io;

pub use error::{PtxError, Result};

use num_complex::Complex64;
use wasm_bindgen::prelude::*;

use crate::design::{DesignRun, PulseDesign, Target};
use crate::solvers::IterationReport;
use crate::utils::complex_ops::{split_complex, to_complex};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    fn log(s: &str);
}

#[allow(unused_macros)]
macro_rules! console_log {
    ($($t:tt)*) => (log(&format_args!($($t)*).to_string()))
}

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn to_js_err(e: PtxError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn set(obj: &js_sys::Object, key: &str, value: &JsValue) -> std::result::Result<(), JsValue> {
    js_sys::Reflect::set(obj, &key.into(), value).map(|_| ())
}

fn set_complex(obj: &js_sys::Object, key: &str, data: &[Complex64]) -> std::result::Result<(), JsValue> {
    let (re, im) = split_complex(data);
    set(obj, &format!("{}Re", key), &js_sys::Float64Array::from(re.as_slice()))?;
    set(obj, &format!("{}Im", key), &js_sys::Float64Array::from(im.as_slice()))
}

/// Split `[x, y]` pairs into separate arrays
fn split_coords(coords: &[[f64; 2]]) -> (Vec<f64>, Vec<f64>) {
    (coords.iter().map(|k| k[0]).collect(), coords.iter().map(|k| k[1]).collect())
}

fn join_coords(kx: &[f64], ky: &[f64]) -> Result<Vec<[f64; 2]>> {
    PtxError::check_shape("trajectory", &[kx.len()], &[ky.len()])?;
    Ok(kx.iter().zip(ky.iter()).map(|(&x, &y)| [x, y]).collect())
}

fn complex_input(context: &'static str, re: &[f64], im: &[f64]) -> Result<Vec<Complex64>> {
    PtxError::check_shape(context, &[re.len()], &[im.len()])?;
    Ok(to_complex(re, im))
}

fn design_to_js(design: &PulseDesign) -> std::result::Result<js_sys::Object, JsValue> {
    let result = js_sys::Object::new();
    set_complex(&result, "pulses", &design.pulses)?;
    set(&result, "nCoils", &JsValue::from(design.n_coils as u32))?;
    set(&result, "nTime", &JsValue::from(design.n_time as u32))?;
    set_complex(&result, "excitation", &design.excitation)?;
    set(&result, "nrmse", &JsValue::from(design.nrmse))?;
    set(&result, "residuals", &js_sys::Float64Array::from(design.residuals.as_slice()))?;
    set(&result, "iterations", &JsValue::from(design.iterations as u32))?;
    set(&result, "converged", &JsValue::from(design.converged))?;
    Ok(result)
}

fn run_to_js(run: &DesignRun) -> std::result::Result<js_sys::Object, JsValue> {
    let result = design_to_js(&run.design)?;
    let (kx, ky) = split_coords(&run.coords);
    set(&result, "kx", &js_sys::Float64Array::from(kx.as_slice()))?;
    set(&result, "ky", &js_sys::Float64Array::from(ky.as_slice()))?;

    let (gx, gy) = split_coords(&run.trajectory.excitation_gradient());
    set(&result, "gx", &js_sys::Float64Array::from(gx.as_slice()))?;
    set(&result, "gy", &js_sys::Float64Array::from(gy.as_slice()))?;
    set(&result, "times", &js_sys::Float64Array::from(run.trajectory.times().as_slice()))?;
    set_complex(&result, "sens", &run.sens)?;
    Ok(result)
}

// ============================================================================
// WASM Exports: Pulse Design
// ============================================================================

/// Small-tip spatial-domain pTx pulse design
///
/// # Arguments
/// * `target_re`, `target_im` - Target magnetization (nx * ny)
/// * `sens_re`, `sens_im` - Coil sensitivities (n_coils * nx * ny)
/// * `kx`, `ky` - Excitation trajectory in cycles/FOV (n_time each)
/// * `nx`, `ny` - Grid dimensions
/// * `n_coils` - Number of transmit coils
/// * `max_iter` - Maximum CG iterations
/// * `tol` - Relative CG tolerance
///
/// # Returns
/// JS object with pulsesRe/pulsesIm (n_coils * n_time), excitationRe/excitationIm,
/// residuals, iterations, converged, nrmse
#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn design_pulse_wasm(
    target_re: &[f64],
    target_im: &[f64],
    sens_re: &[f64],
    sens_im: &[f64],
    kx: &[f64],
    ky: &[f64],
    nx: usize, ny: usize,
    n_coils: usize,
    max_iter: usize,
    tol: f64,
) -> std::result::Result<js_sys::Object, JsValue> {
    console_log!("WASM pTx design: {}x{}, {} coils, {} samples, max_iter={}",
                 nx, ny, n_coils, kx.len(), max_iter);

    let coords = join_coords(kx, ky).map_err(to_js_err)?;
    let design = design::design_pulses(
        &complex_input("target", target_re, target_im).map_err(to_js_err)?,
        &complex_input("sensitivity maps", sens_re, sens_im).map_err(to_js_err)?,
        &coords, nx, ny, n_coils, max_iter, tol,
    ).map_err(to_js_err)?;

    console_log!("WASM pTx design complete: {} iterations, nrmse={:.4}",
                 design.iterations, design.nrmse);
    design_to_js(&design)
}

/// pTx pulse design with progress callback
///
/// The callback receives (iteration, max_iter, residual) after every CG step.
#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn design_pulse_wasm_with_progress(
    target_re: &[f64],
    target_im: &[f64],
    sens_re: &[f64],
    sens_im: &[f64],
    kx: &[f64],
    ky: &[f64],
    nx: usize, ny: usize,
    n_coils: usize,
    max_iter: usize,
    tol: f64,
    progress_callback: &js_sys::Function,
) -> std::result::Result<js_sys::Object, JsValue> {
    console_log!("WASM pTx design with progress: {}x{}, {} coils, {} samples",
                 nx, ny, n_coils, kx.len());

    let coords = join_coords(kx, ky).map_err(to_js_err)?;
    let callback = progress_callback.clone();
    let design = design::design_pulses_with_progress(
        &complex_input("target", target_re, target_im).map_err(to_js_err)?,
        &complex_input("sensitivity maps", sens_re, sens_im).map_err(to_js_err)?,
        &coords, nx, ny, n_coils, max_iter, tol,
        |report| {
            let this = JsValue::null();
            let _ = callback.call3(&this,
                &JsValue::from(report.iter as u32),
                &JsValue::from(report.max_iter as u32),
                &JsValue::from(report.residual));
        },
    ).map_err(to_js_err)?;

    console_log!("WASM pTx design complete");
    design_to_js(&design)
}

fn run_config<F>(
    target_re: &[f64],
    target_im: &[f64],
    config_json: &str,
    progress: F,
) -> std::result::Result<js_sys::Object, JsValue>
where
    F: FnMut(&IterationReport),
{
    let config = config::DesignConfig::from_json(config_json).map_err(to_js_err)?;
    let n = config.grid_size;
    console_log!("WASM pTx workflow: {}x{}, {} coils, fov={:.3} m, R={:.1}",
                 n, n, config.n_coils, config.fov, config.accel);

    let target = complex_input("target", target_re, target_im)
        .and_then(|data| Target::new(data, n, n))
        .map_err(to_js_err)?;
    let run = design::design_from_config(&config, &target, progress).map_err(to_js_err)?;

    console_log!("WASM pTx workflow complete: {} samples, {} iterations, nrmse={:.4}",
                 run.design.n_time, run.design.iterations, run.design.nrmse);
    run_to_js(&run)
}

/// Full design workflow from a JSON configuration
///
/// Generates birdcage sensitivities and a spiral trajectory from the
/// configuration, then designs pulses for the target (grid_size²).
/// Missing configuration fields take their defaults.
///
/// # Returns
/// Design object plus kx/ky, gx/gy (mT/m), times (s) and sensRe/sensIm
#[wasm_bindgen]
pub fn design_from_config_wasm(
    target_re: &[f64],
    target_im: &[f64],
    config_json: &str,
) -> std::result::Result<js_sys::Object, JsValue> {
    run_config(target_re, target_im, config_json, |_| {})
}

/// Configured design workflow with progress callback (iteration, max_iter, residual)
#[wasm_bindgen]
pub fn design_from_config_wasm_with_progress(
    target_re: &[f64],
    target_im: &[f64],
    config_json: &str,
    progress_callback: &js_sys::Function,
) -> std::result::Result<js_sys::Object, JsValue> {
    let callback = progress_callback.clone();
    run_config(target_re, target_im, config_json, |report| {
        let this = JsValue::null();
        let _ = callback.call3(&this,
            &JsValue::from(report.iter as u32),
            &JsValue::from(report.max_iter as u32),
            &JsValue::from(report.residual));
    })
}

/// Default design configuration as JSON
#[wasm_bindgen]
pub fn default_config_json() -> std::result::Result<String, JsValue> {
    config::DesignConfig::default().to_json().map_err(to_js_err)
}

// ============================================================================
// WASM Exports: Inputs
// ============================================================================

/// Birdcage coil sensitivity maps
///
/// # Returns
/// JS object with sensRe/sensIm (n_coils * nx * ny, x fastest)
#[wasm_bindgen]
pub fn birdcage_maps_wasm(
    n_coils: usize,
    nx: usize, ny: usize,
    radius: f64,
) -> std::result::Result<js_sys::Object, JsValue> {
    let sens = coils::birdcage_maps(n_coils, nx, ny, radius).map_err(to_js_err)?;
    let result = js_sys::Object::new();
    set_complex(&result, "sens", &sens)?;
    Ok(result)
}

/// Spiral excitation trajectory
///
/// # Arguments
/// * `fov` - Field of view (m), already divided by any acceleration factor
/// * `res` - Resolution (m)
/// * `dt` - Gradient raster (s)
/// * `max_slew` - Slew limit (T/m/s)
/// * `max_amp` - Amplitude limit (mT/m)
/// * `excitation_fov` - FOV (m) used to express the returned coordinates in cycles/FOV
///
/// # Returns
/// JS object with kx/ky (time-reversed, cycles/FOV), gx/gy (mT/m), times (s)
#[wasm_bindgen]
pub fn spiral_trajectory_wasm(
    fov: f64,
    res: f64,
    dt: f64,
    max_slew: f64,
    max_amp: f64,
    excitation_fov: f64,
) -> std::result::Result<js_sys::Object, JsValue> {
    let traj = trajectory::spiral_arch(fov, res, dt, max_slew, max_amp).map_err(to_js_err)?;
    console_log!("WASM spiral: {} samples, {:.2} ms, max slew {:.1} T/m/s",
                 traj.len(), traj.duration() * 1e3, traj.max_slew());

    let (kx, ky) = split_coords(&traj.excitation_coords(excitation_fov));
    let (gx, gy) = split_coords(&traj.excitation_gradient());

    let result = js_sys::Object::new();
    set(&result, "kx", &js_sys::Float64Array::from(kx.as_slice()))?;
    set(&result, "ky", &js_sys::Float64Array::from(ky.as_slice()))?;
    set(&result, "gx", &js_sys::Float64Array::from(gx.as_slice()))?;
    set(&result, "gy", &js_sys::Float64Array::from(gy.as_slice()))?;
    set(&result, "times", &js_sys::Float64Array::from(traj.times().as_slice()))?;
    Ok(result)
}

/// Get version string
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

// ============================================================================
// WASM Exports: NIfTI I/O
// ============================================================================

/// Load a target magnetization from NIfTI bytes
///
/// Returns a JS object with: data (Float64Array, first slice), nx, ny
#[wasm_bindgen]
pub fn load_target_nifti_wasm(bytes: &[u8]) -> std::result::Result<js_sys::Object, JsValue> {
    let target = Target::from_nifti_bytes(bytes).map_err(to_js_err)?;

    let result = js_sys::Object::new();
    set(&result, "data", &js_sys::Float64Array::from(target.magnitude().as_slice()))?;
    set(&result, "nx", &JsValue::from(target.nx as u32))?;
    set(&result, "ny", &JsValue::from(target.ny as u32))?;

    console_log!("WASM load_target_nifti: {}x{}", target.nx, target.ny);
    Ok(result)
}

/// Save an image (e.g. excitation magnitude) as NIfTI bytes
///
/// # Arguments
/// * `data` - Image data (nx * ny * nz)
/// * `nx`, `ny`, `nz` - Dimensions
/// * `vsx`, `vsy`, `vsz` - Voxel sizes in mm
/// * `gzip` - Write .nii.gz instead of .nii
#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn save_nifti_wasm(
    data: &[f64],
    nx: usize, ny: usize, nz: usize,
    vsx: f64, vsy: f64, vsz: f64,
    gzip: bool,
) -> std::result::Result<Vec<u8>, JsValue> {
    let affine = nifti_io::identity_affine((vsx, vsy, vsz));
    let bytes = if gzip {
        nifti_io::save_nifti_gz(data, (nx, ny, nz), (vsx, vsy, vsz), &affine)
    } else {
        nifti_io::save_nifti(data, (nx, ny, nz), (vsx, vsy, vsz), &affine)
    }.map_err(to_js_err)?;

    console_log!("WASM save_nifti: {}x{}x{}, {} bytes", nx, ny, nz, bytes.len());
    Ok(bytes)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let version = get_version();
        assert!(!version.is_empty());
    }

    #[test]
    fn test_coords_split_join() {
        let coords = vec![[1.0, -2.0], [0.5, 3.0]];
        let (kx, ky) = split_coords(&coords);
        assert_eq!(join_coords(&kx, &ky).unwrap(), coords);
        assert!(join_coords(&kx, &ky[..1]).is_err());
        assert!(complex_input("target", &[1.0, 2.0], &[0.0]).is_err());
        assert_eq!(complex_input("target", &[1.0], &[2.0]).unwrap(), vec![Complex64::new(1.0, 2.0)]);
    }
}
