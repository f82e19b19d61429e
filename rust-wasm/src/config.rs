//! Pulse design configuration
//!
//! All fields have defaults, so a partial JSON document such as
//! `{"grid_size": 24, "solver": {"max_iter": 10}}` is a valid configuration.

use serde::{Deserialize, Serialize};
use std::f64::consts::SQRT_2;

use crate::error::{PtxError, Result};

/// Gradient hardware limits for trajectory design
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientLimits {
    /// Raster time (s)
    pub dt: f64,
    /// Slew rate limit (T/m/s)
    pub max_slew: f64,
    /// Amplitude limit (mT/m)
    pub max_amplitude: f64,
}

impl Default for GradientLimits {
    fn default() -> Self {
        Self {
            dt: 4e-6,
            max_slew: 150.0,
            max_amplitude: 30.0,
        }
    }
}

/// Stopping criteria for the CG solve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub max_iter: usize,
    /// Relative residual tolerance
    pub tol: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iter: 30,
            tol: 1e-6,
        }
    }
}

/// Full pulse design configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignConfig {
    /// Square spatial grid size (pixels per side)
    pub grid_size: usize,
    pub n_coils: usize,
    /// Field of view (m)
    pub fov: f64,
    /// Spiral undersampling factor; the trajectory covers FOV/accel
    pub accel: f64,
    /// Birdcage coil radius relative to half-FOV
    pub coil_radius: f64,
    pub gradient: GradientLimits,
    pub solver: SolverConfig,
}

impl Default for DesignConfig {
    fn default() -> Self {
        Self {
            grid_size: 32,
            n_coils: 8,
            fov: 0.25,
            accel: 2.0,
            coil_radius: 1.5,
            gradient: GradientLimits::default(),
            solver: SolverConfig::default(),
        }
    }
}

impl DesignConfig {
    /// Parse from JSON and validate
    pub fn from_json(json: &str) -> Result<Self> {
        let config: DesignConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Spatial resolution (m)
    pub fn resolution(&self) -> f64 {
        self.fov / self.grid_size as f64
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<()> {
        if self.grid_size < 2 {
            return Err(PtxError::invalid("grid_size", "must be >= 2"));
        }
        if self.n_coils == 0 {
            return Err(PtxError::invalid("n_coils", "must be > 0"));
        }
        let positive = [
            ("fov", self.fov),
            ("gradient.dt", self.gradient.dt),
            ("gradient.max_slew", self.gradient.max_slew),
            ("gradient.max_amplitude", self.gradient.max_amplitude),
        ];
        for (name, v) in positive {
            if !v.is_finite() || v <= 0.0 {
                return Err(PtxError::invalid(name, format!("must be finite and > 0, got {}", v)));
            }
        }
        if !self.accel.is_finite() || self.accel < 1.0 {
            return Err(PtxError::invalid("accel", format!("must be >= 1, got {}", self.accel)));
        }
        if !self.coil_radius.is_finite() || self.coil_radius <= SQRT_2 {
            return Err(PtxError::invalid("coil_radius", format!("must be > √2, got {}", self.coil_radius)));
        }
        if !self.solver.tol.is_finite() || self.solver.tol < 0.0 {
            return Err(PtxError::invalid("solver.tol", "must be finite and >= 0"));
        }
        Ok(())
    }
}
