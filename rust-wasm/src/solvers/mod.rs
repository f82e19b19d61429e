//! Iterative solvers for pulse design
//!
//! - CG: Conjugate gradient on Hermitian positive semi-definite operators
//! - App: run loop with progress reporting around any `IterativeAlg`

pub mod app;
pub mod cg;

pub use app::*;
pub use cg::*;

/// An algorithm advanced one `update()` at a time
pub trait IterativeAlg {
    type Output;

    /// Perform one iteration
    fn update(&mut self);

    /// True when the loop should stop
    fn done(&self) -> bool;

    fn iter(&self) -> usize;

    fn max_iter(&self) -> usize;

    /// Current residual norm
    fn residual(&self) -> f64;

    /// True if the stopping tolerance was reached
    fn is_converged(&self) -> bool;

    /// Extract the result, consuming the algorithm
    fn into_output(self) -> Self::Output;
}
