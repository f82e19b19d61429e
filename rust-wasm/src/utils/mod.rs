//! Utility functions for pulse design
//!
//! - Complex vector kernels (dot products, norms, axpy) for the solvers

pub mod complex_ops;

pub use complex_ops::*;
