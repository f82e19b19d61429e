//! Parallel-transmit RF pulse design
//!
//! - Spatial: small-tip spatial-domain design via CG on the excitation model
//! - Target: desired excitation patterns (procedural or from NIfTI)

pub mod spatial;
pub mod target;

pub use spatial::*;
pub use target::*;
