//! Transmit coil models
//!
//! - Birdcage: simulated sensitivity maps for a circular array

pub mod birdcage;

pub use birdcage::*;
