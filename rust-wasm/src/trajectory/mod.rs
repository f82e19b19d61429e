//! Excitation k-space trajectories
//!
//! - Spiral: slew/amplitude-limited Archimedean spiral

pub mod spiral;

pub use spiral::*;
