//! Error types for pulse design

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PtxError>;

#[derive(Error, Debug)]
pub enum PtxError {
    /// Array or operator dimensions do not line up
    #[error("shape mismatch in {context}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        context: &'static str,
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("NIfTI error: {0}")]
    Nifti(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PtxError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        PtxError::InvalidParameter { name, reason: reason.into() }
    }

    /// Element count of `dims`, or an error if the product overflows `usize`.
    pub(crate) fn checked_size(name: &'static str, dims: &[usize]) -> Result<usize> {
        dims.iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| PtxError::invalid(name, format!("size {:?} overflows usize", dims)))
    }

    /// Shape check helper: `Ok(())` if `found == expected`.
    pub(crate) fn check_shape(
        context: &'static str,
        expected: &[usize],
        found: &[usize],
    ) -> Result<()> {
        if expected == found {
            Ok(())
        } else {
            Err(PtxError::ShapeMismatch {
                context,
                expected: expected.to_vec(),
                found: found.to_vec(),
            })
        }
    }
}
