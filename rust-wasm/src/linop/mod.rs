//! Linear operators for the small-tip excitation model
//!
//! Operators map flat complex arrays between an input shape (`ishape`)
//! and an output shape (`oshape`). Only the pieces the pulse designer
//! needs are provided:
//! - `SensitivityMultiply`: coil-sensitivity weighting
//! - `Nudft`: non-uniform discrete Fourier transform
//! - `Compose`, `Adjoint`, `Normal`: composition, conjugate transpose, A^H A

pub mod multiply;
pub mod nudft;

pub use multiply::*;
pub use nudft::*;

use num_complex::Complex64;

use crate::error::{PtxError, Result};

/// A linear map between flat complex arrays.
pub trait LinearOperator {
    fn ishape(&self) -> &[usize];
    fn oshape(&self) -> &[usize];

    /// y = A x
    fn apply(&self, x: &[Complex64]) -> Vec<Complex64>;

    /// x = A^H y
    fn apply_adjoint(&self, y: &[Complex64]) -> Vec<Complex64>;

    fn isize(&self) -> usize {
        self.ishape().iter().product()
    }

    fn osize(&self) -> usize {
        self.oshape().iter().product()
    }
}

impl<T: LinearOperator + ?Sized> LinearOperator for &T {
    fn ishape(&self) -> &[usize] {
        (**self).ishape()
    }
    fn oshape(&self) -> &[usize] {
        (**self).oshape()
    }
    fn apply(&self, x: &[Complex64]) -> Vec<Complex64> {
        (**self).apply(x)
    }
    fn apply_adjoint(&self, y: &[Complex64]) -> Vec<Complex64> {
        (**self).apply_adjoint(y)
    }
}

/// `outer ∘ inner`: applies `inner` first.
#[derive(Debug, Clone)]
pub struct Compose<A, B> {
    outer: A,
    inner: B,
}

/// Compose two operators, checking that `inner.oshape == outer.ishape`.
pub fn compose<A: LinearOperator, B: LinearOperator>(outer: A, inner: B) -> Result<Compose<A, B>> {
    PtxError::check_shape("compose", outer.ishape(), inner.oshape())?;
    Ok(Compose { outer, inner })
}

impl<A: LinearOperator, B: LinearOperator> LinearOperator for Compose<A, B> {
    fn ishape(&self) -> &[usize] {
        self.inner.ishape()
    }
    fn oshape(&self) -> &[usize] {
        self.outer.oshape()
    }
    fn apply(&self, x: &[Complex64]) -> Vec<Complex64> {
        self.outer.apply(&self.inner.apply(x))
    }
    fn apply_adjoint(&self, y: &[Complex64]) -> Vec<Complex64> {
        self.inner.apply_adjoint(&self.outer.apply_adjoint(y))
    }
}

/// Conjugate transpose of an operator; shapes are swapped.
#[derive(Debug, Clone)]
pub struct Adjoint<A>(pub A);

impl<A: LinearOperator> LinearOperator for Adjoint<A> {
    fn ishape(&self) -> &[usize] {
        self.0.oshape()
    }
    fn oshape(&self) -> &[usize] {
        self.0.ishape()
    }
    fn apply(&self, x: &[Complex64]) -> Vec<Complex64> {
        self.0.apply_adjoint(x)
    }
    fn apply_adjoint(&self, y: &[Complex64]) -> Vec<Complex64> {
        self.0.apply(y)
    }
}

/// Normal operator A^H A (Hermitian, positive semi-definite).
#[derive(Debug, Clone)]
pub struct Normal<A>(pub A);

impl<A: LinearOperator> LinearOperator for Normal<A> {
    fn ishape(&self) -> &[usize] {
        self.0.ishape()
    }
    fn oshape(&self) -> &[usize] {
        self.0.ishape()
    }
    fn apply(&self, x: &[Complex64]) -> Vec<Complex64> {
        self.0.apply_adjoint(&self.0.apply(x))
    }
    fn apply_adjoint(&self, y: &[Complex64]) -> Vec<Complex64> {
        self.apply(y)
    }
}

/// Method-style constructors for the wrappers above.
pub trait LinearOperatorExt: LinearOperator + Sized {
    fn adjoint(self) -> Adjoint<Self> {
        Adjoint(self)
    }

    fn normal(self) -> Normal<Self> {
        Normal(self)
    }
}

impl<T: LinearOperator> LinearOperatorExt for T {}

/// Check a flat input against an operator's `ishape`.
pub fn check_input<A: LinearOperator + ?Sized>(op: &A, context: &'static str, x: &[Complex64]) -> Result<()> {
    if x.len() == op.isize() {
        Ok(())
    } else {
        Err(PtxError::ShapeMismatch {
            context,
            expected: op.ishape().to_vec(),
            found: vec![x.len()],
        })
    }
}
