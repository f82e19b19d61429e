//! Conjugate Gradient solver
//!
//! Solves Ax = b for Hermitian positive (semi-)definite A.
//!
//! The solver is step-wise: `update()` performs one iteration and `done()`
//! reports whether the loop should stop, so a driver (see `solvers::app`)
//! can observe the residual between iterations.

use num_complex::Complex64;

use super::IterativeAlg;
use crate::error::{PtxError, Result};
use crate::linop::{check_input, LinearOperator};
use crate::utils::complex_ops::{axpy_c64, dot_c64, norm_squared_c64, xpby_c64};

/// Conjugate gradient state for a linear operator `A`
pub struct ConjugateGradient<A> {
    a: A,
    x: Vec<Complex64>,
    r: Vec<Complex64>,
    p: Vec<Complex64>,
    rr: f64,
    b_norm: f64,
    tol: f64,
    max_iter: usize,
    iter: usize,
    breakdown: bool,
}

impl<A: LinearOperator> ConjugateGradient<A> {
    /// # Arguments
    /// * `a` - Square operator (`ishape == oshape`)
    /// * `b` - Right-hand side
    /// * `x0` - Initial guess
    /// * `max_iter` - Maximum iterations
    /// * `tol` - Relative tolerance on ||r|| / ||b||
    pub fn new(a: A, b: &[Complex64], x0: Vec<Complex64>, max_iter: usize, tol: f64) -> Result<Self> {
        PtxError::check_shape("conjugate gradient operator", a.ishape(), a.oshape())?;
        check_input(&a, "conjugate gradient rhs", b)?;
        check_input(&a, "conjugate gradient x0", &x0)?;
        if tol.is_nan() || tol < 0.0 {
            return Err(PtxError::invalid("tol", "must be >= 0"));
        }

        // r = b - A*x0
        let ax = a.apply(&x0);
        let r: Vec<Complex64> = b.iter().zip(ax.iter()).map(|(bi, axi)| bi - axi).collect();
        let p = r.clone();
        let rr = norm_squared_c64(&r);
        let b_norm = norm_squared_c64(b).sqrt();

        Ok(Self {
            a,
            x: x0,
            r,
            p,
            rr,
            b_norm,
            tol,
            max_iter,
            iter: 0,
            breakdown: false,
        })
    }

    /// Current estimate
    pub fn x(&self) -> &[Complex64] {
        &self.x
    }

    /// True if the search direction lost positive curvature
    pub fn breakdown(&self) -> bool {
        self.breakdown
    }

    fn converged(&self) -> bool {
        self.rr.sqrt() <= self.tol * self.b_norm
    }
}

impl<A: LinearOperator> IterativeAlg for ConjugateGradient<A> {
    type Output = Vec<Complex64>;

    fn update(&mut self) {
        let ap = self.a.apply(&self.p);
        let pap = dot_c64(&self.p, &ap).re;

        if pap <= 0.0 || !pap.is_finite() {
            self.breakdown = true;
            return;
        }

        let alpha = Complex64::new(self.rr / pap, 0.0);

        // x = x + alpha*p
        axpy_c64(&mut self.x, alpha, &self.p);

        // r = r - alpha*ap
        axpy_c64(&mut self.r, -alpha, &ap);

        let rr_new = norm_squared_c64(&self.r);
        let beta = rr_new / self.rr;

        // p = r + beta*p
        xpby_c64(&mut self.p, &self.r, beta);

        self.rr = rr_new;
        self.iter += 1;
    }

    fn done(&self) -> bool {
        self.iter >= self.max_iter || self.breakdown || self.converged()
    }

    fn iter(&self) -> usize {
        self.iter
    }

    fn max_iter(&self) -> usize {
        self.max_iter
    }

    fn residual(&self) -> f64 {
        self.rr.sqrt()
    }

    fn is_converged(&self) -> bool {
        self.converged()
    }

    fn into_output(self) -> Vec<Complex64> {
        self.x
    }
}

/// Conjugate gradient solver
///
/// Runs `ConjugateGradient` to completion and returns the solution.
///
/// # Arguments
/// * `a` - Operator computing A*x
/// * `b` - Right-hand side vector
/// * `x0` - Initial guess
/// * `tol` - Convergence tolerance (relative to ||b||)
/// * `max_iter` - Maximum iterations
pub fn cg_solve<A: LinearOperator>(
    a: A,
    b: &[Complex64],
    x0: &[Complex64],
    tol: f64,
    max_iter: usize,
) -> Result<Vec<Complex64>> {
    let mut alg = ConjugateGradient::new(a, b, x0.to_vec(), max_iter, tol)?;
    while !alg.done() {
        alg.update();
    }
    Ok(alg.into_output())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hermitian test operator given as a dense row-major matrix
    struct Dense {
        m: Vec<Complex64>,
        shape: Vec<usize>,
    }

    impl Dense {
        fn new(n: usize, m: Vec<Complex64>) -> Self {
            Self { m, shape: vec![n] }
        }
    }

    impl LinearOperator for Dense {
        fn ishape(&self) -> &[usize] { &self.shape }
        fn oshape(&self) -> &[usize] { &self.shape }
        fn apply(&self, x: &[Complex64]) -> Vec<Complex64> {
            let n = x.len();
            (0..n).map(|i| (0..n).map(|j| self.m[i * n + j] * x[j]).sum::<Complex64>()).collect()
        }
        fn apply_adjoint(&self, y: &[Complex64]) -> Vec<Complex64> {
            let n = y.len();
            (0..n).map(|i| (0..n).map(|j| self.m[j * n + i].conj() * y[j]).sum::<Complex64>()).collect()
        }
    }

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    fn diagonal(d: &[f64]) -> Dense {
        let n = d.len();
        let mut m = vec![c(0.0, 0.0); n * n];
        for (i, &v) in d.iter().enumerate() {
            m[i * n + i] = c(v, 0.0);
        }
        Dense::new(n, m)
    }

    #[test]
    fn test_cg_identity() {
        // Solve Ix = b
        let b = vec![c(1.0, 0.5), c(2.0, 0.0), c(3.0, -1.0)];
        let x0 = vec![c(0.0, 0.0); 3];

        let x = cg_solve(diagonal(&[1.0, 1.0, 1.0]), &b, &x0, 1e-10, 100).unwrap();

        for (xi, bi) in x.iter().zip(b.iter()) {
            assert!((xi - bi).norm() < 1e-8, "x should equal b");
        }
    }

    #[test]
    fn test_cg_diagonal() {
        // Solve diag(2,3,4) * x = [2, 6i, 12]
        let b = vec![c(2.0, 0.0), c(0.0, 6.0), c(12.0, 0.0)];
        let x0 = vec![c(0.0, 0.0); 3];

        let x = cg_solve(diagonal(&[2.0, 3.0, 4.0]), &b, &x0, 1e-10, 100).unwrap();

        let expected = vec![c(1.0, 0.0), c(0.0, 2.0), c(3.0, 0.0)];
        for (xi, ei) in x.iter().zip(expected.iter()) {
            assert!((xi - ei).norm() < 1e-8, "Expected {}, got {}", ei, xi);
        }
    }

    #[test]
    fn test_cg_hermitian() {
        // [[2, i], [-i, 2]] x = b with x = [1, 1]
        let a = Dense::new(2, vec![c(2.0, 0.0), c(0.0, 1.0), c(0.0, -1.0), c(2.0, 0.0)]);
        let b = vec![c(2.0, 1.0), c(2.0, -1.0)];
        let x = cg_solve(a, &b, &[c(0.0, 0.0); 2], 1e-12, 10).unwrap();
        for xi in &x {
            assert!((xi - c(1.0, 0.0)).norm() < 1e-8, "got {}", xi);
        }
    }

    #[test]
    fn test_zero_iterations_returns_initial_guess() {
        let b = vec![c(1.0, 0.0), c(2.0, 0.0)];
        let x0 = vec![c(0.0, 0.0); 2];
        let alg = ConjugateGradient::new(diagonal(&[1.0, 2.0]), &b, x0.clone(), 0, 1e-6).unwrap();
        assert!(alg.done());
        assert_eq!(alg.iter(), 0);
        assert_eq!(alg.into_output(), x0);
    }

    #[test]
    fn test_zero_rhs_is_converged_immediately() {
        let b = vec![c(0.0, 0.0); 3];
        let alg = ConjugateGradient::new(diagonal(&[1.0, 2.0, 3.0]), &b, b.clone(), 50, 0.0).unwrap();
        assert!(alg.done());
        assert!(alg.is_converged());
    }

    #[test]
    fn test_unreachable_tolerance_runs_max_iter() {
        // 8 distinct eigenvalues, stop well before exact convergence
        let d: Vec<f64> = (1..=8).map(|i| i as f64).collect();
        let b = vec![c(1.0, 0.0); 8];
        let mut alg = ConjugateGradient::new(diagonal(&d), &b, vec![c(0.0, 0.0); 8], 3, 0.0).unwrap();
        while !alg.done() {
            alg.update();
        }
        assert_eq!(alg.iter(), 3);
        assert!(!alg.is_converged());
    }

    #[test]
    fn test_residual_history_non_increasing() {
        let b = vec![c(1.0, 0.0); 5];
        let alg = ConjugateGradient::new(
            diagonal(&[1.0, 1.5, 2.0, 2.5, 3.0]), &b, vec![c(0.0, 0.0); 5], 5, 0.0,
        ).unwrap();
        let out = crate::solvers::App::new(alg).run();
        assert_eq!(out.residuals.len(), out.iterations + 1);
        assert!((out.residuals[0] - 5.0f64.sqrt()).abs() < 1e-12);
        for w in out.residuals.windows(2) {
            assert!(w[1] <= w[0], "residual increased: {:?}", out.residuals);
        }
    }

    #[test]
    fn test_breakdown_on_null_direction() {
        // A = diag(1, 0), b = [0, 1]: the first search direction has p^H A p = 0
        let b = vec![c(0.0, 0.0), c(1.0, 0.0)];
        let x0 = vec![c(0.0, 0.0); 2];
        let mut alg = ConjugateGradient::new(diagonal(&[1.0, 0.0]), &b, x0.clone(), 5, 1e-6).unwrap();
        assert!(!alg.done());
        alg.update();
        assert!(alg.breakdown());
        assert!(alg.done());
        assert!(!alg.is_converged());
        assert_eq!(alg.iter(), 0);
        assert_eq!(alg.x(), x0.as_slice());
    }

    #[test]
    fn test_app_stops_on_breakdown() {
        let b = vec![c(1.0, 0.0); 2];
        let x0 = vec![c(0.0, 0.0); 2];
        let alg = ConjugateGradient::new(diagonal(&[0.0, 0.0]), &b, x0.clone(), 5, 1e-6).unwrap();
        let out = crate::solvers::App::new(alg).run();
        assert_eq!(out.iterations, 0);
        assert!(!out.converged);
        assert_eq!(out.residuals.len(), 1);
        assert!((out.residuals[0] - 2.0f64.sqrt()).abs() < 1e-12);
        assert_eq!(out.output, x0);
    }

    #[test]
    fn test_shape_mismatch() {
        let b = vec![c(1.0, 0.0); 4];
        assert!(ConjugateGradient::new(diagonal(&[1.0, 2.0]), &b, vec![c(0.0, 0.0); 2], 5, 1e-6).is_err());
    }
}
