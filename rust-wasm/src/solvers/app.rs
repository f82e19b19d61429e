//! Iterative application driver
//!
//! `App` owns an iterative algorithm and runs it to completion, reporting
//! progress after every update and collecting the residual history. The
//! algorithm's result is extracted through `IterativeAlg::into_output`.

use std::fmt;

use tracing::{debug, warn};

use super::IterativeAlg;

/// Progress snapshot passed to callbacks after each iteration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationReport {
    pub iter: usize,
    pub max_iter: usize,
    pub residual: f64,
}

impl fmt::Display for IterationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "iter {}/{}, resid={:.3e}", self.iter, self.max_iter, self.residual)
    }
}

/// Result of an `App` run
#[derive(Debug, Clone)]
pub struct AppOutput<T> {
    pub output: T,
    /// Residual before the first iteration, then one entry per iteration
    pub residuals: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
}

/// Runs an `IterativeAlg` until `done()`
pub struct App<A> {
    alg: A,
    name: &'static str,
}

impl<A: IterativeAlg> App<A> {
    pub fn new(alg: A) -> Self {
        Self { alg, name: "app" }
    }

    /// Label used in log messages
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn run(self) -> AppOutput<A::Output> {
        self.run_with_progress(|_| {})
    }

    /// Run to completion, calling `progress` after every update
    pub fn run_with_progress<F>(mut self, mut progress: F) -> AppOutput<A::Output>
    where
        F: FnMut(&IterationReport),
    {
        let mut residuals = Vec::with_capacity(self.alg.max_iter() + 1);
        residuals.push(self.alg.residual());

        while !self.alg.done() {
            let before = self.alg.iter();
            self.alg.update();
            if self.alg.iter() == before {
                // no step taken (solver breakdown)
                break;
            }

            let report = IterationReport {
                iter: self.alg.iter(),
                max_iter: self.alg.max_iter(),
                residual: self.alg.residual(),
            };
            residuals.push(report.residual);
            debug!(app = self.name, "{}", report);
            progress(&report);
        }

        let iterations = self.alg.iter();
        let converged = self.alg.is_converged();
        if !converged {
            warn!(
                app = self.name,
                iterations,
                residual = self.alg.residual(),
                "stopped before reaching tolerance"
            );
        }

        AppOutput {
            output: self.alg.into_output(),
            residuals,
            iterations,
            converged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Halves its residual each step
    struct Halving {
        iter: usize,
        max_iter: usize,
        resid: f64,
        tol: f64,
    }

    impl IterativeAlg for Halving {
        type Output = f64;
        fn update(&mut self) {
            self.resid *= 0.5;
            self.iter += 1;
        }
        fn done(&self) -> bool {
            self.iter >= self.max_iter || self.resid <= self.tol
        }
        fn iter(&self) -> usize { self.iter }
        fn max_iter(&self) -> usize { self.max_iter }
        fn residual(&self) -> f64 { self.resid }
        fn is_converged(&self) -> bool { self.resid <= self.tol }
        fn into_output(self) -> f64 { self.resid }
    }

    #[test]
    fn test_history_matches_reports() {
        let alg = Halving { iter: 0, max_iter: 10, resid: 1.0, tol: 0.1 };
        let mut reports = Vec::new();
        let out = App::new(alg).run_with_progress(|r| reports.push(*r));

        // 1 -> 0.5 -> 0.25 -> 0.125 -> 0.0625
        assert_eq!(out.iterations, 4);
        assert!(out.converged);
        assert_eq!(out.residuals.len(), 5);
        assert_eq!(reports.len(), 4);
        for (k, r) in reports.iter().enumerate() {
            assert_eq!(r.iter, k + 1);
            assert_eq!(r.max_iter, 10);
            assert_eq!(r.residual, out.residuals[k + 1]);
        }
    }

    #[test]
    fn test_stops_at_iteration_cap() {
        let alg = Halving { iter: 0, max_iter: 3, resid: 1.0, tol: 0.0 };
        let out = App::new(alg).run();
        assert_eq!(out.iterations, 3);
        assert!(!out.converged);
        assert_eq!(out.output, 0.125);
    }

    #[test]
    fn test_zero_iterations() {
        let alg = Halving { iter: 0, max_iter: 0, resid: 1.0, tol: 0.0 };
        let mut calls = 0;
        let out = App::new(alg).run_with_progress(|_| calls += 1);
        assert_eq!(calls, 0);
        assert_eq!(out.iterations, 0);
        assert_eq!(out.residuals, vec![1.0]);
    }

    #[test]
    fn test_report_display() {
        let r = IterationReport { iter: 2, max_iter: 30, residual: 0.00125 };
        assert_eq!(r.to_string(), "iter 2/30, resid=1.250e-3");
    }
}
