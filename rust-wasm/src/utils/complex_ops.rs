//! Complex vector kernels used by the iterative solvers
//!
//! Plain loops over `Complex64` slices. All binary operations expect
//! equal-length inputs.

use num_complex::Complex64;

// ============================================================================
// Reductions
// ============================================================================

/// Hermitian inner product: sum(conj(a[i]) * b[i])
#[inline]
pub fn dot_c64(a: &[Complex64], b: &[Complex64]) -> Complex64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(ai, bi)| ai.conj() * bi).sum()
}

/// Squared L2 norm: sum(|a[i]|²)
#[inline]
pub fn norm_squared_c64(a: &[Complex64]) -> f64 {
    a.iter().map(|ai| ai.norm_sqr()).sum()
}

#[inline]
pub fn norm_c64(a: &[Complex64]) -> f64 {
    norm_squared_c64(a).sqrt()
}

/// Normalized root-mean-square error of `x` against `reference`
///
/// Returns 0 when the reference is all zero and `x` matches it.
pub fn nrmse_c64(x: &[Complex64], reference: &[Complex64]) -> f64 {
    debug_assert_eq!(x.len(), reference.len());
    let err: f64 = x.iter().zip(reference.iter())
        .map(|(xi, ri)| (xi - ri).norm_sqr())
        .sum();
    let ref_norm = norm_squared_c64(reference);
    if ref_norm > 0.0 {
        (err / ref_norm).sqrt()
    } else {
        err.sqrt()
    }
}

// ============================================================================
// In-place updates
// ============================================================================

/// a = a + alpha * b
#[inline]
pub fn axpy_c64(a: &mut [Complex64], alpha: Complex64, b: &[Complex64]) {
    debug_assert_eq!(a.len(), b.len());
    for (ai, bi) in a.iter_mut().zip(b.iter()) {
        *ai += alpha * bi;
    }
}

/// a = b + beta * a
#[inline]
pub fn xpby_c64(a: &mut [Complex64], b: &[Complex64], beta: f64) {
    debug_assert_eq!(a.len(), b.len());
    for (ai, bi) in a.iter_mut().zip(b.iter()) {
        *ai = bi + *ai * beta;
    }
}

/// Convert separate real/imaginary arrays to complex
pub fn to_complex(re: &[f64], im: &[f64]) -> Vec<Complex64> {
    debug_assert_eq!(re.len(), im.len());
    re.iter().zip(im.iter())
        .map(|(&r, &i)| Complex64::new(r, i))
        .collect()
}

/// Split complex data into (real, imaginary) arrays
pub fn split_complex(data: &[Complex64]) -> (Vec<f64>, Vec<f64>) {
    (data.iter().map(|c| c.re).collect(), data.iter().map(|c| c.im).collect())
}
