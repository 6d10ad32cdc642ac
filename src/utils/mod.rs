/////////////////////////////////////////////////////////////////////////////////////////////\
//
// Shared linear algebra, sampling and statistics utilities for the MH engine.
//
// Created on: 24 Jan 2026     Author: Tobias Kragholm
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Utilities
//!
//! Shared helpers for Cholesky factors, standard normal draws, log-space sums,
//! and summary statistics over faer matrices and plain slices.

use faer::Mat;
use rand::RngExt;
use rand::rngs::StdRng;

#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    f64::from(u32::try_from(value).unwrap_or(u32::MAX))
}

#[must_use]
pub fn matrix_is_finite(matrix: &Mat<f64>) -> bool {
    for i in 0..matrix.nrows() {
        for j in 0..matrix.ncols() {
            if !matrix[(i, j)].is_finite() {
                return false;
            }
        }
    }
    true
}

#[must_use]
pub fn identity_matrix(dim: usize) -> Mat<f64> {
    Mat::from_fn(dim, dim, |row, col| if row == col { 1.0 } else { 0.0 })
}

#[must_use]
pub fn diag_from_slice(values: &[f64]) -> Mat<f64> {
    Mat::from_fn(values.len(), values.len(), |i, j| {
        if i == j { values[i] } else { 0.0 }
    })
}

/// Lower Cholesky factor of a symmetric positive-definite matrix.
///
/// Returns `None` for non-square or non positive-definite input.
#[must_use]
pub fn cholesky_lower(matrix: &Mat<f64>) -> Option<Mat<f64>> {
    let dim = matrix.ncols();
    if matrix.nrows() != dim {
        return None;
    }
    let mut lower = Mat::<f64>::zeros(dim, dim);
    for row in 0..dim {
        for col in 0..=row {
            let mut sum = matrix[(row, col)];
            for k in 0..col {
                sum -= lower[(row, k)] * lower[(col, k)];
            }
            if row == col {
                if sum <= 0.0 || sum.is_nan() {
                    return None;
                }
                lower[(row, col)] = sum.sqrt();
            } else {
                let denom = lower[(col, col)];
                if denom <= 0.0 {
                    return None;
                }
                lower[(row, col)] = sum / denom;
            }
        }
    }
    Some(lower)
}

/// Cholesky factor with increasing diagonal jitter.
///
/// Returns the factor and the jitter that was needed (`0.0` if none).
#[must_use]
pub fn cholesky_with_jitter(matrix: &Mat<f64>) -> Option<(Mat<f64>, f64)> {
    if !matrix_is_finite(matrix) {
        return None;
    }
    if let Some(lower) = cholesky_lower(matrix) {
        return Some((lower, 0.0));
    }

    let dim = matrix.ncols();
    let mut jitter = 1.0e-10;
    for _ in 0..8 {
        let regularized = Mat::from_fn(dim, dim, |row, col| {
            if row == col {
                matrix[(row, col)] + jitter
            } else {
                matrix[(row, col)]
            }
        });
        if let Some(lower) = cholesky_lower(&regularized) {
            return Some((lower, jitter));
        }
        jitter *= 10.0;
    }
    None
}

/// `lower * z` for a lower-triangular factor.
#[must_use]
pub fn lower_times_vector(lower: &Mat<f64>, z: &[f64]) -> Vec<f64> {
    (0..lower.nrows())
        .map(|row| (0..=row).map(|col| lower[(row, col)] * z[col]).sum())
        .collect()
}

pub fn sample_standard_normal(rng: &mut StdRng) -> f64 {
    let u1 = (1.0_f64 - rng.random::<f64>()).max(f64::MIN_POSITIVE);
    let u2 = rng.random::<f64>();
    (-2.0_f64 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// Numerically stable `ln(sum(exp(values)))`.
///
/// Empty input yields `-inf`; a `+inf` entry yields `+inf`.
#[must_use]
pub fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    let sum = values.iter().map(|value| (value - max).exp()).sum::<f64>();
    max + sum.ln()
}

#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / usize_to_f64(values.len())
}

/// Unbiased sample variance; `0` for fewer than two values.
#[must_use]
pub fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let center = mean(values);
    values
        .iter()
        .map(|value| (value - center) * (value - center))
        .sum::<f64>()
        / (usize_to_f64(values.len()) - 1.0)
}
