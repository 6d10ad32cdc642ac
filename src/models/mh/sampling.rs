//! Multivariate normal sampling distribution for starting points.

use faer::Mat;
use rand::rngs::StdRng;

use super::types::MhError;
use crate::utils::{
    cholesky_with_jitter, diag_from_slice, lower_times_vector, matrix_is_finite,
    sample_standard_normal,
};

/// Multivariate normal distribution with a precomputed Cholesky factor.
#[derive(Debug, Clone)]
pub struct StartingDistribution {
    mean: Vec<f64>,
    covariance: Mat<f64>,
    cholesky: Mat<f64>,
}

impl StartingDistribution {
    /// # Errors
    ///
    /// Returns `MhError::InvalidStartingDistribution` if shapes disagree, values
    /// are non-finite, or the covariance cannot be factored.
    pub fn new(mean: Vec<f64>, covariance: Mat<f64>) -> Result<Self, MhError> {
        if mean.is_empty() {
            return Err(MhError::InvalidStartingDistribution("empty mean vector"));
        }
        if covariance.nrows() != mean.len() || covariance.ncols() != mean.len() {
            return Err(MhError::InvalidStartingDistribution(
                "covariance shape does not match mean length",
            ));
        }
        if mean.iter().any(|value| !value.is_finite()) || !matrix_is_finite(&covariance) {
            return Err(MhError::InvalidStartingDistribution("non-finite values"));
        }
        let (cholesky, jitter) = cholesky_with_jitter(&covariance).ok_or(
            MhError::InvalidStartingDistribution("covariance is not positive definite"),
        )?;
        if jitter > 0.0 {
            log::warn!("starting covariance needed diagonal jitter {jitter:e} to factor");
        }
        Ok(Self {
            mean,
            covariance,
            cholesky,
        })
    }

    /// Independent components with the given variances.
    ///
    /// # Errors
    ///
    /// Returns `MhError::InvalidStartingDistribution` on length mismatch or
    /// non-positive variances.
    pub fn diagonal(mean: Vec<f64>, variances: &[f64]) -> Result<Self, MhError> {
        if variances
            .iter()
            .any(|variance| variance.is_nan() || *variance <= 0.0)
        {
            return Err(MhError::InvalidStartingDistribution(
                "variances must be positive",
            ));
        }
        Self::new(mean, diag_from_slice(variances))
    }

    /// Diagonal covariance with standard deviation
    /// `coefficient_of_variation * max(|mean_i|, 1)` per component.
    ///
    /// The floor at one keeps components whose estimate is near zero from
    /// collapsing to a point mass.
    ///
    /// # Errors
    ///
    /// Returns `MhError` if the mean is empty/non-finite or the coefficient is
    /// not positive.
    pub fn from_coefficient_of_variation(
        mean: Vec<f64>,
        coefficient_of_variation: f64,
    ) -> Result<Self, MhError> {
        if !(coefficient_of_variation > 0.0 && coefficient_of_variation.is_finite()) {
            return Err(MhError::InvalidCoefficientOfVariation(
                coefficient_of_variation,
            ));
        }
        let variances = mean
            .iter()
            .map(|value| {
                let std_dev = coefficient_of_variation * value.abs().max(1.0);
                std_dev * std_dev
            })
            .collect::<Vec<_>>();
        Self::diagonal(mean, &variances)
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.mean.len()
    }

    #[must_use]
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    #[must_use]
    pub const fn covariance(&self) -> &Mat<f64> {
        &self.covariance
    }

    #[must_use]
    pub const fn cholesky(&self) -> &Mat<f64> {
        &self.cholesky
    }

    /// One independent realization.
    pub fn sample(&self, rng: &mut StdRng) -> Vec<f64> {
        let noise = (0..self.dimension())
            .map(|_| sample_standard_normal(rng))
            .collect::<Vec<_>>();
        lower_times_vector(&self.cholesky, &noise)
            .into_iter()
            .zip(&self.mean)
            .map(|(offset, center)| center + offset)
            .collect()
    }
}
