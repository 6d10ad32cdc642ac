//! Contract between the MH engine and the statistical models it estimates.
//!
//! The engine never inspects model structure. Fixed-effect-only and
//! hierarchical models both implement [`MhModel`]; any random-effect
//! bookkeeping lives inside the concrete model.

use thiserror::Error;

use super::priors::PriorRegistry;
use super::sampling::StartingDistribution;
use super::types::MhError;
use crate::input::InputError;

/// Failures raised by a model while evaluating its likelihood.
///
/// These are fatal to estimation. A point with zero likelihood is not a
/// failure; return `0.0` (or `-inf` on the log scale) instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("subject index {subject} out of range for {subjects} subjects")]
    SubjectOutOfRange { subject: usize, subjects: usize },
    #[error("parameter vector length ({found}) does not match model dimension ({expected})")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("no Gauss-Hermite rule of order {order}")]
    UnsupportedQuadratureOrder { order: usize },
    #[error("invalid model input: {0}")]
    Input(#[from] InputError),
    #[error("model evaluation failed: {0}")]
    Evaluation(String),
}

/// A statistical model that can be estimated by Metropolis-Hastings.
///
/// The parameter vector is ordered as the model's
/// [`parameter_names`](MhModel::parameter_names): fixed effects first, then
/// any random-effect realizations and nuisance parameters.
pub trait MhModel {
    fn number_of_observations(&self) -> usize;

    fn number_of_subjects(&self) -> usize;

    /// Likelihood (not log) of subject `subject` given the full parameter vector.
    ///
    /// # Errors
    ///
    /// Returns `ModelError` if the model cannot be evaluated at all.
    fn likelihood_of_subject(&self, parameters: &[f64], subject: usize) -> Result<f64, ModelError>;

    /// Log-likelihood of one subject. Defaults to `ln(likelihood_of_subject)`,
    /// so a zero likelihood maps to `-inf`.
    ///
    /// Models whose subject likelihood can underflow should override this.
    ///
    /// # Errors
    ///
    /// Returns `ModelError` if the model cannot be evaluated at all.
    fn log_likelihood_of_subject(
        &self,
        parameters: &[f64],
        subject: usize,
    ) -> Result<f64, ModelError> {
        Ok(self.likelihood_of_subject(parameters, subject)?.ln())
    }

    /// Subject log-likelihood used for conditional predictive ordinates.
    ///
    /// Defaults to the conditional likelihood. Hierarchical models may
    /// integrate their subject-level random effects out instead.
    ///
    /// # Errors
    ///
    /// Returns `ModelError` if the model cannot be evaluated at all.
    fn predictive_log_likelihood_of_subject(
        &self,
        parameters: &[f64],
        subject: usize,
    ) -> Result<f64, ModelError> {
        self.log_likelihood_of_subject(parameters, subject)
    }

    /// Names of the fixed effects, in vector order.
    fn effect_list(&self) -> Vec<String>;

    /// Names of every remaining parameter, in vector order.
    fn other_parameter_names(&self) -> Vec<String>;

    /// Full ordered name list: effects, then other parameters.
    fn parameter_names(&self) -> Vec<String> {
        let mut names = self.effect_list();
        names.extend(self.other_parameter_names());
        names
    }

    /// Sampling distribution for the grid initializer: the model's point
    /// estimates as mean, with a diagonal covariance scaled by
    /// `coefficient_of_variation`.
    ///
    /// # Errors
    ///
    /// Returns `MhError` if no valid starting distribution can be built.
    fn starting_parameter_estimates(
        &self,
        coefficient_of_variation: f64,
    ) -> Result<StartingDistribution, MhError>;

    /// Register one prior entry per parameter.
    ///
    /// # Errors
    ///
    /// Returns `MhError` if a registration is rejected.
    fn set_prior_distributions(&self, registry: &mut PriorRegistry) -> Result<(), MhError>;

    /// Informational flag: the model has no covariates beyond an intercept.
    fn is_intercept_model(&self) -> bool;
}
