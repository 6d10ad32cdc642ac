//! Unnormalized log-posterior evaluation.

use super::model::MhModel;
use super::posterior::Sample;
use super::priors::PriorRegistry;
use super::types::MhError;

/// Combines a model's likelihood with its registered priors.
///
/// Evaluation is pure: no caching, so identical inputs give bit-identical
/// outputs.
#[derive(Debug)]
pub struct PosteriorEvaluator<'a, M: MhModel + ?Sized> {
    model: &'a M,
    registry: PriorRegistry,
    dimension: usize,
}

impl<'a, M: MhModel + ?Sized> PosteriorEvaluator<'a, M> {
    /// # Errors
    ///
    /// Returns `MhError` if the registry does not cover exactly the model's
    /// parameter vector.
    pub fn new(model: &'a M, registry: PriorRegistry) -> Result<Self, MhError> {
        let dimension = model.parameter_names().len();
        registry.validate_coverage(dimension)?;
        Ok(Self {
            model,
            registry,
            dimension,
        })
    }

    /// Build the registry from the model's own prior declarations.
    ///
    /// # Errors
    ///
    /// Returns `MhError` if the model rejects a registration or leaves an
    /// index uncovered.
    pub fn from_model(model: &'a M) -> Result<Self, MhError> {
        let mut registry = PriorRegistry::new();
        model.set_prior_distributions(&mut registry)?;
        Self::new(model, registry)
    }

    #[must_use]
    pub const fn model(&self) -> &'a M {
        self.model
    }

    #[must_use]
    pub const fn registry(&self) -> &PriorRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    fn check_dimension(&self, parameters: &[f64]) -> Result<(), MhError> {
        if parameters.len() == self.dimension {
            Ok(())
        } else {
            Err(MhError::DimensionMismatch {
                expected: self.dimension,
                found: parameters.len(),
            })
        }
    }

    /// # Errors
    ///
    /// Returns `MhError::DimensionMismatch` for a wrong vector length.
    pub fn log_prior(&self, parameters: &[f64]) -> Result<f64, MhError> {
        self.check_dimension(parameters)?;
        self.registry.log_prior(parameters)
    }

    /// Sum of subject log-likelihoods. Stops at the first `-inf` subject.
    ///
    /// # Errors
    ///
    /// Returns `MhError::DimensionMismatch` for a wrong vector length and
    /// `MhError::Model` if the model fails.
    pub fn log_likelihood(&self, parameters: &[f64]) -> Result<f64, MhError> {
        self.check_dimension(parameters)?;
        let mut total = 0.0;
        for subject in 0..self.model.number_of_subjects() {
            let term = self.model.log_likelihood_of_subject(parameters, subject)?;
            if term == f64::NEG_INFINITY {
                return Ok(f64::NEG_INFINITY);
            }
            total += term;
        }
        Ok(total)
    }

    /// # Errors
    ///
    /// See [`PosteriorEvaluator::evaluate`].
    pub fn log_posterior(&self, parameters: &[f64]) -> Result<f64, MhError> {
        Ok(self.evaluate(parameters.to_vec())?.log_posterior())
    }

    /// Evaluate a point into a [`Sample`].
    ///
    /// The prior is computed first; a point outside its support gets
    /// `-inf` for both log-likelihood and log-posterior without consulting
    /// the model. Non-finite results are returned as values.
    ///
    /// # Errors
    ///
    /// Returns `MhError::DimensionMismatch` for a wrong vector length and
    /// `MhError::Model` if the model fails.
    pub fn evaluate(&self, parameters: Vec<f64>) -> Result<Sample, MhError> {
        let log_prior = self.log_prior(&parameters)?;
        if log_prior == f64::NEG_INFINITY {
            log::trace!("point outside prior support: {parameters:?}");
            return Ok(Sample::new(parameters, f64::NEG_INFINITY, f64::NEG_INFINITY));
        }

        let log_likelihood = self.log_likelihood(&parameters)?;
        let log_posterior = log_prior + log_likelihood;
        if !log_posterior.is_finite() {
            log::trace!(
                "degenerate evaluation (log-likelihood {log_likelihood}, log-prior {log_prior})"
            );
        }
        Ok(Sample::new(parameters, log_likelihood, log_posterior))
    }
}
