//! Gaussian model with unknown mean and variance.
//!
//! Each observation is its own subject, so the model has no random effects.
//! Parameters are ordered `[mean, variance]`.

use rand::SeedableRng;
use rand::rngs::StdRng;

use super::mh::{
    MhError, MhModel, ModelError, PriorDistribution, PriorRegistry, StartingDistribution,
};
use crate::input::SubjectInput;
use crate::models::mh::priors::log_normal_density;
use crate::utils::{mean, sample_standard_normal, sample_variance};

/// Priors on the mean and the variance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalPriors {
    pub mean: PriorDistribution,
    pub variance: PriorDistribution,
}

impl Default for NormalPriors {
    fn default() -> Self {
        Self {
            mean: PriorDistribution::Normal {
                mean: 0.0,
                variance: 1.0e4,
            },
            variance: PriorDistribution::InverseGamma {
                shape: 0.001,
                scale: 0.001,
            },
        }
    }
}

/// Independent `Normal(mean, variance)` observations.
#[derive(Debug, Clone)]
pub struct NormalModel {
    outcome: Vec<f64>,
    priors: NormalPriors,
}

impl NormalModel {
    /// # Errors
    ///
    /// Returns `ModelError::Input` if the outcome is empty or non-finite.
    pub fn new(outcome: Vec<f64>) -> Result<Self, ModelError> {
        SubjectInput::independent(outcome.clone()).validate()?;
        Ok(Self {
            outcome,
            priors: NormalPriors::default(),
        })
    }

    /// Build from grouped input, ignoring the subject labels.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Input` if the input is invalid.
    pub fn from_input(input: &SubjectInput) -> Result<Self, ModelError> {
        input.validate()?;
        Self::new(input.outcome.clone())
    }

    #[must_use]
    pub const fn with_priors(mut self, priors: NormalPriors) -> Self {
        self.priors = priors;
        self
    }

    #[must_use]
    pub fn outcome(&self) -> &[f64] {
        &self.outcome
    }

    /// `n` draws from `Normal(mean, std_dev^2)`.
    #[must_use]
    pub fn simulate(mean: f64, std_dev: f64, n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| std_dev.mul_add(sample_standard_normal(&mut rng), mean))
            .collect()
    }

    fn check(&self, parameters: &[f64], subject: usize) -> Result<(), ModelError> {
        if parameters.len() != 2 {
            return Err(ModelError::DimensionMismatch {
                expected: 2,
                found: parameters.len(),
            });
        }
        if subject >= self.outcome.len() {
            return Err(ModelError::SubjectOutOfRange {
                subject,
                subjects: self.outcome.len(),
            });
        }
        Ok(())
    }
}

impl MhModel for NormalModel {
    fn number_of_observations(&self) -> usize {
        self.outcome.len()
    }

    fn number_of_subjects(&self) -> usize {
        self.outcome.len()
    }

    fn likelihood_of_subject(&self, parameters: &[f64], subject: usize) -> Result<f64, ModelError> {
        Ok(self.log_likelihood_of_subject(parameters, subject)?.exp())
    }

    fn log_likelihood_of_subject(
        &self,
        parameters: &[f64],
        subject: usize,
    ) -> Result<f64, ModelError> {
        self.check(parameters, subject)?;
        Ok(log_normal_density(
            self.outcome[subject],
            parameters[0],
            parameters[1],
        ))
    }

    fn effect_list(&self) -> Vec<String> {
        vec!["mean".to_owned()]
    }

    fn other_parameter_names(&self) -> Vec<String> {
        vec!["variance".to_owned()]
    }

    fn starting_parameter_estimates(
        &self,
        coefficient_of_variation: f64,
    ) -> Result<StartingDistribution, MhError> {
        let center = mean(&self.outcome);
        let variance = sample_variance(&self.outcome).max(1.0e-6);
        StartingDistribution::from_coefficient_of_variation(
            vec![center, variance],
            coefficient_of_variation,
        )
    }

    fn set_prior_distributions(&self, registry: &mut PriorRegistry) -> Result<(), MhError> {
        registry.add_fixed_effect_distribution(self.priors.mean, 0)?;
        registry.add_fixed_effect_distribution(self.priors.variance, 1)
    }

    fn is_intercept_model(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::input::InputError;

    #[test]
    fn empty_outcome_is_rejected() {
        assert!(matches!(
            NormalModel::new(Vec::new()),
            Err(ModelError::Input(InputError::Empty))
        ));
    }

    #[test]
    fn subject_likelihood_is_gaussian_density() {
        let model = NormalModel::new(vec![1.0, 3.0]).expect("valid outcome");
        let likelihood = model
            .likelihood_of_subject(&[1.0, 4.0], 0)
            .expect("in range");
        assert_relative_eq!(
            likelihood,
            1.0 / (std::f64::consts::TAU * 4.0).sqrt(),
            epsilon = 1.0e-12
        );
    }

    #[test]
    fn non_positive_variance_has_zero_likelihood() {
        let model = NormalModel::new(vec![1.0]).expect("valid outcome");
        assert_relative_eq!(
            model.likelihood_of_subject(&[1.0, 0.0], 0).expect("in range"),
            0.0
        );
        assert!(
            model
                .log_likelihood_of_subject(&[1.0, -1.0], 0)
                .expect("in range")
                .is_infinite()
        );
    }

    #[test]
    fn out_of_range_subject_is_an_error() {
        let model = NormalModel::new(vec![1.0]).expect("valid outcome");
        assert!(matches!(
            model.likelihood_of_subject(&[0.0, 1.0], 1),
            Err(ModelError::SubjectOutOfRange {
                subject: 1,
                subjects: 1
            })
        ));
    }

    #[test]
    fn starting_estimates_use_sample_moments() {
        let model = NormalModel::new(vec![1.0, 2.0, 3.0]).expect("valid outcome");
        let start = model.starting_parameter_estimates(0.1).expect("valid start");
        assert_relative_eq!(start.mean()[0], 2.0, epsilon = 1.0e-12);
        assert_relative_eq!(start.mean()[1], 1.0, epsilon = 1.0e-12);
        assert_eq!(model.parameter_names(), vec!["mean", "variance"]);
    }

    #[test]
    fn simulate_is_reproducible() {
        assert_eq!(
            NormalModel::simulate(3.0, 4.0, 10, 1),
            NormalModel::simulate(3.0, 4.0, 10, 1)
        );
    }
}
