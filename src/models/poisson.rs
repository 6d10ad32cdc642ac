//! Log-linear Poisson model for counts grouped by subject.
//!
//! Without random effects the parameter vector is `[log_mean]`. With subject
//! intercepts it is `[log_mean, u_1, ..., u_n, tau]`, where
//! `u_i ~ Normal(0, tau^2)` shifts subject `i`'s log rate.
//!
//! For model comparison the hierarchical variant scores each subject with the
//! intercept integrated out by adaptive Gauss-Hermite quadrature, so CPOs
//! measure prediction for a new draw of that subject rather than for its
//! fitted intercept.

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use statrs::function::gamma::ln_gamma;

use super::mh::{
    MhError, MhModel, ModelError, PriorDistribution, PriorRegistry, RandomEffectDistribution,
    StartingDistribution,
};
use crate::input::SubjectInput;
use crate::quadrature::{GaussHermiteRule, gauss_hermite};
use crate::utils::{mean, sample_variance, usize_to_f64};

const DEFAULT_QUADRATURE_ORDER: usize = 20;
const MODE_NEWTON_MAX_ITERS: usize = 50;
const MODE_NEWTON_TOLERANCE: f64 = 1.0e-10;
const MIN_RATE: f64 = 0.1;

/// Random-effects structure of a [`PoissonModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RandomEffectsStructure {
    /// One common rate for every subject.
    #[default]
    None,
    /// Normal random intercept per subject on the log scale.
    SubjectIntercepts,
}

/// Priors on the log mean and the random-intercept standard deviation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoissonPriors {
    pub log_mean: PriorDistribution,
    pub random_intercept_std_dev: PriorDistribution,
}

impl Default for PoissonPriors {
    fn default() -> Self {
        Self {
            log_mean: PriorDistribution::Normal {
                mean: 0.0,
                variance: 100.0,
            },
            random_intercept_std_dev: PriorDistribution::Uniform {
                lower: 0.0,
                upper: 10.0,
            },
        }
    }
}

#[derive(Debug, Clone)]
struct SubjectCounts {
    subject_id: u64,
    observations: usize,
    total: f64,
    log_factorial_sum: f64,
}

/// Poisson counts, optionally with subject random intercepts.
#[derive(Debug, Clone)]
pub struct PoissonModel {
    subjects: Vec<SubjectCounts>,
    n_observations: usize,
    structure: RandomEffectsStructure,
    priors: PoissonPriors,
    rule: &'static GaussHermiteRule,
}

impl PoissonModel {
    /// # Errors
    ///
    /// Returns `ModelError::Input` if the outcome is not a valid count vector.
    pub fn new(input: &SubjectInput, structure: RandomEffectsStructure) -> Result<Self, ModelError> {
        input.validate_counts()?;
        let subjects = input
            .subjects()
            .into_iter()
            .map(|group| {
                let counts = group
                    .rows
                    .iter()
                    .map(|row| input.outcome[*row])
                    .collect::<Vec<_>>();
                SubjectCounts {
                    subject_id: group.subject_id,
                    observations: counts.len(),
                    total: counts.iter().sum(),
                    log_factorial_sum: counts.iter().map(|y| ln_gamma(y + 1.0)).sum(),
                }
            })
            .collect();
        let rule = gauss_hermite(DEFAULT_QUADRATURE_ORDER).ok_or(
            ModelError::UnsupportedQuadratureOrder {
                order: DEFAULT_QUADRATURE_ORDER,
            },
        )?;
        Ok(Self {
            subjects,
            n_observations: input.len(),
            structure,
            priors: PoissonPriors::default(),
            rule,
        })
    }

    #[must_use]
    pub const fn with_priors(mut self, priors: PoissonPriors) -> Self {
        self.priors = priors;
        self
    }

    /// Use a different Gauss-Hermite order for the marginal subject likelihood.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::UnsupportedQuadratureOrder` for orders outside
    /// [`crate::quadrature::SUPPORTED_ORDERS`].
    pub fn with_quadrature_order(mut self, order: usize) -> Result<Self, ModelError> {
        self.rule = gauss_hermite(order).ok_or(ModelError::UnsupportedQuadratureOrder { order })?;
        Ok(self)
    }

    #[must_use]
    pub const fn structure(&self) -> RandomEffectsStructure {
        self.structure
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        match self.structure {
            RandomEffectsStructure::None => 1,
            RandomEffectsStructure::SubjectIntercepts => self.subjects.len() + 2,
        }
    }

    /// Counts for `subjects` subjects with `per_subject` observations each,
    /// log rate `log_mean + u_i` and `u_i ~ Normal(0, tau^2)`.
    #[must_use]
    pub fn simulate(
        log_mean: f64,
        tau: f64,
        subjects: usize,
        per_subject: usize,
        seed: u64,
    ) -> SubjectInput {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut outcome = Vec::with_capacity(subjects * per_subject);
        let mut subject_ids = Vec::with_capacity(subjects * per_subject);
        for subject in 0..subjects {
            let rate = (log_mean + RandomEffectDistribution::Normal.sample(tau, &mut rng)).exp();
            for _ in 0..per_subject {
                outcome.push(sample_poisson(rate, &mut rng));
                subject_ids.push(u64::try_from(subject).unwrap_or(u64::MAX));
            }
        }
        SubjectInput::new(outcome, subject_ids)
    }

    fn check(&self, parameters: &[f64], subject: usize) -> Result<&SubjectCounts, ModelError> {
        if parameters.len() != self.dimension() {
            return Err(ModelError::DimensionMismatch {
                expected: self.dimension(),
                found: parameters.len(),
            });
        }
        self.subjects
            .get(subject)
            .ok_or(ModelError::SubjectOutOfRange {
                subject,
                subjects: self.subjects.len(),
            })
    }

    fn random_intercept(&self, parameters: &[f64], subject: usize) -> f64 {
        match self.structure {
            RandomEffectsStructure::None => 0.0,
            RandomEffectsStructure::SubjectIntercepts => parameters[1 + subject],
        }
    }

    /// Marginal log-likelihood of one subject with its intercept integrated
    /// against `Normal(0, tau^2)`.
    fn marginal_log_likelihood(
        counts: &SubjectCounts,
        log_mean: f64,
        tau: f64,
        rule: &GaussHermiteRule,
    ) -> f64 {
        if !(tau > 0.0 && tau.is_finite()) {
            return f64::NEG_INFINITY;
        }
        let observations = usize_to_f64(counts.observations);
        let precision = 1.0 / (tau * tau);

        // Newton on the concave log integrand, started at the data-only mode.
        let mut mode = (counts.total.max(0.5) / observations).ln() - log_mean;
        let mut curvature = precision;
        for _ in 0..MODE_NEWTON_MAX_ITERS {
            let expected = observations * (log_mean + mode).exp();
            let gradient = counts.total - expected - mode * precision;
            curvature = expected + precision;
            let step = gradient / curvature;
            mode += step;
            if step.abs() <= MODE_NEWTON_TOLERANCE {
                break;
            }
        }
        if !mode.is_finite() {
            return f64::NEG_INFINITY;
        }

        let conditional = |u: f64| {
            let eta = log_mean + u;
            counts.total.mul_add(eta, -observations * eta.exp()) - counts.log_factorial_sum
        };
        rule.log_integral_adaptive(mode, curvature.sqrt().recip(), |u| {
            conditional(u) + RandomEffectDistribution::Normal.log_density(u, tau)
        })
    }
}

impl MhModel for PoissonModel {
    fn number_of_observations(&self) -> usize {
        self.n_observations
    }

    fn number_of_subjects(&self) -> usize {
        self.subjects.len()
    }

    fn likelihood_of_subject(&self, parameters: &[f64], subject: usize) -> Result<f64, ModelError> {
        Ok(self.log_likelihood_of_subject(parameters, subject)?.exp())
    }

    fn log_likelihood_of_subject(
        &self,
        parameters: &[f64],
        subject: usize,
    ) -> Result<f64, ModelError> {
        let counts = self.check(parameters, subject)?;
        let eta = parameters[0] + self.random_intercept(parameters, subject);
        Ok(counts
            .total
            .mul_add(eta, -usize_to_f64(counts.observations) * eta.exp())
            - counts.log_factorial_sum)
    }

    fn predictive_log_likelihood_of_subject(
        &self,
        parameters: &[f64],
        subject: usize,
    ) -> Result<f64, ModelError> {
        match self.structure {
            RandomEffectsStructure::None => self.log_likelihood_of_subject(parameters, subject),
            RandomEffectsStructure::SubjectIntercepts => {
                let counts = self.check(parameters, subject)?;
                let tau = parameters[self.subjects.len() + 1];
                Ok(Self::marginal_log_likelihood(
                    counts,
                    parameters[0],
                    tau,
                    self.rule,
                ))
            }
        }
    }

    fn effect_list(&self) -> Vec<String> {
        vec!["log_mean".to_owned()]
    }

    fn other_parameter_names(&self) -> Vec<String> {
        match self.structure {
            RandomEffectsStructure::None => Vec::new(),
            RandomEffectsStructure::SubjectIntercepts => self
                .subjects
                .iter()
                .map(|counts| format!("u_{}", counts.subject_id))
                .chain(std::iter::once("tau".to_owned()))
                .collect(),
        }
    }

    fn starting_parameter_estimates(
        &self,
        coefficient_of_variation: f64,
    ) -> Result<StartingDistribution, MhError> {
        let total = self.subjects.iter().map(|counts| counts.total).sum::<f64>();
        let log_mean = (total / usize_to_f64(self.n_observations)).max(MIN_RATE).ln();
        let mut estimates = vec![log_mean];

        if self.structure == RandomEffectsStructure::SubjectIntercepts {
            let intercepts = self
                .subjects
                .iter()
                .map(|counts| {
                    (counts.total / usize_to_f64(counts.observations))
                        .max(MIN_RATE)
                        .ln()
                        - log_mean
                })
                .collect::<Vec<_>>();
            let centre = mean(&intercepts);
            let tau = sample_variance(&intercepts).sqrt().max(MIN_RATE);
            estimates.extend(intercepts.iter().map(|u| u - centre));
            estimates.push(tau);
            estimates[0] += centre;
        }

        StartingDistribution::from_coefficient_of_variation(estimates, coefficient_of_variation)
    }

    fn set_prior_distributions(&self, registry: &mut PriorRegistry) -> Result<(), MhError> {
        registry.add_fixed_effect_distribution(self.priors.log_mean, 0)?;
        if self.structure == RandomEffectsStructure::SubjectIntercepts {
            let std_index = self.subjects.len() + 1;
            for index in 1..std_index {
                registry.add_random_effect_standard_deviation(
                    RandomEffectDistribution::Normal,
                    self.priors.random_intercept_std_dev,
                    index,
                    std_index,
                )?;
            }
        }
        Ok(())
    }

    fn is_intercept_model(&self) -> bool {
        true
    }
}

/// Poisson draw by counting unit-rate exponential arrivals before `rate`.
fn sample_poisson(rate: f64, rng: &mut StdRng) -> f64 {
    let mut count = 0.0;
    let mut elapsed = -(1.0 - rng.random::<f64>()).ln();
    while elapsed <= rate {
        count += 1.0;
        elapsed -= (1.0 - rng.random::<f64>()).ln();
    }
    count
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::input::InputError;
    use crate::models::mh::priors::log_normal_density;

    fn small_input() -> SubjectInput {
        SubjectInput::new(vec![0.0, 2.0, 3.0, 1.0, 4.0], vec![1, 1, 2, 2, 2])
    }

    #[test]
    fn rejects_non_count_outcomes() {
        let input = SubjectInput::independent(vec![1.0, 0.5]);
        assert!(matches!(
            PoissonModel::new(&input, RandomEffectsStructure::None),
            Err(ModelError::Input(InputError::NonIntegerOutcome))
        ));
    }

    #[test]
    fn conditional_likelihood_matches_pmf_product() {
        let model = PoissonModel::new(&small_input(), RandomEffectsStructure::None).expect("counts");
        let rate = 1.5_f64;
        let expected = [0.0_f64, 2.0]
            .iter()
            .map(|y| y * rate.ln() - rate - ln_gamma(y + 1.0))
            .sum::<f64>();
        let value = model
            .log_likelihood_of_subject(&[rate.ln()], 0)
            .expect("in range");
        assert_relative_eq!(value, expected, epsilon = 1.0e-12);
        assert_relative_eq!(
            model.likelihood_of_subject(&[rate.ln()], 0).expect("in range"),
            expected.exp(),
            epsilon = 1.0e-12
        );
    }

    #[test]
    fn hierarchical_layout_names_every_intercept() {
        let model = PoissonModel::new(&small_input(), RandomEffectsStructure::SubjectIntercepts)
            .expect("counts");
        assert_eq!(model.dimension(), 4);
        assert_eq!(
            model.parameter_names(),
            vec!["log_mean", "u_1", "u_2", "tau"]
        );
        let mut registry = PriorRegistry::new();
        model
            .set_prior_distributions(&mut registry)
            .expect("registration");
        assert!(registry.validate_coverage(4).is_ok());
        assert_eq!(registry.random_effect_indices(), vec![1, 2]);
    }

    #[test]
    fn marginal_likelihood_matches_brute_force_integral() {
        let model = PoissonModel::new(&small_input(), RandomEffectsStructure::SubjectIntercepts)
            .expect("counts");
        let parameters = [0.4, 0.0, 0.0, 0.8];
        let marginal = model
            .predictive_log_likelihood_of_subject(&parameters, 1)
            .expect("in range");

        let step = 1.0e-3;
        let brute = (-8_000..=8_000)
            .map(|k| {
                let u = f64::from(k) * step;
                let mut shifted = parameters;
                shifted[2] = u;
                let conditional = model
                    .log_likelihood_of_subject(&shifted, 1)
                    .expect("in range");
                (conditional + log_normal_density(u, 0.0, 0.64)).exp() * step
            })
            .sum::<f64>()
            .ln();
        assert_relative_eq!(marginal, brute, epsilon = 1.0e-6);
    }

    #[test]
    fn marginal_likelihood_ignores_the_fitted_intercept() {
        let model = PoissonModel::new(&small_input(), RandomEffectsStructure::SubjectIntercepts)
            .expect("counts");
        let a = model
            .predictive_log_likelihood_of_subject(&[0.4, 0.0, -1.0, 0.8], 1)
            .expect("in range");
        let b = model
            .predictive_log_likelihood_of_subject(&[0.4, 0.0, 2.0, 0.8], 1)
            .expect("in range");
        assert_eq!(a.to_bits(), b.to_bits());
        assert!(
            model
                .predictive_log_likelihood_of_subject(&[0.4, 0.0, 0.0, 0.0], 1)
                .expect("in range")
                .is_infinite()
        );
    }

    #[test]
    fn unsupported_quadrature_order_is_rejected() {
        let model = PoissonModel::new(&small_input(), RandomEffectsStructure::SubjectIntercepts)
            .expect("counts");
        assert!(matches!(
            model.with_quadrature_order(7),
            Err(ModelError::UnsupportedQuadratureOrder { order: 7 })
        ));
    }

    #[test]
    fn simulated_counts_have_requested_mean() {
        let input = PoissonModel::simulate(1.0, 0.0, 50, 40, 4);
        assert_eq!(input.len(), 2_000);
        assert!(input.validate_counts().is_ok());
        assert!((mean(&input.outcome) - 1.0_f64.exp()).abs() < 0.15);
    }

    #[test]
    fn simulated_subject_rates_spread_by_tau() {
        let input = PoissonModel::simulate(1.0, 1.0, 200, 50, 21);
        let log_means = input
            .subjects()
            .iter()
            .map(|group| {
                let total = group.rows.iter().map(|row| input.outcome[*row]).sum::<f64>();
                (total / 50.0).max(0.02).ln()
            })
            .collect::<Vec<_>>();
        assert_eq!(log_means.len(), 200);
        let spread = sample_variance(&log_means);
        assert!(spread > 0.7 && spread < 1.35, "variance of log rates {spread}");
    }

    #[test]
    fn starting_estimates_are_centred() {
        let input = PoissonModel::simulate(1.0, 1.0, 30, 6, 8);
        let model = PoissonModel::new(&input, RandomEffectsStructure::SubjectIntercepts)
            .expect("counts");
        let start = model.starting_parameter_estimates(0.1).expect("valid start");
        let intercepts = &start.mean()[1..=30];
        assert!(mean(intercepts).abs() < 1.0e-12);
        assert!(start.mean()[31] > 0.0);
    }
}
