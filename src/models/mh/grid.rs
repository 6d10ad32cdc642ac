//! Starting-point selection by random search around the model's estimates.

use rand::rngs::StdRng;

use super::evaluator::PosteriorEvaluator;
use super::model::MhModel;
use super::posterior::Sample;
use super::sampling::StartingDistribution;
use super::types::MhError;

/// Choose the chain's starting sample.
///
/// The distribution mean is evaluated first and held as the incumbent. With
/// `grid_size == 0` it is returned directly and `rng` is left untouched.
/// Otherwise `grid_size` independent draws are evaluated and a draw replaces
/// the incumbent only with a strictly greater log-posterior, so the first
/// maximum wins ties and the result is never worse than the mean.
///
/// # Errors
///
/// Returns `MhError::InfeasibleStart` if every candidate has a non-finite
/// log-posterior, or any evaluation error.
pub fn initialize<M: MhModel + ?Sized>(
    evaluator: &PosteriorEvaluator<'_, M>,
    distribution: &StartingDistribution,
    grid_size: usize,
    rng: &mut StdRng,
) -> Result<Sample, MhError> {
    let mut best = evaluator.evaluate(distribution.mean().to_vec())?;
    let mut feasible = usize::from(best.is_feasible());

    for _ in 0..grid_size {
        let candidate = evaluator.evaluate(distribution.sample(rng))?;
        if !candidate.is_feasible() {
            continue;
        }
        feasible += 1;
        if !best.is_feasible() || candidate.log_posterior() > best.log_posterior() {
            best = candidate;
        }
    }

    if !best.is_feasible() {
        return Err(MhError::InfeasibleStart {
            candidates: grid_size + 1,
        });
    }
    log::debug!(
        "grid search kept log-posterior {:.4} ({feasible} of {} candidates feasible)",
        best.log_posterior(),
        grid_size + 1
    );
    Ok(best)
}

#[cfg(test)]
mod tests {
    use rand::{RngExt, SeedableRng};

    use super::*;
    use crate::models::mh::model::ModelError;
    use crate::models::mh::priors::{PriorDistribution, PriorRegistry};

    /// Log-posterior `-(x - 1)^2` on `[lower, upper]` via a uniform prior.
    struct Quadratic {
        lower: f64,
        upper: f64,
    }

    impl MhModel for Quadratic {
        fn number_of_observations(&self) -> usize {
            1
        }

        fn number_of_subjects(&self) -> usize {
            1
        }

        fn likelihood_of_subject(&self, parameters: &[f64], _: usize) -> Result<f64, ModelError> {
            let centered = parameters[0] - 1.0;
            Ok((-centered * centered).exp())
        }

        fn effect_list(&self) -> Vec<String> {
            vec!["x".to_owned()]
        }

        fn other_parameter_names(&self) -> Vec<String> {
            Vec::new()
        }

        fn starting_parameter_estimates(
            &self,
            _coefficient_of_variation: f64,
        ) -> Result<StartingDistribution, MhError> {
            StartingDistribution::diagonal(vec![-2.0], &[4.0])
        }

        fn set_prior_distributions(&self, registry: &mut PriorRegistry) -> Result<(), MhError> {
            registry.add_fixed_effect_distribution(
                PriorDistribution::Uniform {
                    lower: self.lower,
                    upper: self.upper,
                },
                0,
            )
        }

        fn is_intercept_model(&self) -> bool {
            true
        }
    }

    fn setup(model: &Quadratic) -> (PosteriorEvaluator<'_, Quadratic>, StartingDistribution) {
        let evaluator = PosteriorEvaluator::from_model(model).expect("priors cover model");
        let distribution = model
            .starting_parameter_estimates(0.1)
            .expect("valid distribution");
        (evaluator, distribution)
    }

    #[test]
    fn zero_grid_returns_mean_without_consuming_randomness() {
        let model = Quadratic {
            lower: -10.0,
            upper: 10.0,
        };
        let (evaluator, distribution) = setup(&model);
        let mut rng = StdRng::seed_from_u64(5);
        let start = initialize(&evaluator, &distribution, 0, &mut rng).expect("feasible mean");
        assert_eq!(start.parameters(), &[-2.0]);

        let mut untouched = StdRng::seed_from_u64(5);
        assert_eq!(rng.random::<u64>(), untouched.random::<u64>());
    }

    #[test]
    fn grid_result_never_worse_than_mean() {
        let model = Quadratic {
            lower: -10.0,
            upper: 10.0,
        };
        let (evaluator, distribution) = setup(&model);
        let mean_point = evaluator
            .log_posterior(distribution.mean())
            .expect("evaluates");
        let mut rng = StdRng::seed_from_u64(17);
        let start = initialize(&evaluator, &distribution, 200, &mut rng).expect("feasible grid");
        assert!(start.log_posterior() >= mean_point);
        assert!((start.parameters()[0] - 1.0).abs() < 0.5);
    }

    #[test]
    fn same_seed_gives_same_start() {
        let model = Quadratic {
            lower: -10.0,
            upper: 10.0,
        };
        let (evaluator, distribution) = setup(&model);
        let first = initialize(&evaluator, &distribution, 50, &mut StdRng::seed_from_u64(9))
            .expect("feasible grid");
        let second = initialize(&evaluator, &distribution, 50, &mut StdRng::seed_from_u64(9))
            .expect("feasible grid");
        assert_eq!(first, second);
    }

    #[test]
    fn infeasible_mean_is_replaced_by_feasible_draw() {
        let model = Quadratic {
            lower: -1.0,
            upper: 10.0,
        };
        let (evaluator, distribution) = setup(&model);
        let mut rng = StdRng::seed_from_u64(23);
        let start = initialize(&evaluator, &distribution, 100, &mut rng).expect("some draw lands");
        assert!(start.parameters()[0] >= -1.0);
    }

    #[test]
    fn all_infeasible_candidates_fail() {
        let model = Quadratic {
            lower: 50.0,
            upper: 60.0,
        };
        let (evaluator, distribution) = setup(&model);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            initialize(&evaluator, &distribution, 10, &mut rng),
            Err(MhError::InfeasibleStart { candidates: 11 })
        ));
    }
}
