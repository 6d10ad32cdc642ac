//! Single-chain Metropolis-Hastings driver.
//!
//! A chain moves through `Initializing -> WarmingUp -> Sampling -> Finalized`,
//! or stops in `Failed` when the model cannot be evaluated.
//! Warm-up retunes the proposal scale in batches; once it ends the proposal is
//! frozen and the remaining iterations run with a fixed kernel. Every
//! iteration's sample is kept in the history and the retained selection is
//! produced only by [`ChainDriver::release_final_sample_selection`].

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

use super::comparison::{LpmlReport, log_pseudo_marginal_likelihood};
use super::evaluator::PosteriorEvaluator;
use super::grid;
use super::model::MhModel;
use super::posterior::{
    PosteriorSampleReport, PosteriorSamples, PosteriorSummary, Sample, summarize_posterior,
};
use super::proposal::AdaptiveProposal;
use super::types::{
    ChainPhase, ChainReport, MhError, ModelInfo, SamplerConfig, SamplerDiagnostics,
};
use crate::inference::ProposalStats;

/// Mutable state of one chain: the current point, its proposal, and counts.
#[derive(Debug, Clone)]
pub struct ChainState {
    current: Sample,
    proposal: AdaptiveProposal,
    stats: ProposalStats,
}

impl ChainState {
    #[must_use]
    pub fn new(current: Sample, proposal: AdaptiveProposal) -> Self {
        Self {
            current,
            proposal,
            stats: ProposalStats::default(),
        }
    }

    #[must_use]
    pub const fn current(&self) -> &Sample {
        &self.current
    }

    #[must_use]
    pub const fn proposal(&self) -> &AdaptiveProposal {
        &self.proposal
    }

    #[must_use]
    pub const fn stats(&self) -> ProposalStats {
        self.stats
    }
}

/// Metropolis acceptance test on the log scale.
///
/// A non-negative log ratio accepts without drawing from `rng`.
pub fn should_accept(log_acceptance: f64, rng: &mut StdRng) -> bool {
    log_acceptance >= 0.0 || rng.random::<f64>().ln() < log_acceptance
}

/// One propose/evaluate/accept step on an explicit state.
///
/// A proposal with a non-finite log-posterior is rejected outright. Returns
/// whether the proposal was accepted.
///
/// # Errors
///
/// Returns `MhError` if evaluating the proposal fails.
pub fn iterate<M: MhModel + ?Sized>(
    evaluator: &PosteriorEvaluator<'_, M>,
    state: &mut ChainState,
    rng: &mut StdRng,
) -> Result<bool, MhError> {
    let candidate = state.proposal.propose(state.current.parameters(), rng);
    let proposed = evaluator.evaluate(candidate)?;

    let accepted = if proposed.is_feasible() {
        should_accept(
            proposed.log_posterior() - state.current.log_posterior(),
            rng,
        )
    } else {
        log::trace!("rejected proposal with non-finite log-posterior");
        false
    };

    state.stats.record(accepted);
    state.proposal.record(accepted);
    if accepted {
        state.current = proposed;
    }
    Ok(accepted)
}

/// Owns one chain from starting-point selection through finalization.
#[derive(Debug)]
pub struct ChainDriver<'a, M: MhModel + ?Sized> {
    evaluator: PosteriorEvaluator<'a, M>,
    config: SamplerConfig,
    rng: StdRng,
    phase: ChainPhase,
    state: Option<ChainState>,
    initial: Option<Sample>,
    history: Vec<Sample>,
    warm_up_stats: ProposalStats,
    final_selection: Option<PosteriorSamples>,
    failure: Option<MhError>,
}

impl<'a, M: MhModel + ?Sized> ChainDriver<'a, M> {
    /// Validate `config`, collect the model's priors, and check that they
    /// cover the parameter vector.
    ///
    /// # Errors
    ///
    /// Returns `MhError` for invalid configuration or prior registration.
    pub fn new(model: &'a M, config: SamplerConfig) -> Result<Self, MhError> {
        config.validate()?;
        let evaluator = PosteriorEvaluator::from_model(model)?;
        Ok(Self {
            evaluator,
            config,
            rng: StdRng::seed_from_u64(config.mcmc.seed),
            phase: ChainPhase::Initializing,
            state: None,
            initial: None,
            history: Vec::with_capacity(config.mcmc.iterations),
            warm_up_stats: ProposalStats::default(),
            final_selection: None,
            failure: None,
        })
    }

    /// Choose the starting point and build the proposal.
    ///
    /// No-op once the chain has started.
    ///
    /// # Errors
    ///
    /// Returns `MhError::AlreadyFinalized` after finalization, or any error
    /// from the model's starting distribution or the grid search.
    pub fn initialize(&mut self) -> Result<(), MhError> {
        self.ensure_runnable()?;
        if self.phase != ChainPhase::Initializing {
            return Ok(());
        }
        let outcome = self.choose_start();
        self.stop_on_model_error(outcome)
    }

    fn choose_start(&mut self) -> Result<(), MhError> {
        let distribution = self
            .evaluator
            .model()
            .starting_parameter_estimates(self.config.coefficient_of_variation)?;
        if distribution.dimension() != self.evaluator.dimension() {
            return Err(MhError::DimensionMismatch {
                expected: self.evaluator.dimension(),
                found: distribution.dimension(),
            });
        }

        let start = grid::initialize(
            &self.evaluator,
            &distribution,
            self.config.mcmc.initial_grid_size,
            &mut self.rng,
        )?;
        let mut proposal =
            AdaptiveProposal::new(distribution.cholesky().clone(), self.config.proposal_tuning);

        if self.config.mcmc.warm_up == 0 {
            proposal.freeze();
            self.phase = ChainPhase::Sampling;
        } else {
            self.phase = ChainPhase::WarmingUp;
        }
        log::info!(
            "chain started at log-posterior {:.4}; proposal scale {:.4}; phase {:?}",
            start.log_posterior(),
            proposal.scale(),
            self.phase
        );

        self.initial = Some(start.clone());
        self.state = Some(ChainState::new(start, proposal));
        Ok(())
    }

    /// Run one iteration, initializing first if needed.
    ///
    /// Returns `Some(accepted)` or `None` when the configured iterations are
    /// already complete.
    ///
    /// # Errors
    ///
    /// Returns `MhError::AlreadyFinalized` after finalization, or any
    /// evaluation error. After a model error every later call returns that
    /// error again.
    pub fn step(&mut self) -> Result<Option<bool>, MhError> {
        self.ensure_runnable()?;
        if self.phase == ChainPhase::Initializing {
            self.initialize()?;
        }
        let outcome = self.advance();
        self.stop_on_model_error(outcome)
    }

    fn advance(&mut self) -> Result<Option<bool>, MhError> {
        let iterations = self.config.mcmc.iterations;
        if self.history.len() >= iterations {
            return Ok(None);
        }
        let state = self.state.as_mut().ok_or(MhError::ChainIncomplete {
            completed: 0,
            required: iterations,
        })?;

        let accepted = iterate(&self.evaluator, state, &mut self.rng)?;
        self.history.push(state.current.clone());
        let completed = self.history.len();

        if self.phase == ChainPhase::WarmingUp {
            state.proposal.retune();
            if completed >= self.config.mcmc.warm_up {
                state.proposal.freeze();
                self.warm_up_stats = state.stats;
                self.phase = ChainPhase::Sampling;
                log::info!(
                    "warm-up finished after {completed} iterations; proposal scale {:.4}, acceptance {:.3}",
                    state.proposal.scale(),
                    state.stats.acceptance_rate()
                );
            }
        }
        if completed == iterations {
            log::info!(
                "chain completed {iterations} iterations; acceptance {:.3}",
                state.stats.acceptance_rate()
            );
        }
        Ok(Some(accepted))
    }

    fn ensure_runnable(&self) -> Result<(), MhError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        if self.phase == ChainPhase::Finalized {
            return Err(MhError::AlreadyFinalized);
        }
        Ok(())
    }

    /// A model error is fatal: the chain moves to `Failed` and later calls
    /// return the same error without evaluating again.
    fn stop_on_model_error<T>(&mut self, outcome: Result<T, MhError>) -> Result<T, MhError> {
        if let Err(error @ MhError::Model(_)) = &outcome {
            log::warn!(
                "chain stopped after {} iterations: {error}",
                self.history.len()
            );
            self.phase = ChainPhase::Failed;
            self.failure = Some(error.clone());
        }
        outcome
    }

    /// Run all remaining iterations.
    ///
    /// # Errors
    ///
    /// Returns `MhError::AlreadyFinalized` after finalization, or any error
    /// raised by [`ChainDriver::step`].
    pub fn run(&mut self) -> Result<(), MhError> {
        while self.step()?.is_some() {}
        Ok(())
    }

    /// Select the retained draws: `history[burn_in..]` stepped by `thin`.
    ///
    /// The selection is computed once; later calls return the cached value.
    ///
    /// # Errors
    ///
    /// Returns `MhError::ChainIncomplete` if the run has not finished.
    pub fn release_final_sample_selection(&mut self) -> Result<&PosteriorSamples, MhError> {
        if self.final_selection.is_none() {
            let mcmc = self.config.mcmc;
            if self.history.len() < mcmc.iterations {
                return Err(MhError::ChainIncomplete {
                    completed: self.history.len(),
                    required: mcmc.iterations,
                });
            }
            let draws = self.history[mcmc.burn_in..]
                .iter()
                .step_by(mcmc.thin)
                .cloned()
                .collect::<Vec<_>>();
            log::info!("released {} retained draws", draws.len());
            self.final_selection = Some(PosteriorSamples::new(
                self.evaluator.model().parameter_names(),
                draws,
            ));
            self.phase = ChainPhase::Finalized;
        }
        self.final_selection.as_ref().ok_or(MhError::NotFinalized)
    }

    #[must_use]
    pub const fn phase(&self) -> ChainPhase {
        self.phase
    }

    #[must_use]
    pub const fn config(&self) -> SamplerConfig {
        self.config
    }

    #[must_use]
    pub const fn evaluator(&self) -> &PosteriorEvaluator<'a, M> {
        &self.evaluator
    }

    /// Every iteration's sample, in order.
    #[must_use]
    pub fn history(&self) -> &[Sample] {
        &self.history
    }

    /// The starting sample, once initialized.
    #[must_use]
    pub const fn initial_sample(&self) -> Option<&Sample> {
        self.initial.as_ref()
    }

    #[must_use]
    pub fn current(&self) -> Option<&Sample> {
        self.state.as_ref().map(ChainState::current)
    }

    #[must_use]
    pub fn model_info(&self) -> ModelInfo {
        let model = self.evaluator.model();
        ModelInfo {
            n_observations: model.number_of_observations(),
            n_subjects: model.number_of_subjects(),
            dimension: self.evaluator.dimension(),
            parameter_names: model.parameter_names(),
            intercept_model: model.is_intercept_model(),
        }
    }

    /// Acceptance and scale statistics so far.
    #[must_use]
    pub fn diagnostics(&self) -> SamplerDiagnostics {
        let Some(state) = self.state.as_ref() else {
            return SamplerDiagnostics::default();
        };
        let sampling = ProposalStats {
            proposed: state.stats.proposed - self.warm_up_stats.proposed,
            accepted: state.stats.accepted - self.warm_up_stats.accepted,
        };
        SamplerDiagnostics {
            iterations_completed: self.history.len(),
            retained_draws: self.final_selection.as_ref().map_or(0, PosteriorSamples::len),
            acceptance_rate: state.stats.acceptance_rate(),
            sampling_acceptance_rate: sampling.acceptance_rate(),
            final_proposal_scale: state.proposal.scale(),
            initial_log_posterior: self
                .initial
                .as_ref()
                .map_or(f64::NAN, Sample::log_posterior),
        }
    }

    /// # Errors
    ///
    /// Returns `MhError::NotFinalized` before finalization.
    pub fn posterior_samples(&self) -> Result<&PosteriorSamples, MhError> {
        self.final_selection.as_ref().ok_or(MhError::NotFinalized)
    }

    /// Tab-separated table of retained draws.
    ///
    /// # Errors
    ///
    /// Returns `MhError::NotFinalized` before finalization.
    pub fn report(&self) -> Result<PosteriorSampleReport<'_>, MhError> {
        Ok(self.posterior_samples()?.report())
    }

    /// # Errors
    ///
    /// Returns `MhError::NotFinalized` before finalization.
    pub fn summary(&self) -> Result<PosteriorSummary, MhError> {
        Ok(summarize_posterior(self.posterior_samples()?))
    }

    /// # Errors
    ///
    /// Returns `MhError::NotFinalized` before finalization.
    pub fn chain_report(&self) -> Result<ChainReport, MhError> {
        let summary = self.summary()?;
        Ok(ChainReport {
            diagnostics: self.diagnostics(),
            posterior_summary: (summary.draw_count > 0).then_some(summary),
        })
    }

    /// # Errors
    ///
    /// Returns `MhError::NotFinalized` before finalization, or any model
    /// error raised while scoring the draws.
    pub fn log_pseudo_marginal_likelihood(&self) -> Result<LpmlReport, MhError> {
        log_pseudo_marginal_likelihood(self.evaluator.model(), self.posterior_samples()?)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use approx::assert_relative_eq;

    use super::*;
    use crate::inference::McmcConfig;
    use crate::models::mh::model::ModelError;
    use crate::models::mh::priors::{PriorDistribution, PriorRegistry, log_normal_density};
    use crate::models::mh::sampling::StartingDistribution;
    use crate::models::mh::types::ProposalTuning;
    use crate::utils::mean;

    /// Standard normal target on one parameter, bounded to `[-20, 20]`.
    struct StandardNormal;

    impl MhModel for StandardNormal {
        fn number_of_observations(&self) -> usize {
            1
        }

        fn number_of_subjects(&self) -> usize {
            1
        }

        fn likelihood_of_subject(&self, parameters: &[f64], _: usize) -> Result<f64, ModelError> {
            Ok(log_normal_density(parameters[0], 0.0, 1.0).exp())
        }

        fn effect_list(&self) -> Vec<String> {
            vec!["z".to_owned()]
        }

        fn other_parameter_names(&self) -> Vec<String> {
            Vec::new()
        }

        fn starting_parameter_estimates(
            &self,
            _coefficient_of_variation: f64,
        ) -> Result<StartingDistribution, MhError> {
            StartingDistribution::diagonal(vec![0.5], &[1.0])
        }

        fn set_prior_distributions(&self, registry: &mut PriorRegistry) -> Result<(), MhError> {
            registry.add_fixed_effect_distribution(
                PriorDistribution::Uniform {
                    lower: -20.0,
                    upper: 20.0,
                },
                0,
            )
        }

        fn is_intercept_model(&self) -> bool {
            true
        }
    }

    fn config(iterations: usize, burn_in: usize, warm_up: usize, thin: usize) -> SamplerConfig {
        SamplerConfig {
            mcmc: McmcConfig {
                iterations,
                burn_in,
                thin,
                warm_up,
                initial_grid_size: 0,
                seed: 7,
            },
            ..SamplerConfig::default()
        }
    }

    #[test]
    fn non_negative_log_ratio_accepts_without_drawing() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(should_accept(0.0, &mut rng));
        assert!(should_accept(2.5, &mut rng));
        let mut fresh = StdRng::seed_from_u64(3);
        assert_eq!(rng.random::<u64>(), fresh.random::<u64>());
    }

    #[test]
    fn very_negative_log_ratio_rejects() {
        let mut rng = StdRng::seed_from_u64(3);
        let accepted = (0..1_000)
            .filter(|_| should_accept(-50.0, &mut rng))
            .count();
        assert_eq!(accepted, 0);
    }

    #[test]
    fn iterate_rejects_out_of_support_proposals() {
        let model = StandardNormal;
        let evaluator = PosteriorEvaluator::from_model(&model).expect("priors cover model");
        let start = evaluator.evaluate(vec![0.0]).expect("evaluates");
        let wide = faer::Mat::from_fn(1, 1, |_, _| 1.0e6);
        let mut state = ChainState::new(
            start.clone(),
            AdaptiveProposal::new(wide, ProposalTuning::default()),
        );
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            assert!(!iterate(&evaluator, &mut state, &mut rng).expect("evaluates"));
        }
        assert_eq!(state.current(), &start);
        assert_eq!(state.stats().proposed, 20);
        assert_eq!(state.stats().accepted, 0);
    }

    #[test]
    fn phases_advance_through_the_run() {
        let model = StandardNormal;
        let mut driver = ChainDriver::new(&model, config(50, 20, 10, 1)).expect("valid driver");
        assert_eq!(driver.phase(), ChainPhase::Initializing);
        driver.initialize().expect("feasible start");
        assert_eq!(driver.phase(), ChainPhase::WarmingUp);
        for _ in 0..10 {
            driver.step().expect("step");
        }
        assert_eq!(driver.phase(), ChainPhase::Sampling);
        driver.run().expect("run");
        assert_eq!(driver.history().len(), 50);
        assert!(driver.step().expect("complete").is_none());
        driver.release_final_sample_selection().expect("complete run");
        assert_eq!(driver.phase(), ChainPhase::Finalized);
    }

    #[test]
    fn zero_warm_up_starts_sampling_with_frozen_proposal() {
        let model = StandardNormal;
        let mut driver = ChainDriver::new(&model, config(20, 5, 0, 1)).expect("valid driver");
        driver.initialize().expect("feasible start");
        assert_eq!(driver.phase(), ChainPhase::Sampling);
        driver.run().expect("run");
        assert_relative_eq!(driver.diagnostics().final_proposal_scale, 2.38);
    }

    #[test]
    fn finalization_requires_complete_run() {
        let model = StandardNormal;
        let mut driver = ChainDriver::new(&model, config(30, 10, 10, 1)).expect("valid driver");
        driver.step().expect("step");
        assert!(matches!(
            driver.release_final_sample_selection(),
            Err(MhError::ChainIncomplete {
                completed: 1,
                required: 30
            })
        ));
        assert!(matches!(
            driver.posterior_samples(),
            Err(MhError::NotFinalized)
        ));
        assert!(matches!(driver.report(), Err(MhError::NotFinalized)));
        assert!(matches!(
            driver.log_pseudo_marginal_likelihood(),
            Err(MhError::NotFinalized)
        ));
    }

    #[test]
    fn retained_selection_skips_burn_in_and_thins() {
        let model = StandardNormal;
        let config = config(101, 20, 20, 4);
        let mut driver = ChainDriver::new(&model, config).expect("valid driver");
        driver.run().expect("run");
        let expected = driver.history()[20..]
            .iter()
            .step_by(4)
            .cloned()
            .collect::<Vec<_>>();
        let released = driver
            .release_final_sample_selection()
            .expect("complete run");
        assert_eq!(released.len(), config.mcmc.retained_draws());
        assert_eq!(released.draws(), expected.as_slice());
    }

    #[test]
    fn finalized_chain_is_read_only_and_stable() {
        let model = StandardNormal;
        let mut driver = ChainDriver::new(&model, config(60, 20, 20, 2)).expect("valid driver");
        driver.run().expect("run");
        let first = driver
            .release_final_sample_selection()
            .expect("complete run")
            .report()
            .to_string();
        let second = driver
            .release_final_sample_selection()
            .expect("cached selection")
            .report()
            .to_string();
        assert_eq!(first, second);
        assert!(matches!(driver.step(), Err(MhError::AlreadyFinalized)));
        assert!(matches!(driver.run(), Err(MhError::AlreadyFinalized)));
        assert!(matches!(
            driver.initialize(),
            Err(MhError::AlreadyFinalized)
        ));
    }

    #[test]
    fn history_repeats_current_sample_on_rejection() {
        let model = StandardNormal;
        let mut driver = ChainDriver::new(&model, config(200, 50, 50, 1)).expect("valid driver");
        driver.run().expect("run");
        let initial = driver.initial_sample().expect("initialized").clone();
        let mut previous = &initial;
        let mut accepted = 0;
        for sample in driver.history() {
            if sample != previous {
                accepted += 1;
            }
            previous = sample;
        }
        let stats_accepted = driver.diagnostics().acceptance_rate * 200.0;
        assert_relative_eq!(f64::from(accepted), stats_accepted, epsilon = 1.0e-9);
    }

    #[test]
    fn chain_recovers_standard_normal_moments() {
        let model = StandardNormal;
        let mut driver =
            ChainDriver::new(&model, config(21_000, 1_000, 1_000, 1)).expect("valid driver");
        driver.run().expect("run");
        driver.release_final_sample_selection().expect("complete run");
        let draws = driver.posterior_samples().expect("finalized").column(0);
        assert!(mean(&draws).abs() < 0.1);
        let summary = driver.summary().expect("finalized");
        assert!((summary.parameters[0].variance - 1.0).abs() < 0.15);
        let diagnostics = driver.diagnostics();
        assert!(diagnostics.sampling_acceptance_rate > 0.15);
        assert!(diagnostics.sampling_acceptance_rate < 0.75);
    }

    #[test]
    fn model_info_reflects_model() {
        let model = StandardNormal;
        let driver = ChainDriver::new(&model, SamplerConfig::default()).expect("valid driver");
        let info = driver.model_info();
        assert_eq!(info.dimension, 1);
        assert_eq!(info.parameter_names, vec!["z".to_owned()]);
        assert!(info.intercept_model);
    }

    #[test]
    fn invalid_config_is_rejected_before_sampling() {
        let model = StandardNormal;
        assert!(matches!(
            ChainDriver::new(&model, config(10, 10, 0, 1)),
            Err(MhError::InvalidConfiguration(_))
        ));
    }

    /// Flat prior; likelihood is one on `|x| < 1` and exactly zero outside.
    /// Optionally fails once more than `fail_after` evaluations were made.
    struct UnitInterval {
        calls: Cell<usize>,
        fail_after: Option<usize>,
    }

    impl UnitInterval {
        const fn new(fail_after: Option<usize>) -> Self {
            Self {
                calls: Cell::new(0),
                fail_after,
            }
        }
    }

    impl MhModel for UnitInterval {
        fn number_of_observations(&self) -> usize {
            1
        }

        fn number_of_subjects(&self) -> usize {
            1
        }

        fn likelihood_of_subject(&self, parameters: &[f64], _: usize) -> Result<f64, ModelError> {
            let calls = self.calls.get() + 1;
            self.calls.set(calls);
            if self.fail_after.is_some_and(|limit| calls > limit) {
                return Err(ModelError::Evaluation("solver diverged".to_owned()));
            }
            Ok(if parameters[0].abs() < 1.0 { 1.0 } else { 0.0 })
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
            StartingDistribution::diagonal(vec![0.0], &[1.0])
        }

        fn set_prior_distributions(&self, registry: &mut PriorRegistry) -> Result<(), MhError> {
            registry.add_fixed_effect_distribution(PriorDistribution::Flat, 0)
        }

        fn is_intercept_model(&self) -> bool {
            true
        }
    }

    #[test]
    fn zero_likelihood_proposals_are_never_stored() {
        let model = UnitInterval::new(None);
        let mut driver = ChainDriver::new(&model, config(2_000, 500, 500, 1)).expect("valid driver");
        driver.run().expect("run");
        assert_eq!(driver.history().len(), 2_000);
        assert!(driver.history().iter().all(Sample::is_feasible));
        assert!(
            driver
                .history()
                .iter()
                .all(|sample| sample.parameters()[0].abs() < 1.0)
        );
        assert!(driver.diagnostics().acceptance_rate < 1.0);
    }

    #[test]
    fn model_error_stops_the_chain_for_good() {
        let model = UnitInterval::new(Some(50));
        let mut driver = ChainDriver::new(&model, config(200, 50, 50, 1)).expect("valid driver");

        // One evaluation picks the start, then one per iteration.
        assert!(matches!(
            driver.run(),
            Err(MhError::Model(ModelError::Evaluation(_)))
        ));
        assert_eq!(driver.history().len(), 49);
        assert_eq!(driver.phase(), ChainPhase::Failed);
        assert_eq!(model.calls.get(), 51);

        assert!(matches!(
            driver.run(),
            Err(MhError::Model(ModelError::Evaluation(_)))
        ));
        assert!(matches!(
            driver.step(),
            Err(MhError::Model(ModelError::Evaluation(_)))
        ));
        assert!(matches!(
            driver.initialize(),
            Err(MhError::Model(ModelError::Evaluation(_)))
        ));
        assert_eq!(model.calls.get(), 51);
        assert_eq!(driver.history().len(), 49);
        assert!(matches!(
            driver.release_final_sample_selection(),
            Err(MhError::ChainIncomplete {
                completed: 49,
                required: 200
            })
        ));
    }

    #[test]
    fn model_error_while_choosing_start_fails_the_chain() {
        let model = UnitInterval::new(Some(0));
        let mut driver = ChainDriver::new(&model, config(20, 5, 5, 1)).expect("valid driver");
        assert!(matches!(driver.initialize(), Err(MhError::Model(_))));
        assert_eq!(driver.phase(), ChainPhase::Failed);
        assert!(matches!(driver.step(), Err(MhError::Model(_))));
        assert_eq!(model.calls.get(), 1);
    }
}
