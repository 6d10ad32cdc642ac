use hierarchical_mh::{
    ChainDriver, ChainPhase, McmcConfig, MhError, MhModel, NormalModel, PosteriorEvaluator,
    SamplerConfig, fit_mh_with_posterior, summarize_posterior,
};

/// 100 draws rescaled to sample mean 3 and sample variance 16 exactly.
fn standardized_sample() -> Vec<f64> {
    let raw = NormalModel::simulate(0.0, 1.0, 100, 2024);
    let n = f64::from(u32::try_from(raw.len()).unwrap_or(u32::MAX));
    let mean = raw.iter().sum::<f64>() / n;
    let sd = (raw.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt();
    raw.iter().map(|x| 4.0f64.mul_add((x - mean) / sd, 3.0)).collect()
}

fn config(grid: usize, seed: u64) -> SamplerConfig {
    SamplerConfig {
        mcmc: McmcConfig {
            iterations: 12_000,
            burn_in: 2_000,
            thin: 1,
            warm_up: 2_000,
            initial_grid_size: grid,
            seed,
        },
        coefficient_of_variation: 0.1,
        ..SamplerConfig::default()
    }
}

#[test]
fn normal_model_recovers_mean_and_variance() {
    let model = NormalModel::new(standardized_sample()).expect("valid outcome");
    let (_info, report, posterior) =
        fit_mh_with_posterior(&model, config(100, 7)).expect("fit should succeed");

    assert_eq!(posterior.len(), 10_000);
    let rate = report.diagnostics.sampling_acceptance_rate;
    assert!(rate > 0.1 && rate < 0.7, "acceptance {rate}");

    let summary = summarize_posterior(&posterior);
    let mean = summary.get("mean").expect("mean summarized");
    let variance = summary.get("variance").expect("variance summarized");
    // Posterior means within 0.5 of the sample moments; the variance sits
    // slightly above 16 (InverseGamma(49.5, 792) has mean 16.33).
    assert!((mean.mean - 3.0).abs() < 0.2, "mean {}", mean.mean);
    assert!((variance.mean - 16.0).abs() < 0.5, "variance {}", variance.mean);
    assert!(mean.q025 < 3.0 && mean.q975 > 3.0);
}

#[test]
fn finalization_is_cached_and_locks_the_chain() {
    let model = NormalModel::new(standardized_sample()).expect("valid outcome");
    let mut driver = ChainDriver::new(&model, config(10, 3)).expect("valid config");

    assert!(matches!(
        driver.release_final_sample_selection(),
        Err(MhError::ChainIncomplete { .. })
    ));
    driver.run().expect("run should succeed");
    assert_eq!(driver.history().len(), 12_000);

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
    assert_eq!(first.lines().count(), 10_001);
    assert!(first.starts_with("log_likelihood\tmean\tvariance"));

    assert_eq!(driver.phase(), ChainPhase::Finalized);
    assert!(matches!(driver.step(), Err(MhError::AlreadyFinalized)));
    assert!(matches!(driver.initialize(), Err(MhError::AlreadyFinalized)));
}

#[test]
fn grid_start_is_reproducible_for_a_seed() {
    let model = NormalModel::new(standardized_sample()).expect("valid outcome");
    let start = |seed| {
        let mut driver = ChainDriver::new(&model, config(500, seed)).expect("valid config");
        driver.initialize().expect("grid search");
        driver.initial_sample().expect("initialized").clone()
    };
    assert_eq!(start(11), start(11));
}

#[test]
fn grid_size_does_not_change_the_posterior() {
    let model = NormalModel::new(standardized_sample()).expect("valid outcome");
    let (_, _, without_grid) = fit_mh_with_posterior(&model, config(0, 5)).expect("fit");
    let (_, _, with_grid) = fit_mh_with_posterior(&model, config(1_000, 5)).expect("fit");

    let a = summarize_posterior(&without_grid);
    let b = summarize_posterior(&with_grid);
    for (left, right) in a.parameters.iter().zip(&b.parameters) {
        assert!(
            (left.mean - right.mean).abs() < 0.5 * left.std_dev,
            "{}: {} vs {}",
            left.name,
            left.mean,
            right.mean
        );
    }
}

#[test]
fn log_posterior_is_prior_plus_likelihood() {
    let model = NormalModel::new(standardized_sample()).expect("valid outcome");
    let evaluator = PosteriorEvaluator::from_model(&model).expect("priors cover parameters");
    assert_eq!(evaluator.dimension(), model.parameter_names().len());

    for parameters in [[3.0, 16.0], [2.5, 10.0], [-1.0, 40.0]] {
        let sample = evaluator.evaluate(parameters.to_vec()).expect("evaluation");
        let prior = evaluator.log_prior(&parameters).expect("prior");
        assert!((sample.log_posterior() - (prior + sample.log_likelihood())).abs() < 1.0e-9);
    }

    let outside = evaluator.evaluate(vec![3.0, -1.0]).expect("evaluation");
    assert!(!outside.is_feasible());
    assert!(outside.log_posterior().is_infinite());
}
