use hierarchical_mh::{
    McmcConfig, MhModel, PoissonModel, RandomEffectsStructure, SamplerConfig,
    fit_mh_with_posterior, log_pseudo_marginal_likelihood, rank_models, render_comparison_table,
};

fn lpml<M: MhModel>(model: &M, config: SamplerConfig) -> Result<f64, Box<dyn std::error::Error>> {
    let (_, report, posterior) = fit_mh_with_posterior(model, config)?;
    println!(
        "{} parameters, sampling acceptance {:.3}",
        model.parameter_names().len(),
        report.diagnostics.sampling_acceptance_rate
    );
    Ok(log_pseudo_marginal_likelihood(model, &posterior)?.lpml)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let input = PoissonModel::simulate(1.0, 0.8, 40, 8, 11);
    let config = SamplerConfig {
        mcmc: McmcConfig {
            iterations: 20_000,
            burn_in: 5_000,
            warm_up: 5_000,
            thin: 5,
            initial_grid_size: 100,
            seed: 11,
        },
        ..SamplerConfig::default()
    };

    let pooled = PoissonModel::new(&input, RandomEffectsStructure::None)?;
    let hierarchical = PoissonModel::new(&input, RandomEffectsStructure::SubjectIntercepts)?;

    let rankings = rank_models(&[
        ("pooled rate".to_owned(), lpml(&pooled, config)?),
        ("subject intercepts".to_owned(), lpml(&hierarchical, config)?),
    ]);
    println!("{}", render_comparison_table(&rankings));
    Ok(())
}
