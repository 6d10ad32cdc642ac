use hierarchical_mh::{
    ChainDriver, McmcConfig, NormalModel, SamplerConfig, render_summary_table,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let outcome = NormalModel::simulate(3.0, 4.0, 200, 7);
    let model = NormalModel::new(outcome)?;
    let config = SamplerConfig {
        mcmc: McmcConfig {
            iterations: 12_000,
            burn_in: 2_000,
            warm_up: 2_000,
            thin: 2,
            initial_grid_size: 200,
            seed: 7,
        },
        ..SamplerConfig::default()
    };

    let mut driver = ChainDriver::new(&model, config)?;
    driver.run()?;
    driver.release_final_sample_selection()?;

    let diagnostics = driver.diagnostics();
    println!(
        "acceptance {:.3} (sampling {:.3}), proposal scale {:.4}",
        diagnostics.acceptance_rate,
        diagnostics.sampling_acceptance_rate,
        diagnostics.final_proposal_scale
    );
    println!("{}", render_summary_table(&driver.summary()?));
    println!("LPML {:.3}", driver.log_pseudo_marginal_likelihood()?.lpml);
    Ok(())
}
