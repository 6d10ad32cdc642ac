//! Sampler entrypoints: one chain, or several independent chains in parallel.

use super::chain::ChainDriver;
use super::diagnostics::summarize_multi_chain_convergence;
use super::model::MhModel;
use super::posterior::{PosteriorSamples, summarize_posterior};
use super::types::{
    ChainReport, MhError, ModelInfo, MultiChainOptions, MultiChainReport, SamplerConfig,
};

/// Run one chain to completion and summarize it.
///
/// # Errors
///
/// Returns `MhError` if the configuration, priors, or any evaluation fail.
pub fn fit_mh<M: MhModel + ?Sized>(
    model: &M,
    config: SamplerConfig,
) -> Result<(ModelInfo, ChainReport), MhError> {
    let (info, report, _) = fit_mh_with_posterior(model, config)?;
    Ok((info, report))
}

/// Run one chain and also return its retained draws.
///
/// # Errors
///
/// Returns `MhError` if the configuration, priors, or any evaluation fail.
pub fn fit_mh_with_posterior<M: MhModel + ?Sized>(
    model: &M,
    config: SamplerConfig,
) -> Result<(ModelInfo, ChainReport, PosteriorSamples), MhError> {
    let mut driver = ChainDriver::new(model, config)?;
    driver.run()?;
    let posterior = driver.release_final_sample_selection()?.clone();
    let report = driver.chain_report()?;
    Ok((driver.model_info(), report, posterior))
}

/// Run independent chains in parallel and return pooled summaries.
///
/// # Errors
///
/// Returns `MhError` if options are invalid or any chain fails.
pub fn fit_mh_multi_chain<M: MhModel + Sync + ?Sized>(
    model: &M,
    config: SamplerConfig,
    multi_chain: MultiChainOptions,
) -> Result<(ModelInfo, MultiChainReport), MhError> {
    let (info, report, _) = fit_mh_multi_chain_with_posterior(model, config, multi_chain)?;
    Ok((info, report))
}

/// Run independent chains in parallel and return chain-wise draws.
///
/// Chain `i` is seeded with `config.mcmc.seed + i * seed_stride`; each chain
/// owns its driver and RNG and shares only the read-only model.
///
/// # Errors
///
/// Returns `MhError` if options are invalid, any chain fails or panics, or the
/// chains are too short for split-R-hat.
pub fn fit_mh_multi_chain_with_posterior<M: MhModel + Sync + ?Sized>(
    model: &M,
    config: SamplerConfig,
    multi_chain: MultiChainOptions,
) -> Result<(ModelInfo, MultiChainReport, Vec<PosteriorSamples>), MhError> {
    config.validate()?;
    multi_chain.validate()?;
    let info = ChainDriver::new(model, config)?.model_info();

    let chain_results = std::thread::scope(|scope| {
        let handles = (0..multi_chain.chains)
            .map(|chain_index| {
                let mut chain_config = config;
                chain_config.mcmc.seed = multi_chain.chain_seed(config.mcmc.seed, chain_index);
                scope.spawn(move || {
                    log::info!("chain {chain_index} seeded with {}", chain_config.mcmc.seed);
                    fit_mh_with_posterior(model, chain_config)
                })
            })
            .collect::<Vec<_>>();

        handles
            .into_iter()
            .enumerate()
            .map(|(chain_index, handle)| {
                handle
                    .join()
                    .map_err(|_| MhError::ChainPanicked(chain_index))
                    .and_then(std::convert::identity)
            })
            .collect::<Result<Vec<_>, MhError>>()
    })?;

    let mut chain_reports = Vec::with_capacity(multi_chain.chains);
    let mut chain_posteriors = Vec::with_capacity(multi_chain.chains);
    for (_, report, posterior) in chain_results {
        chain_reports.push(report);
        chain_posteriors.push(posterior);
    }

    let pooled = combine_posteriors(&chain_posteriors);
    let pooled_posterior_summary = (!pooled.is_empty()).then(|| summarize_posterior(&pooled));
    let convergence = summarize_multi_chain_convergence(&chain_posteriors)?;
    if let Some(max_split_rhat) = convergence.max_split_rhat {
        log::info!(
            "{} chains finished; max split-R-hat {max_split_rhat:.4}",
            convergence.chain_count
        );
    }

    Ok((
        info,
        MultiChainReport {
            chain_reports,
            pooled_posterior_summary,
            convergence,
        },
        chain_posteriors,
    ))
}

fn combine_posteriors(chains: &[PosteriorSamples]) -> PosteriorSamples {
    let total_draws = chains.iter().map(PosteriorSamples::len).sum();
    let mut draws = Vec::with_capacity(total_draws);
    for chain in chains {
        draws.extend(chain.draws().iter().cloned());
    }
    let names = chains
        .first()
        .map(|chain| chain.parameter_names().to_vec())
        .unwrap_or_default();
    PosteriorSamples::new(names, draws)
}
