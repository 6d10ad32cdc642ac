//! Autocorrelation, effective sample size, and multi-chain split-R-hat.

use super::posterior::PosteriorSamples;
use super::types::{ConvergenceSummary, MhError};
use crate::utils::{sample_variance, usize_to_f64};

/// Lag-`k` autocorrelation for a scalar chain.
#[must_use]
pub fn autocorrelation(series: &[f64], lag: usize) -> f64 {
    if series.is_empty() || lag >= series.len() {
        return 0.0;
    }

    let n = series.len() - lag;
    let mean = series.iter().sum::<f64>() / usize_to_f64(series.len());

    let denominator = series
        .iter()
        .map(|value| {
            let centered = value - mean;
            centered * centered
        })
        .sum::<f64>();
    if denominator <= 0.0 {
        return 0.0;
    }

    let numerator = (0..n)
        .map(|idx| (series[idx] - mean) * (series[idx + lag] - mean))
        .sum::<f64>();

    numerator / denominator
}

/// Heuristic effective sample size using positive autocorrelation truncation.
#[must_use]
pub fn effective_sample_size(series: &[f64]) -> f64 {
    let n = series.len();
    if n < 2 {
        return usize_to_f64(n);
    }

    let mut rho_sum = 0.0;
    for lag in 1..n {
        let rho = autocorrelation(series, lag);
        if rho <= 0.0 {
            break;
        }
        rho_sum += rho;
    }

    usize_to_f64(n) / (2.0f64.mul_add(rho_sum, 1.0)).max(1.0)
}

/// Summarize split-R-hat convergence diagnostics across posterior chains.
///
/// Chains are truncated to the same even draw count; every parameter gets one
/// split-R-hat value.
///
/// # Errors
///
/// Returns `MhError` if chain counts/draw lengths are insufficient or
/// parameter dimensions disagree.
pub fn summarize_multi_chain_convergence(
    chains: &[PosteriorSamples],
) -> Result<ConvergenceSummary, MhError> {
    if chains.len() < 2 {
        return Err(MhError::InvalidChainCount {
            min: 2,
            found: chains.len(),
        });
    }

    let min_draws = chains
        .iter()
        .map(PosteriorSamples::len)
        .min()
        .unwrap_or(0);
    let draws_per_chain_used = min_draws - (min_draws % 2);
    if draws_per_chain_used < 4 {
        return Err(MhError::InsufficientChainDraws {
            minimum: 4,
            found: draws_per_chain_used,
        });
    }

    let parameter_names = chains
        .first()
        .map(|chain| chain.parameter_names().to_vec())
        .unwrap_or_default();
    for chain in chains {
        if chain.parameter_names() != parameter_names.as_slice()
            || chain
                .draws()
                .iter()
                .any(|draw| draw.parameters().len() != parameter_names.len())
        {
            return Err(MhError::InconsistentPosteriorDimensions);
        }
    }

    let split_rhat = (0..parameter_names.len())
        .map(|index| split_rhat_from_chains(chains, draws_per_chain_used, index))
        .collect::<Result<Vec<_>, _>>()?;
    let max_split_rhat = split_rhat.iter().copied().max_by(f64::total_cmp);

    Ok(ConvergenceSummary {
        chain_count: chains.len(),
        draws_per_chain_used,
        parameter_names,
        split_rhat,
        max_split_rhat,
    })
}

fn split_rhat_from_chains(
    chains: &[PosteriorSamples],
    draws_per_chain_used: usize,
    index: usize,
) -> Result<f64, MhError> {
    if chains.len() < 2 || draws_per_chain_used < 4 || !draws_per_chain_used.is_multiple_of(2) {
        return Err(MhError::InsufficientChainDraws {
            minimum: 4,
            found: draws_per_chain_used,
        });
    }

    let half = draws_per_chain_used / 2;
    let mut split_chains = Vec::with_capacity(chains.len() * 2);

    for chain in chains {
        let values = chain.column(index);
        split_chains.push(values[..half].to_vec());
        split_chains.push(values[half..draws_per_chain_used].to_vec());
    }

    split_rhat(&split_chains)
}

/// Gelman-Rubin potential scale reduction over equal-length chains.
///
/// Returns `1.0` when the within-chain variance is degenerate.
///
/// # Errors
///
/// Returns `MhError` for fewer than two chains, fewer than two draws, or
/// unequal chain lengths.
pub fn split_rhat(chains: &[Vec<f64>]) -> Result<f64, MhError> {
    if chains.len() < 2 {
        return Err(MhError::InvalidChainCount {
            min: 2,
            found: chains.len(),
        });
    }

    let n = chains.first().map_or(0, Vec::len);
    if n < 2 {
        return Err(MhError::InsufficientChainDraws {
            minimum: 2,
            found: n,
        });
    }
    if chains.iter().any(|chain| chain.len() != n) {
        return Err(MhError::InconsistentPosteriorDimensions);
    }

    let chain_means = chains
        .iter()
        .map(|chain| chain.iter().sum::<f64>() / usize_to_f64(n))
        .collect::<Vec<_>>();
    let chain_vars = chains
        .iter()
        .map(|chain| sample_variance(chain))
        .collect::<Vec<_>>();

    let m = chains.len();
    let mean_of_means = chain_means.iter().sum::<f64>() / usize_to_f64(m);
    let between = usize_to_f64(n)
        * chain_means
            .iter()
            .map(|mean| {
                let centered = *mean - mean_of_means;
                centered * centered
            })
            .sum::<f64>()
        / usize_to_f64(m - 1);
    let within = chain_vars.iter().sum::<f64>() / usize_to_f64(m);

    if !(within.is_finite() && within > 0.0 && between.is_finite()) {
        return Ok(1.0);
    }

    let n_f64 = usize_to_f64(n);
    let var_plus = ((n_f64 - 1.0) / n_f64).mul_add(within, between / n_f64);
    if !var_plus.is_finite() || var_plus <= 0.0 {
        return Ok(1.0);
    }

    Ok((var_plus / within).sqrt().max(1.0))
}
