//! Adaptive random-walk Metropolis-Hastings engine for (hierarchical) models.
//!
//! Models implement [`MhModel`]: a per-subject likelihood, a starting
//! distribution, and one prior per parameter registered in a
//! [`PriorRegistry`]. The engine chooses a starting point by grid search,
//! warms up an adaptive multivariate normal proposal, and releases a burned-in,
//! thinned posterior selection that feeds summaries, split-R-hat diagnostics,
//! and LPML-based model comparison.

pub mod chain;
pub mod comparison;
pub mod diagnostics;
pub mod evaluator;
pub mod grid;
pub mod model;
pub mod posterior;
pub mod priors;
pub mod proposal;
pub mod sampler;
pub mod sampling;
pub mod types;

pub use chain::{ChainDriver, ChainState, iterate, should_accept};
pub use comparison::{
    LpmlReport, ModelRanking, log_pseudo_bayes_factor, log_pseudo_marginal_likelihood,
    pseudo_bayes_factor, rank_models, render_comparison_table,
};
pub use diagnostics::{
    autocorrelation, effective_sample_size, split_rhat, summarize_multi_chain_convergence,
};
pub use evaluator::PosteriorEvaluator;
pub use model::{MhModel, ModelError};
pub use posterior::{
    ParameterSummary, PosteriorSampleReport, PosteriorSamples, PosteriorSummary, Sample,
    render_summary_table, summarize_posterior,
};
pub use priors::{PriorDistribution, PriorEntry, PriorRegistry, RandomEffectDistribution};
pub use proposal::AdaptiveProposal;
pub use sampler::{
    fit_mh, fit_mh_multi_chain, fit_mh_multi_chain_with_posterior, fit_mh_with_posterior,
};
pub use sampling::StartingDistribution;
pub use types::{
    ChainPhase, ChainReport, ConvergenceSummary, MhError, ModelInfo, MultiChainOptions,
    MultiChainReport, ProposalTuning, SamplerConfig, SamplerDiagnostics,
};
