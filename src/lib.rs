#![forbid(unsafe_code)]

//! # `hierarchical_mh`
//!
//! Bayesian estimation of (hierarchical) statistical models by adaptive
//! random-walk Metropolis-Hastings.
//!
//! A model supplies per-subject likelihoods, starting estimates, and one prior
//! per parameter. The engine picks a start by grid search, adapts its proposal
//! during warm-up, and releases a burned-in, thinned posterior selection for
//! summaries, convergence checks, and LPML model comparison.

pub mod inference;
pub mod input;
pub mod models;
pub mod quadrature;
pub mod utils;

pub use inference::{InferenceError, McmcConfig, ProposalStats};
pub use input::{InputError, SubjectInput, SubjectRows};
pub use quadrature::{GaussHermiteRule, gauss_hermite};

pub use models::mh::{
    AdaptiveProposal, ChainDriver, ChainPhase, ChainReport, ChainState, ConvergenceSummary,
    LpmlReport, MhError, MhModel, ModelError, ModelInfo, ModelRanking, MultiChainOptions,
    MultiChainReport, ParameterSummary, PosteriorEvaluator, PosteriorSampleReport,
    PosteriorSamples, PosteriorSummary, PriorDistribution, PriorEntry, PriorRegistry,
    ProposalTuning, RandomEffectDistribution, Sample, SamplerConfig, SamplerDiagnostics,
    StartingDistribution, autocorrelation, effective_sample_size, fit_mh, fit_mh_multi_chain,
    fit_mh_multi_chain_with_posterior, fit_mh_with_posterior, log_pseudo_bayes_factor,
    log_pseudo_marginal_likelihood, pseudo_bayes_factor, rank_models, render_comparison_table,
    render_summary_table, split_rhat, summarize_multi_chain_convergence, summarize_posterior,
};
pub use models::normal::{NormalModel, NormalPriors};
pub use models::poisson::{PoissonModel, PoissonPriors, RandomEffectsStructure};
