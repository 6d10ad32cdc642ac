//! Core public types for the MH engine.

use thiserror::Error;

use super::model::ModelError;
use super::posterior::PosteriorSummary;
use crate::inference::{InferenceError, McmcConfig};

/// Errors returned by MH configuration, prior registration, and estimation.
#[derive(Debug, Error, Clone)]
pub enum MhError {
    #[error(transparent)]
    InvalidConfiguration(#[from] InferenceError),
    #[error("invalid proposal tuning configuration")]
    InvalidProposalTuning,
    #[error("coefficient of variation must be positive and finite; found {0}")]
    InvalidCoefficientOfVariation(f64),
    #[error("model evaluation failed: {0}")]
    Model(#[from] ModelError),
    #[error("no prior registered for parameter {index}")]
    UnregisteredParameter { index: usize },
    #[error("parameter {index} already has a prior")]
    DuplicateParameter { index: usize },
    #[error("prior for parameter {index} has invalid hyperparameters")]
    InvalidPrior { index: usize },
    #[error("prior registered for parameter {index} outside a parameter vector of length {dimension}")]
    PriorOutOfRange { index: usize, dimension: usize },
    #[error("parameter vector length ({found}) does not match expected length ({expected})")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("invalid starting distribution: {0}")]
    InvalidStartingDistribution(&'static str),
    #[error("no feasible starting point among {candidates} candidates")]
    InfeasibleStart { candidates: usize },
    #[error("final sample selection has not been released")]
    NotFinalized,
    #[error("chain has completed {completed} of {required} iterations")]
    ChainIncomplete { completed: usize, required: usize },
    #[error("chain is finalized; no further iterations can run")]
    AlreadyFinalized,
    #[error("posterior draws are required")]
    EmptyPosterior,
    #[error("multi-chain workflows require at least {min} chains; found {found}")]
    InvalidChainCount { min: usize, found: usize },
    #[error("multi-chain seed stride must be positive")]
    InvalidSeedStride,
    #[error("each chain must retain at least {minimum} draws; minimum found {found}")]
    InsufficientChainDraws { minimum: usize, found: usize },
    #[error("posterior dimensions differ across chains")]
    InconsistentPosteriorDimensions,
    #[error("chain {0} panicked")]
    ChainPanicked(usize),
}

/// Lifecycle of a chain driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainPhase {
    /// Starting point not chosen yet.
    Initializing,
    /// Proposal scale is retuned in batches.
    WarmingUp,
    /// Proposal is frozen; iterations continue to the configured total.
    Sampling,
    /// Final sample selection released; the chain is read-only.
    Finalized,
    /// The model failed during evaluation; the chain is read-only.
    Failed,
}

/// Proposal-scale and adaptation controls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProposalTuning {
    /// Acceptance rate the warm-up retuning steers toward.
    pub target_acceptance: f64,
    /// Retune every `adaptation_interval` warm-up iterations.
    pub adaptation_interval: usize,
    /// Multiplicative scale increase when acceptance is above target.
    pub scale_increase_factor: f64,
    /// Multiplicative scale decrease when acceptance is below target.
    pub scale_decrease_factor: f64,
    /// Lower clamp for the proposal scale.
    pub min_scale: f64,
    /// Upper clamp for the proposal scale.
    pub max_scale: f64,
}

impl Default for ProposalTuning {
    fn default() -> Self {
        Self {
            target_acceptance: 0.234,
            adaptation_interval: 100,
            scale_increase_factor: 1.25,
            scale_decrease_factor: 0.8,
            min_scale: 1.0e-4,
            max_scale: 100.0,
        }
    }
}

impl ProposalTuning {
    /// Whether proposal tuning settings are numerically valid.
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.target_acceptance > 0.0
            && self.target_acceptance < 1.0
            && self.adaptation_interval > 0
            && self.scale_increase_factor >= 1.0
            && self.scale_decrease_factor > 0.0
            && self.scale_decrease_factor <= 1.0
            && self.min_scale > 0.0
            && self.min_scale <= self.max_scale
            && self.max_scale.is_finite()
    }
}

/// Full sampler configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerConfig {
    pub mcmc: McmcConfig,
    pub proposal_tuning: ProposalTuning,
    /// Passed to the model when it builds its starting distribution.
    pub coefficient_of_variation: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            mcmc: McmcConfig::default(),
            proposal_tuning: ProposalTuning::default(),
            coefficient_of_variation: 0.1,
        }
    }
}

impl SamplerConfig {
    /// # Errors
    ///
    /// Returns `MhError` if any configuration block is invalid.
    pub fn validate(self) -> Result<(), MhError> {
        self.mcmc.validate()?;
        if !self.proposal_tuning.is_valid() {
            return Err(MhError::InvalidProposalTuning);
        }
        if !(self.coefficient_of_variation > 0.0 && self.coefficient_of_variation.is_finite()) {
            return Err(MhError::InvalidCoefficientOfVariation(
                self.coefficient_of_variation,
            ));
        }
        Ok(())
    }
}

/// Configuration for running multiple independent chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiChainOptions {
    /// Number of independent chains to run.
    pub chains: usize,
    /// Seed increment between adjacent chains.
    ///
    /// Chain `i` uses `base_seed + i * seed_stride` with wrapping arithmetic.
    pub seed_stride: u64,
}

impl Default for MultiChainOptions {
    fn default() -> Self {
        Self {
            chains: 4,
            seed_stride: 10_000,
        }
    }
}

impl MultiChainOptions {
    /// # Errors
    ///
    /// Returns `MhError` if multi-chain options are invalid.
    pub const fn validate(self) -> Result<(), MhError> {
        if self.chains < 2 {
            return Err(MhError::InvalidChainCount {
                min: 2,
                found: self.chains,
            });
        }
        if self.seed_stride == 0 {
            return Err(MhError::InvalidSeedStride);
        }
        Ok(())
    }

    /// Seed used by chain `chain_index`.
    #[must_use]
    pub fn chain_seed(self, base_seed: u64, chain_index: usize) -> u64 {
        let index_u64 = u64::try_from(chain_index).unwrap_or(u64::MAX);
        base_seed.wrapping_add(index_u64.saturating_mul(self.seed_stride))
    }
}

/// Metadata about the model a chain was fitted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub n_observations: usize,
    pub n_subjects: usize,
    pub dimension: usize,
    pub parameter_names: Vec<String>,
    pub intercept_model: bool,
}

/// Sampler diagnostics summary.
#[derive(Debug, Clone, Default)]
pub struct SamplerDiagnostics {
    pub iterations_completed: usize,
    pub retained_draws: usize,
    /// Acceptance over all iterations.
    pub acceptance_rate: f64,
    /// Acceptance over the post-warm-up iterations only.
    pub sampling_acceptance_rate: f64,
    /// Proposal scale in force after warm-up.
    pub final_proposal_scale: f64,
    /// Log-posterior of the chosen starting point.
    pub initial_log_posterior: f64,
}

/// Output report from a single chain.
#[derive(Debug, Clone, Default)]
pub struct ChainReport {
    pub diagnostics: SamplerDiagnostics,
    pub posterior_summary: Option<PosteriorSummary>,
}

/// Multi-chain split-R-hat diagnostics summary.
#[derive(Debug, Clone, Default)]
pub struct ConvergenceSummary {
    /// Number of chains included.
    pub chain_count: usize,
    /// Draws per chain used after truncation to equal even length.
    pub draws_per_chain_used: usize,
    /// Parameter names in vector order.
    pub parameter_names: Vec<String>,
    /// Split-R-hat for each parameter.
    pub split_rhat: Vec<f64>,
    /// Maximum split-R-hat across all parameters.
    pub max_split_rhat: Option<f64>,
}

/// Output report for multi-chain fitting.
#[derive(Debug, Clone, Default)]
pub struct MultiChainReport {
    /// Chain-specific reports in execution order.
    pub chain_reports: Vec<ChainReport>,
    /// Posterior summary from pooled draws across all chains.
    pub pooled_posterior_summary: Option<PosteriorSummary>,
    /// Convergence diagnostics from split-R-hat summaries.
    pub convergence: ConvergenceSummary,
}
