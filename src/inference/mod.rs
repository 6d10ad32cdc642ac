//! Reusable inference and MCMC schedule types.

use thiserror::Error;

/// Errors for the simulation schedule.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InferenceError {
    #[error("iterations must be positive")]
    InvalidIterations,
    #[error("burn-in ({burn_in}) must be smaller than iterations ({iterations})")]
    InvalidBurnIn { burn_in: usize, iterations: usize },
    #[error("thinning interval must be positive")]
    InvalidThinning,
    #[error("warm-up ({warm_up}) must not exceed burn-in ({burn_in})")]
    WarmUpExceedsBurnIn { warm_up: usize, burn_in: usize },
}

/// Simulation schedule for one Metropolis-Hastings chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct McmcConfig {
    /// Total iterations, burn-in included.
    pub iterations: usize,
    /// Leading iterations excluded from the final sample selection.
    pub burn_in: usize,
    /// Keep every `thin`-th draw after burn-in.
    pub thin: usize,
    /// Iterations during which the proposal scale is retuned.
    ///
    /// Must not exceed `burn_in`, so no draw produced by an adapting kernel
    /// is ever retained.
    pub warm_up: usize,
    /// Candidates drawn from the starting distribution before the chain
    /// starts. `0` starts deterministically at the distribution mean.
    pub initial_grid_size: usize,
    /// RNG seed for reproducibility.
    pub seed: u64,
}

impl Default for McmcConfig {
    fn default() -> Self {
        Self {
            iterations: 4_000,
            burn_in: 1_000,
            thin: 1,
            warm_up: 1_000,
            initial_grid_size: 0,
            seed: 42,
        }
    }
}

impl McmcConfig {
    /// # Errors
    ///
    /// Returns `InferenceError` if schedule values are invalid.
    pub const fn validate(self) -> Result<(), InferenceError> {
        if self.iterations == 0 {
            return Err(InferenceError::InvalidIterations);
        }
        if self.burn_in >= self.iterations {
            return Err(InferenceError::InvalidBurnIn {
                burn_in: self.burn_in,
                iterations: self.iterations,
            });
        }
        if self.thin == 0 {
            return Err(InferenceError::InvalidThinning);
        }
        if self.warm_up > self.burn_in {
            return Err(InferenceError::WarmUpExceedsBurnIn {
                warm_up: self.warm_up,
                burn_in: self.burn_in,
            });
        }
        Ok(())
    }

    /// Number of retained draws implied by this configuration.
    ///
    /// Retention keeps iterations `burn_in, burn_in + thin, ...`, so a partial
    /// final stride still contributes one draw.
    #[must_use]
    pub const fn retained_draws(self) -> usize {
        (self.iterations - self.burn_in).div_ceil(self.thin)
    }
}

/// Proposal counters for a Metropolis-Hastings kernel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProposalStats {
    pub proposed: usize,
    pub accepted: usize,
}

impl ProposalStats {
    /// Record one proposal and whether it was accepted.
    pub const fn record(&mut self, accepted: bool) {
        self.proposed += 1;
        if accepted {
            self.accepted += 1;
        }
    }

    /// Acceptance rate in `[0, 1]`, or `0` if no proposals were made.
    #[must_use]
    pub fn acceptance_rate(self) -> f64 {
        if self.proposed == 0 {
            0.0
        } else {
            usize_to_f64(self.accepted) / usize_to_f64(self.proposed)
        }
    }
}

fn usize_to_f64(value: usize) -> f64 {
    f64::from(u32::try_from(value).unwrap_or(u32::MAX))
}
