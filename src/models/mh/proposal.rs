//! Random-walk multivariate normal proposal with warm-up scale adaptation.

use faer::Mat;
use rand::rngs::StdRng;

use super::types::ProposalTuning;
use crate::inference::ProposalStats;
use crate::utils::{lower_times_vector, sample_standard_normal, usize_to_f64};

/// Optimal random-walk scaling constant for Gaussian targets.
const OPTIMAL_SCALE_NUMERATOR: f64 = 2.38;

/// `current + scale * L z` with `L` the Cholesky factor of the starting
/// covariance and `z` standard normal.
#[derive(Debug, Clone)]
pub struct AdaptiveProposal {
    cholesky: Mat<f64>,
    scale: f64,
    tuning: ProposalTuning,
    batch: ProposalStats,
    frozen: bool,
}

impl AdaptiveProposal {
    /// Start at scale `2.38 / sqrt(d)`, clamped to the tuning bounds.
    #[must_use]
    pub fn new(cholesky: Mat<f64>, tuning: ProposalTuning) -> Self {
        let dimension = usize_to_f64(cholesky.nrows().max(1));
        let scale = (OPTIMAL_SCALE_NUMERATOR / dimension.sqrt())
            .clamp(tuning.min_scale, tuning.max_scale);
        Self {
            cholesky,
            scale,
            tuning,
            batch: ProposalStats::default(),
            frozen: false,
        }
    }

    #[must_use]
    pub const fn scale(&self) -> f64 {
        self.scale
    }

    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Candidate point around `current`.
    pub fn propose(&self, current: &[f64], rng: &mut StdRng) -> Vec<f64> {
        let noise = (0..current.len())
            .map(|_| sample_standard_normal(rng))
            .collect::<Vec<_>>();
        lower_times_vector(&self.cholesky, &noise)
            .into_iter()
            .zip(current)
            .map(|(step, value)| self.scale.mul_add(step, *value))
            .collect()
    }

    /// Count one proposal toward the current adaptation batch.
    pub const fn record(&mut self, accepted: bool) {
        if !self.frozen {
            self.batch.record(accepted);
        }
    }

    /// Rescale from the batch acceptance rate once a full batch is in.
    ///
    /// Returns the new scale when a retune happened. No-op once frozen.
    pub fn retune(&mut self) -> Option<f64> {
        if self.frozen || self.batch.proposed < self.tuning.adaptation_interval {
            return None;
        }
        let rate = self.batch.acceptance_rate();
        let factor = if rate > self.tuning.target_acceptance {
            self.tuning.scale_increase_factor
        } else if rate < self.tuning.target_acceptance {
            self.tuning.scale_decrease_factor
        } else {
            1.0
        };
        self.scale = (self.scale * factor).clamp(self.tuning.min_scale, self.tuning.max_scale);
        self.batch = ProposalStats::default();
        log::debug!(
            "retuned proposal scale to {:.5} (batch acceptance {rate:.3})",
            self.scale
        );
        Some(self.scale)
    }

    /// Stop adapting; the scale is fixed from here on.
    pub fn freeze(&mut self) {
        self.frozen = true;
        self.batch = ProposalStats::default();
    }
}
