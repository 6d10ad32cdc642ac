//! Prior specifications, log-density helpers, and the per-index prior registry.

use std::collections::BTreeMap;

use rand::RngExt;
use rand::rngs::StdRng;
use statrs::function::gamma::ln_gamma;

use super::types::MhError;
use crate::utils::sample_standard_normal;

/// Prior on a single scalar parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriorDistribution {
    /// Improper constant density.
    Flat,
    Normal { mean: f64, variance: f64 },
    Uniform { lower: f64, upper: f64 },
    Gamma { shape: f64, rate: f64 },
    InverseGamma { shape: f64, scale: f64 },
    HalfNormal { scale: f64 },
    LogNormal { mu: f64, sigma: f64 },
}

impl PriorDistribution {
    /// Whether all hyperparameters are numerically valid.
    #[must_use]
    pub fn is_valid(self) -> bool {
        match self {
            Self::Flat => true,
            Self::Normal { mean, variance } => mean.is_finite() && variance > 0.0,
            Self::Uniform { lower, upper } => {
                lower.is_finite() && upper.is_finite() && lower < upper
            }
            Self::Gamma { shape, rate } => shape > 0.0 && rate > 0.0,
            Self::InverseGamma { shape, scale } => shape > 0.0 && scale > 0.0,
            Self::HalfNormal { scale } => scale > 0.0 && scale.is_finite(),
            Self::LogNormal { mu, sigma } => mu.is_finite() && sigma > 0.0,
        }
    }

    /// Log-density at `value`; `-inf` outside the support.
    #[must_use]
    pub fn log_density(self, value: f64) -> f64 {
        match self {
            Self::Flat => 0.0,
            Self::Normal { mean, variance } => log_normal_density(value, mean, variance),
            Self::Uniform { lower, upper } => log_uniform_density(value, lower, upper),
            Self::Gamma { shape, rate } => log_gamma_density(value, shape, rate),
            Self::InverseGamma { shape, scale } => log_inverse_gamma_density(value, shape, scale),
            Self::HalfNormal { scale } => {
                if value < 0.0 {
                    f64::NEG_INFINITY
                } else {
                    std::f64::consts::LN_2 + log_normal_density(value, 0.0, scale * scale)
                }
            }
            Self::LogNormal { mu, sigma } => {
                if value > 0.0 {
                    log_normal_density(value.ln(), mu, sigma * sigma) - value.ln()
                } else {
                    f64::NEG_INFINITY
                }
            }
        }
    }
}

/// Zero-centred distribution of a random-effect realization, parameterized by
/// its standard deviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RandomEffectDistribution {
    #[default]
    Normal,
    Laplace,
}

impl RandomEffectDistribution {
    /// Log-density of a realization given the governing standard deviation.
    #[must_use]
    pub fn log_density(self, value: f64, std_dev: f64) -> f64 {
        if !(std_dev > 0.0 && std_dev.is_finite()) {
            return f64::NEG_INFINITY;
        }
        match self {
            Self::Normal => log_normal_density(value, 0.0, std_dev * std_dev),
            Self::Laplace => {
                let scale = std_dev / std::f64::consts::SQRT_2;
                -(2.0 * scale).ln() - value.abs() / scale
            }
        }
    }

    /// Draw a new realization.
    pub fn sample(self, std_dev: f64, rng: &mut StdRng) -> f64 {
        match self {
            Self::Normal => std_dev * sample_standard_normal(rng),
            Self::Laplace => {
                let scale = std_dev / std::f64::consts::SQRT_2;
                let centered = rng.random::<f64>() - 0.5;
                let tail = (1.0 - 2.0 * centered.abs()).max(f64::MIN_POSITIVE);
                -scale * centered.signum() * tail.ln()
            }
        }
    }
}

/// Prior attached to one parameter index.
#[derive(Debug, Clone, PartialEq)]
pub enum PriorEntry {
    /// Fixed-effect (or nuisance) parameter with its own prior.
    Fixed(PriorDistribution),
    /// Random-effect realization governed by the standard deviation stored at
    /// `std_index`.
    RandomEffect {
        distribution: RandomEffectDistribution,
        std_index: usize,
    },
    /// Hyper-prior on a shared random-effect standard deviation, with the
    /// realization indices it governs.
    HyperPrior {
        distribution: PriorDistribution,
        governed: Vec<usize>,
    },
}

/// Map from parameter index to prior.
#[derive(Debug, Clone, Default)]
pub struct PriorRegistry {
    entries: BTreeMap<usize, PriorEntry>,
}

impl PriorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fixed-effect prior.
    ///
    /// # Errors
    ///
    /// Returns `MhError::DuplicateParameter` if `index` is already registered
    /// and `MhError::InvalidPrior` for invalid hyperparameters.
    pub fn add_fixed_effect_distribution(
        &mut self,
        distribution: PriorDistribution,
        index: usize,
    ) -> Result<(), MhError> {
        if !distribution.is_valid() {
            return Err(MhError::InvalidPrior { index });
        }
        if self.entries.contains_key(&index) {
            return Err(MhError::DuplicateParameter { index });
        }
        self.entries.insert(index, PriorEntry::Fixed(distribution));
        Ok(())
    }

    /// Register random-effect realization `index`, distributed as
    /// `individual` with the standard deviation held at `std_index`, and the
    /// hyper-prior on that standard deviation.
    ///
    /// Several realizations may share one `std_index`; the hyper-prior is
    /// stored once and must be identical across those registrations.
    ///
    /// # Errors
    ///
    /// Returns `MhError::DuplicateParameter` if `index` is taken, if
    /// `std_index` holds anything but the same hyper-prior, or if the two
    /// indices coincide; `MhError::InvalidPrior` for invalid hyperparameters.
    pub fn add_random_effect_standard_deviation(
        &mut self,
        individual: RandomEffectDistribution,
        hyper_prior: PriorDistribution,
        index: usize,
        std_index: usize,
    ) -> Result<(), MhError> {
        if !hyper_prior.is_valid() {
            return Err(MhError::InvalidPrior { index: std_index });
        }
        if index == std_index || self.entries.contains_key(&index) {
            return Err(MhError::DuplicateParameter { index });
        }
        match self.entries.get_mut(&std_index) {
            None => {
                self.entries.insert(
                    std_index,
                    PriorEntry::HyperPrior {
                        distribution: hyper_prior,
                        governed: vec![index],
                    },
                );
            }
            Some(PriorEntry::HyperPrior {
                distribution,
                governed,
            }) if *distribution == hyper_prior => governed.push(index),
            Some(_) => return Err(MhError::DuplicateParameter { index: std_index }),
        }
        self.entries.insert(
            index,
            PriorEntry::RandomEffect {
                distribution: individual,
                std_index,
            },
        );
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `MhError::UnregisteredParameter` if `index` has no prior.
    pub fn prior(&self, index: usize) -> Result<&PriorEntry, MhError> {
        self.entries
            .get(&index)
            .ok_or(MhError::UnregisteredParameter { index })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &PriorEntry)> {
        self.entries.iter().map(|(index, entry)| (*index, entry))
    }

    /// Indices of random-effect realizations, in ascending order.
    #[must_use]
    pub fn random_effect_indices(&self) -> Vec<usize> {
        self.iter()
            .filter(|(_, entry)| matches!(entry, PriorEntry::RandomEffect { .. }))
            .map(|(index, _)| index)
            .collect()
    }

    /// Check that indices `0..dimension` each carry exactly one prior.
    ///
    /// # Errors
    ///
    /// Returns `MhError::UnregisteredParameter` for the first uncovered index
    /// and `MhError::PriorOutOfRange` for registrations past the end.
    pub fn validate_coverage(&self, dimension: usize) -> Result<(), MhError> {
        if let Some((&index, _)) = self.entries.range(dimension..).next() {
            return Err(MhError::PriorOutOfRange { index, dimension });
        }
        for index in 0..dimension {
            self.prior(index)?;
        }
        Ok(())
    }

    /// Joint log prior density at `parameters`.
    ///
    /// Returns `-inf` as soon as one term is outside its support.
    ///
    /// # Errors
    ///
    /// Returns `MhError::PriorOutOfRange` if a registered index lies past the
    /// end of `parameters`.
    pub fn log_prior(&self, parameters: &[f64]) -> Result<f64, MhError> {
        let value_at = |index: usize| {
            parameters
                .get(index)
                .copied()
                .ok_or(MhError::PriorOutOfRange {
                    index,
                    dimension: parameters.len(),
                })
        };

        let mut total = 0.0;
        for (index, entry) in self.iter() {
            let value = value_at(index)?;
            let term = match entry {
                PriorEntry::Fixed(distribution)
                | PriorEntry::HyperPrior { distribution, .. } => distribution.log_density(value),
                PriorEntry::RandomEffect {
                    distribution,
                    std_index,
                } => distribution.log_density(value, value_at(*std_index)?),
            };
            if !term.is_finite() {
                return Ok(f64::NEG_INFINITY);
            }
            total += term;
        }
        Ok(total)
    }
}

/// Log-density for `Normal(mean, variance)`.
#[must_use]
pub fn log_normal_density(value: f64, mean: f64, variance: f64) -> f64 {
    if variance <= 0.0 {
        return f64::NEG_INFINITY;
    }
    let centered = value - mean;
    -0.5 * (std::f64::consts::TAU.ln() + variance.ln() + centered * centered / variance)
}

/// Log-density for `Uniform(low, high)`.
#[must_use]
pub fn log_uniform_density(value: f64, low: f64, high: f64) -> f64 {
    if low.partial_cmp(&high) != Some(std::cmp::Ordering::Less) {
        return f64::NAN;
    }
    if (low..=high).contains(&value) {
        -(high - low).ln()
    } else {
        f64::NEG_INFINITY
    }
}

/// Log-density for a gamma distribution with shape/rate parameterization.
#[must_use]
pub fn log_gamma_density(value: f64, shape: f64, rate: f64) -> f64 {
    if !(value > 0.0 && shape > 0.0 && rate > 0.0) {
        return f64::NEG_INFINITY;
    }
    shape.mul_add(rate.ln(), -ln_gamma(shape)) + (shape - 1.0).mul_add(value.ln(), -rate * value)
}

/// Log-density for an inverse-gamma distribution.
#[must_use]
pub fn log_inverse_gamma_density(value: f64, shape: f64, scale: f64) -> f64 {
    if !(value > 0.0 && shape > 0.0 && scale > 0.0) {
        return f64::NEG_INFINITY;
    }

    shape.mul_add(scale.ln(), -ln_gamma(shape)) - (shape + 1.0).mul_add(value.ln(), scale / value)
}
