//! # Model inputs
//!
//! Defines a light-weight container for scalar outcomes grouped by subject,
//! shared by the reference models.
//!
//! # Examples
//!
//! ```
//! use hierarchical_mh::SubjectInput;
//!
//! let input = SubjectInput::new(vec![1.0, 2.0, 3.0], vec![7, 7, 9]);
//! assert!(input.validate().is_ok());
//! assert_eq!(input.subjects().len(), 2);
//! ```
//!
//! ```
//! use hierarchical_mh::SubjectInput;
//!
//! let input = SubjectInput::new(vec![1.0, 2.0], vec![7]);
//! assert!(input.validate().is_err());
//! ```

use std::collections::BTreeMap;

use thiserror::Error;

/// Errors returned when validating model inputs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("input must contain at least one observation")]
    Empty,
    #[error("subject id length ({len}) must equal number of observations ({rows})")]
    InvalidSubjectLength { len: usize, rows: usize },
    #[error("outcome contains non-finite values")]
    NonFiniteOutcome,
    #[error("outcome contains negative values")]
    NegativeOutcome,
    #[error("outcome contains non-integer values")]
    NonIntegerOutcome,
}

/// Subject-wise row index bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectRows {
    pub subject_id: u64,
    pub rows: Vec<usize>,
}

/// Scalar outcomes with one subject label per observation.
#[derive(Debug, Clone)]
pub struct SubjectInput {
    pub outcome: Vec<f64>,
    pub subject_ids: Vec<u64>,
}

impl SubjectInput {
    #[must_use]
    pub const fn new(outcome: Vec<f64>, subject_ids: Vec<u64>) -> Self {
        Self {
            outcome,
            subject_ids,
        }
    }

    /// One subject per observation.
    #[must_use]
    pub fn independent(outcome: Vec<f64>) -> Self {
        let subject_ids = (0..outcome.len())
            .map(|row| u64::try_from(row).unwrap_or(u64::MAX))
            .collect();
        Self::new(outcome, subject_ids)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.outcome.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.outcome.is_empty()
    }

    /// # Errors
    ///
    /// Returns `InputError` if lengths or values are malformed.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.outcome.is_empty() {
            return Err(InputError::Empty);
        }
        if self.subject_ids.len() != self.outcome.len() {
            return Err(InputError::InvalidSubjectLength {
                len: self.subject_ids.len(),
                rows: self.outcome.len(),
            });
        }
        if self.outcome.iter().any(|value| !value.is_finite()) {
            return Err(InputError::NonFiniteOutcome);
        }
        Ok(())
    }

    /// Additional checks for count outcomes.
    ///
    /// # Errors
    ///
    /// Returns `InputError` if the input is invalid or holds non-count values.
    pub fn validate_counts(&self) -> Result<(), InputError> {
        self.validate()?;
        if self.outcome.iter().any(|value| *value < 0.0) {
            return Err(InputError::NegativeOutcome);
        }
        if self.outcome.iter().any(|value| value.fract() != 0.0) {
            return Err(InputError::NonIntegerOutcome);
        }
        Ok(())
    }

    /// Rows grouped by subject id, in ascending id order.
    #[must_use]
    pub fn subjects(&self) -> Vec<SubjectRows> {
        let mut grouped: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
        for (row, subject_id) in self.subject_ids.iter().copied().enumerate() {
            grouped.entry(subject_id).or_default().push(row);
        }

        grouped
            .into_iter()
            .map(|(subject_id, rows)| SubjectRows { subject_id, rows })
            .collect()
    }
}
