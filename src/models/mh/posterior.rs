//! Posterior draws, scalar summaries, and the tabular sample report.

use std::fmt;

use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use num_traits::ToPrimitive;

use super::diagnostics::effective_sample_size;
use crate::utils::usize_to_f64;

/// One evaluated point of the parameter space. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    parameters: Vec<f64>,
    log_likelihood: f64,
    log_posterior: f64,
}

impl Sample {
    #[must_use]
    pub const fn new(parameters: Vec<f64>, log_likelihood: f64, log_posterior: f64) -> Self {
        Self {
            parameters,
            log_likelihood,
            log_posterior,
        }
    }

    #[must_use]
    pub fn parameters(&self) -> &[f64] {
        &self.parameters
    }

    #[must_use]
    pub const fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    #[must_use]
    pub const fn log_posterior(&self) -> f64 {
        self.log_posterior
    }

    /// Whether the log-posterior is finite.
    #[must_use]
    pub const fn is_feasible(&self) -> bool {
        self.log_posterior.is_finite()
    }
}

/// Retained draws of a finalized chain (or pooled chains), with names.
#[derive(Debug, Clone, Default)]
pub struct PosteriorSamples {
    parameter_names: Vec<String>,
    draws: Vec<Sample>,
}

impl PosteriorSamples {
    pub(crate) const fn new(parameter_names: Vec<String>, draws: Vec<Sample>) -> Self {
        Self {
            parameter_names,
            draws,
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.draws.len()
    }

    #[must_use]
    pub fn parameter_names(&self) -> &[String] {
        &self.parameter_names
    }

    #[must_use]
    pub fn draws(&self) -> &[Sample] {
        &self.draws
    }

    /// Values of parameter `index` across draws; empty if out of range.
    #[must_use]
    pub fn column(&self, index: usize) -> Vec<f64> {
        if index >= self.parameter_names.len() {
            return Vec::new();
        }
        self.draws
            .iter()
            .map(|draw| draw.parameters[index])
            .collect()
    }

    /// Tab-separated view of the draws.
    #[must_use]
    pub const fn report(&self) -> PosteriorSampleReport<'_> {
        PosteriorSampleReport { samples: self }
    }
}

/// Plain-text table of retained draws.
///
/// Header `log_likelihood` followed by the parameter names, then one row per
/// draw. Columns are tab-separated and values use the shortest round-trip
/// float formatting, so identical draws always render identically.
#[derive(Debug, Clone, Copy)]
pub struct PosteriorSampleReport<'a> {
    samples: &'a PosteriorSamples,
}

impl fmt::Display for PosteriorSampleReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "log_likelihood")?;
        for name in &self.samples.parameter_names {
            write!(f, "\t{name}")?;
        }
        writeln!(f)?;
        for draw in &self.samples.draws {
            write!(f, "{}", draw.log_likelihood)?;
            for value in &draw.parameters {
                write!(f, "\t{value}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Scalar posterior summary statistics.
#[derive(Debug, Clone, Default)]
pub struct ParameterSummary {
    pub name: String,
    pub mean: f64,
    pub variance: f64,
    pub std_dev: f64,
    pub q025: f64,
    pub q50: f64,
    pub q975: f64,
    pub ess: f64,
}

/// Posterior summary for every named parameter.
#[derive(Debug, Clone, Default)]
pub struct PosteriorSummary {
    pub parameters: Vec<ParameterSummary>,
    pub draw_count: usize,
}

impl PosteriorSummary {
    /// Summary for the parameter called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParameterSummary> {
        self.parameters.iter().find(|summary| summary.name == name)
    }
}

/// Compute posterior summaries for all parameters.
#[must_use]
pub fn summarize_posterior(samples: &PosteriorSamples) -> PosteriorSummary {
    let draw_count = samples.len();
    if draw_count == 0 {
        return PosteriorSummary {
            draw_count,
            ..PosteriorSummary::default()
        };
    }

    let parameters = samples
        .parameter_names
        .iter()
        .enumerate()
        .map(|(index, name)| summarize_scalar(name, &samples.column(index)))
        .collect();

    PosteriorSummary {
        parameters,
        draw_count,
    }
}

/// Render a posterior summary with `comfy_table`.
#[must_use]
pub fn render_summary_table(summary: &PosteriorSummary) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            ["parameter", "mean", "sd", "2.5%", "50%", "97.5%", "ess"]
                .iter()
                .map(|h| Cell::new(*h))
                .collect::<Vec<_>>(),
        );
    for row in &summary.parameters {
        table.add_row(vec![
            Cell::new(&row.name),
            Cell::new(format!("{:.4}", row.mean)),
            Cell::new(format!("{:.4}", row.std_dev)),
            Cell::new(format!("{:.4}", row.q025)),
            Cell::new(format!("{:.4}", row.q50)),
            Cell::new(format!("{:.4}", row.q975)),
            Cell::new(format!("{:.0}", row.ess)),
        ]);
    }
    table.to_string()
}

#[must_use]
fn summarize_scalar(name: &str, values: &[f64]) -> ParameterSummary {
    if values.is_empty() {
        return ParameterSummary {
            name: name.to_owned(),
            ..ParameterSummary::default()
        };
    }

    let n = usize_to_f64(values.len());
    let mean = values.iter().sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|value| {
            let centered = value - mean;
            centered * centered
        })
        .sum::<f64>()
        / n.max(1.0);

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    ParameterSummary {
        name: name.to_owned(),
        mean,
        variance,
        std_dev: variance.sqrt(),
        q025: percentile(&sorted, 0.025),
        q50: percentile(&sorted, 0.5),
        q975: percentile(&sorted, 0.975),
        ess: effective_sample_size(values),
    }
}

#[must_use]
fn percentile(sorted_values: &[f64], probability: f64) -> f64 {
    if sorted_values.is_empty() {
        return f64::NAN;
    }

    let clamped = probability.clamp(0.0, 1.0);
    let last = sorted_values.len() - 1;
    let position = clamped * usize_to_f64(last);
    let lower = position.floor().to_usize().unwrap_or(0);
    let upper = position.ceil().to_usize().unwrap_or(last);

    if lower == upper {
        sorted_values[lower]
    } else {
        let weight = position - usize_to_f64(lower);
        (1.0 - weight).mul_add(sorted_values[lower], weight * sorted_values[upper])
    }
}
