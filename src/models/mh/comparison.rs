/////////////////////////////////////////////////////////////////////////////////////////////\
//
// Model comparison by log pseudo-marginal likelihood and pseudo Bayes factors.
//
// Created on: 25 Jan 2026     Author: Tobias Kragholm
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Model comparison
//!
//! Conditional predictive ordinates are estimated from retained draws by the
//! harmonic-mean identity
//!
//! `log CPO_i = ln S - logsumexp_s(-log f_i(theta_s))`,
//!
//! and the log pseudo-marginal likelihood (LPML) is their sum over subjects.
//! Two models fitted to the same data compare through the pseudo Bayes factor
//! `exp(LPML_a - LPML_b)`.

use comfy_table::{
    Attribute, Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED,
};

use super::model::MhModel;
use super::posterior::PosteriorSamples;
use super::types::MhError;
use crate::utils::{log_sum_exp, usize_to_f64};

/// LPML with its per-subject terms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LpmlReport {
    /// Sum of `log_cpo`.
    pub lpml: f64,
    /// Log conditional predictive ordinate per subject.
    pub log_cpo: Vec<f64>,
}

/// One row of a model ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRanking {
    pub name: String,
    pub lpml: f64,
    /// `LPML - LPML_best`; zero for the best model.
    pub log_pseudo_bayes_factor_vs_best: f64,
}

/// Estimate the LPML of `model` from finalized draws.
///
/// Uses [`MhModel::predictive_log_likelihood_of_subject`], so hierarchical
/// models that integrate their random effects out are scored marginally.
///
/// # Errors
///
/// Returns `MhError::EmptyPosterior` without draws and `MhError::Model` if the
/// model fails.
pub fn log_pseudo_marginal_likelihood<M: MhModel + ?Sized>(
    model: &M,
    samples: &PosteriorSamples,
) -> Result<LpmlReport, MhError> {
    if samples.is_empty() {
        return Err(MhError::EmptyPosterior);
    }
    let log_draws = usize_to_f64(samples.len()).ln();
    let mut negated = Vec::with_capacity(samples.len());

    let log_cpo = (0..model.number_of_subjects())
        .map(|subject| -> Result<f64, MhError> {
            negated.clear();
            for draw in samples.draws() {
                let log_f =
                    model.predictive_log_likelihood_of_subject(draw.parameters(), subject)?;
                negated.push(-log_f);
            }
            Ok(log_draws - log_sum_exp(&negated))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let lpml = log_cpo.iter().sum();
    log::debug!("LPML {lpml:.4} over {} subjects", log_cpo.len());
    Ok(LpmlReport { lpml, log_cpo })
}

/// `exp(lpml_a - lpml_b)`; values above one favour model `a`.
#[must_use]
pub fn pseudo_bayes_factor(lpml_a: f64, lpml_b: f64) -> f64 {
    log_pseudo_bayes_factor(lpml_a, lpml_b).exp()
}

#[must_use]
pub fn log_pseudo_bayes_factor(lpml_a: f64, lpml_b: f64) -> f64 {
    lpml_a - lpml_b
}

/// Sort models by LPML, best first.
#[must_use]
pub fn rank_models(entries: &[(String, f64)]) -> Vec<ModelRanking> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(|a, b| b.1.total_cmp(&a.1));
    let best = sorted.first().map_or(f64::NAN, |(_, lpml)| *lpml);
    sorted
        .into_iter()
        .map(|(name, lpml)| ModelRanking {
            name,
            lpml,
            log_pseudo_bayes_factor_vs_best: log_pseudo_bayes_factor(lpml, best),
        })
        .collect()
}

/// Render a model ranking with `comfy_table`, highlighting the best LPML.
#[must_use]
pub fn render_comparison_table(rankings: &[ModelRanking]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            ["model", "lpml", "log pbf vs best"]
                .iter()
                .map(|h| Cell::new(*h))
                .collect::<Vec<_>>(),
        );
    let best = rankings
        .iter()
        .map(|row| row.lpml)
        .fold(f64::NEG_INFINITY, f64::max);
    for row in rankings {
        table.add_row(vec![
            Cell::new(&row.name),
            highlight_metric_cell(row.lpml, best, 3),
            Cell::new(format!("{:.3}", row.log_pseudo_bayes_factor_vs_best)),
        ]);
    }
    table.to_string()
}

fn highlight_metric_cell(value: f64, best: f64, precision: usize) -> Cell {
    let is_best = (value - best).abs() < 1e-12;
    if is_best {
        Cell::new(format!("{value:.precision$}"))
            .fg(Color::Green)
            .add_attribute(Attribute::Bold)
    } else {
        Cell::new(format!("{value:.precision$}"))
    }
}
