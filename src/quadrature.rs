//! Gauss-Hermite quadrature rules.
//!
//! Nodes and weights are computed once, on first access, into a process-wide
//! read-only table keyed by rule order. Nothing mutates the table afterwards.
//!
//! Rules use the physicist's weight `exp(-x^2)`, so the weights of every rule
//! sum to `sqrt(pi)`.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::utils::log_sum_exp;

/// Rule orders available from [`gauss_hermite`].
pub const SUPPORTED_ORDERS: [usize; 4] = [5, 10, 20, 32];

const NEWTON_TOLERANCE: f64 = 3.0e-14;
const NEWTON_MAX_ITERS: usize = 100;
// pi^(-1/4)
const PI_FOURTH_ROOT_INV: f64 = 0.751_125_544_464_942_5;

static GAUSS_HERMITE_RULES: LazyLock<BTreeMap<usize, GaussHermiteRule>> = LazyLock::new(|| {
    SUPPORTED_ORDERS
        .iter()
        .map(|&order| (order, compute_gauss_hermite(order)))
        .collect()
});

/// Gauss-Hermite nodes (ascending) and matching weights.
#[derive(Debug, Clone)]
pub struct GaussHermiteRule {
    nodes: Vec<f64>,
    weights: Vec<f64>,
}

/// Look up a precomputed rule. Returns `None` for unsupported orders.
#[must_use]
pub fn gauss_hermite(order: usize) -> Option<&'static GaussHermiteRule> {
    GAUSS_HERMITE_RULES.get(&order)
}

impl GaussHermiteRule {
    #[must_use]
    pub fn nodes(&self) -> &[f64] {
        &self.nodes
    }

    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `E[f(X)]` for `X ~ Normal(mean, std_dev^2)`.
    pub fn normal_expectation(&self, mean: f64, std_dev: f64, mut f: impl FnMut(f64) -> f64) -> f64 {
        let scale = std::f64::consts::SQRT_2 * std_dev;
        let total = self
            .nodes
            .iter()
            .zip(&self.weights)
            .map(|(node, weight)| weight * f(scale.mul_add(*node, mean)))
            .sum::<f64>();
        total / std::f64::consts::PI.sqrt()
    }

    /// `ln ∫ exp(g(u)) du`, with the rule recentred at `mode` and stretched by
    /// `scale` (adaptive Gauss-Hermite).
    ///
    /// Exact when `g` is quadratic with maximum `mode` and curvature
    /// `-1 / scale^2`; `scale` must be positive.
    pub fn log_integral_adaptive(
        &self,
        mode: f64,
        scale: f64,
        mut log_integrand: impl FnMut(f64) -> f64,
    ) -> f64 {
        if !(scale > 0.0 && scale.is_finite() && mode.is_finite()) {
            return f64::NAN;
        }
        let stretch = std::f64::consts::SQRT_2 * scale;
        let terms = self
            .nodes
            .iter()
            .zip(&self.weights)
            .map(|(node, weight)| {
                node.mul_add(*node, weight.ln()) + log_integrand(stretch.mul_add(*node, mode))
            })
            .collect::<Vec<_>>();
        stretch.ln() + log_sum_exp(&terms)
    }
}

fn compute_gauss_hermite(order: usize) -> GaussHermiteRule {
    let n = order;
    let n_f = f64::from(u32::try_from(n).unwrap_or(u32::MAX));
    let mut nodes = vec![0.0; n];
    let mut weights = vec![0.0; n];

    let mut z = 0.0_f64;
    for i in 0..n.div_ceil(2) {
        z = match i {
            0 => 2.0f64.mul_add(n_f, 1.0).sqrt() - 1.855_75 * 2.0f64.mul_add(n_f, 1.0).powf(-0.166_67),
            1 => z - 1.14 * n_f.powf(0.426) / z,
            2 => 1.86f64.mul_add(z, -0.86 * nodes[0]),
            3 => 1.91f64.mul_add(z, -0.91 * nodes[1]),
            _ => 2.0f64.mul_add(z, -nodes[i - 2]),
        };

        let mut derivative = 1.0;
        for _ in 0..NEWTON_MAX_ITERS {
            let (value, previous) = hermite_orthonormal(n, z);
            derivative = (2.0 * n_f).sqrt() * previous;
            let step = value / derivative;
            z -= step;
            if step.abs() <= NEWTON_TOLERANCE {
                break;
            }
        }

        nodes[i] = z;
        nodes[n - 1 - i] = -z;
        weights[i] = 2.0 / (derivative * derivative);
        weights[n - 1 - i] = weights[i];
    }

    // Newton iterates from the largest root downwards.
    nodes.reverse();
    weights.reverse();
    GaussHermiteRule { nodes, weights }
}

/// Orthonormal Hermite recurrence: returns `(h_n(z), h_{n-1}(z))`.
fn hermite_orthonormal(n: usize, z: f64) -> (f64, f64) {
    let mut current = PI_FOURTH_ROOT_INV;
    let mut previous = 0.0;
    for j in 0..n {
        let j_f = f64::from(u32::try_from(j).unwrap_or(u32::MAX));
        let next = z * (2.0 / (j_f + 1.0)).sqrt() * current - (j_f / (j_f + 1.0)).sqrt() * previous;
        previous = current;
        current = next;
    }
    (current, previous)
}
