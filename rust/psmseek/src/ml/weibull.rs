//! Weibull calibration of null (decoy) score populations.
//!
//! The location (shift) is found by a grid scan, scale and shape by rank
//! regression on Y at each shift, keeping the shift with the best
//! correlation. Rank regression follows
//! http://www.chinarel.com/onlincebook/LifeDataWeb/rank_regression_on_y.htm
//!
//! A maximum-likelihood shape estimate is computed at the chosen shift by
//! Newton iteration on the location-free extreme value likelihood equation
//! (eq. 10 and 11 of "Maximum likelihood fitting of extreme value
//! distributions"). It is reported next to the regression fit.

use crate::config::{
    SearchParameters,
    ShiftRange,
};
use serde::Serialize;
use tracing::debug;

const CORRELATION_TOLERANCE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct WeibullParams {
    pub eta: f64,
    pub beta: f64,
    pub shift: f64,
    pub correlation: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NewtonOutcome {
    /// Best reciprocal-scale value found, the shape estimate.
    pub l_value: f64,
    pub iterations: usize,
    pub converged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeibullFit {
    pub params: WeibullParams,
    pub num_scores: usize,
    pub num_tail_samples: usize,
    pub mle_beta: Option<f64>,
    pub mle_eta: Option<f64>,
    pub newton: Option<NewtonOutcome>,
}

/// Two-parameter fit of `data` (sorted descending) shifted right by `shift`.
///
/// Only the first `fit_n` points are fit, stopping early at the first point
/// that is not positive after shifting. Ranks are taken relative to
/// `total_n`. A degenerate fit has zero correlation, eta and beta.
pub fn fit_two_parameter_weibull(
    data: &[f64],
    fit_n: usize,
    total_n: usize,
    shift: f64,
) -> WeibullParams {
    let fit_n = fit_n.min(data.len());
    let mut xs: Vec<f64> = Vec::with_capacity(fit_n);
    for (idx, x) in data[..fit_n].iter().enumerate() {
        let shifted = x + shift;
        if shifted <= 0.0 {
            debug!("Reached non-positive score at idx {}", idx);
            break;
        }
        xs.push(shifted.ln());
    }

    let n = xs.len();
    if n == 0 {
        return WeibullParams {
            shift,
            ..Default::default()
        };
    }

    let total = total_n as f64;
    let ys: Vec<f64> = (0..n)
        .map(|idx| {
            let reverse_idx = (total_n - idx) as f64;
            let f_t = (reverse_idx - 0.3) / (total + 0.4);
            (-(1.0 - f_t).ln()).ln()
        })
        .collect();

    let nf = n as f64;
    let sum_x: f64 = xs.iter().sum();
    let sum_y: f64 = ys.iter().sum();
    let sum_xx: f64 = xs.iter().map(|x| x * x).sum();
    let sum_xy: f64 = xs.iter().zip(ys.iter()).map(|(x, y)| x * y).sum();

    let b_num = sum_xy - (sum_x * sum_y / nf);
    let b_denom = sum_xx - sum_x * sum_x / nf;
    let b_hat = b_num / b_denom;
    let a_hat = (sum_y - b_hat * sum_x) / nf;

    let mean_x = sum_x / nf;
    let mean_y = sum_y / nf;
    let mut c_num = 0.0;
    let mut c_denom_x = 0.0;
    let mut c_denom_y = 0.0;
    for (x, y) in xs.iter().zip(ys.iter()) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        c_num += dx * dy;
        c_denom_x += dx * dx;
        c_denom_y += dy * dy;
    }
    let c_denom = (c_denom_x * c_denom_y).sqrt();
    if c_denom == 0.0 {
        debug!("Zero denominator in correlation calculation at shift {}", shift);
        return WeibullParams {
            shift,
            ..Default::default()
        };
    }

    WeibullParams {
        eta: (-a_hat / b_hat).exp(),
        beta: b_hat,
        shift,
        correlation: c_num / c_denom,
    }
}

/// Scans `range` for the shift whose two-parameter fit correlates best.
///
/// Parameters are only kept when the best correlation reaches
/// `corr_threshold`, otherwise eta, beta and shift are zero. The best
/// correlation is always reported.
pub fn fit_three_parameter_weibull(
    data: &[f64],
    fit_n: usize,
    total_n: usize,
    range: &ShiftRange,
    corr_threshold: f64,
) -> WeibullParams {
    let mut best = WeibullParams::default();

    for shift in range.shifts() {
        let cur = fit_two_parameter_weibull(data, fit_n, total_n, shift);
        if cur.correlation > best.correlation {
            best = cur;
        } else if cur.correlation < best.correlation - CORRELATION_TOLERANCE {
            break;
        }
    }

    if best.correlation >= corr_threshold {
        best
    } else {
        WeibullParams {
            correlation: best.correlation,
            ..Default::default()
        }
    }
}

/// Value and derivative of the location-free likelihood equation for an
/// extreme value distribution with reciprocal scale `l_value`, plus the sum
/// of exponentials (relative to `min(values)`).
pub fn constraint_function(values: &[f64], l_value: f64) -> (f64, f64, f64) {
    let n = values.len() as f64;
    let offset = values.iter().copied().fold(f64::INFINITY, f64::min);

    let mut numerator = 0.0;
    let mut second_numerator = 0.0;
    let mut denominator = 0.0;
    let mut value_sum = 0.0;
    for v in values.iter() {
        let e = (-l_value * (v - offset)).exp();
        numerator += e * v;
        second_numerator += v * v * e;
        denominator += e;
        value_sum += v;
    }

    let ratio = numerator / denominator;
    let function = (1.0 / l_value) - (value_sum / n) + ratio;
    let derivative = ratio * ratio - (second_numerator / denominator) - 1.0 / (l_value * l_value);
    (function, derivative, denominator)
}

/// Newton-Raphson on [`constraint_function`] starting from `initial_l`.
///
/// Never fails: without convergence the iterate with the smallest residual
/// is returned.
pub fn solve_constraint_newton(
    values: &[f64],
    initial_l: f64,
    max_iterations: usize,
    tolerance: f64,
) -> NewtonOutcome {
    let mut l_value = if initial_l.is_finite() && initial_l > 0.0 {
        initial_l
    } else {
        1.0
    };
    let (f0, _, _) = constraint_function(values, l_value);
    let mut best_l = l_value;
    let mut best_residual = f0.abs();
    let mut iterations = 0;

    while iterations < max_iterations {
        let (function, derivative, _) = constraint_function(values, l_value);
        if function.abs() < best_residual {
            best_residual = function.abs();
            best_l = l_value;
        }
        if function.abs() < tolerance {
            break;
        }
        if derivative == 0.0 || !derivative.is_finite() {
            break;
        }
        let next = l_value - function / derivative;
        if !next.is_finite() || next <= 0.0 {
            break;
        }
        l_value = next;
        iterations += 1;
    }

    let (function, _, _) = constraint_function(values, l_value);
    if function.abs() < best_residual {
        best_residual = function.abs();
        best_l = l_value;
    }

    NewtonOutcome {
        l_value: best_l,
        iterations,
        converged: best_residual < tolerance,
    }
}

/// Fits a Weibull to a pool of null scores.
///
/// Returns None when the pool is smaller than `min_weibull_points`; callers
/// must then skip p-values for this spectrum. The pool is sorted in place,
/// descending.
pub fn estimate_weibull(
    scores: &mut [f64],
    params: &SearchParameters,
    range: &ShiftRange,
) -> Option<WeibullFit> {
    let num_scores = scores.len();
    if num_scores < params.min_weibull_points {
        return None;
    }

    scores.sort_unstable_by(|a, b| b.total_cmp(a));
    let num_tail_samples = (num_scores as f64 * params.fraction_top_scores_to_fit) as usize;
    debug!(
        "Estimating Weibull params with {} psms ({:.2} of {})",
        num_tail_samples, params.fraction_top_scores_to_fit, num_scores
    );

    let fit = fit_three_parameter_weibull(
        scores,
        num_tail_samples,
        num_scores,
        range,
        params.correlation_threshold,
    );

    let (mle_beta, mle_eta, newton) = if fit.beta > 0.0 {
        let transformed: Vec<f64> = scores
            .iter()
            .filter(|x| **x + fit.shift > 0.0)
            .map(|x| -(x + fit.shift).ln())
            .collect();
        if transformed.len() > 1 {
            let outcome = solve_constraint_newton(
                &transformed,
                fit.beta,
                params.newton_max_iterations,
                params.newton_tolerance,
            );
            let eta = mle_scale(&transformed, outcome.l_value);
            (Some(outcome.l_value), Some(eta), Some(outcome))
        } else {
            (None, None, None)
        }
    } else {
        (None, None, None)
    };

    debug!(
        "Corr: {:.6}  Eta: {:.6}  Beta: {:.6}  Shift: {:.6}  MLE beta: {:?}",
        fit.correlation, fit.eta, fit.beta, fit.shift, mle_beta
    );

    Some(WeibullFit {
        params: fit,
        num_scores,
        num_tail_samples,
        mle_beta,
        mle_eta,
        newton,
    })
}

/// Scale implied by a reciprocal scale `l_value` for values `s = -ln(x)`.
fn mle_scale(values: &[f64], l_value: f64) -> f64 {
    let offset = values.iter().copied().fold(f64::INFINITY, f64::min);
    let n = values.len() as f64;
    let mean_exp: f64 = values
        .iter()
        .map(|v| (-l_value * (v - offset)).exp())
        .sum::<f64>()
        / n;
    let location = offset - mean_exp.ln() / l_value;
    (-location).exp()
}
