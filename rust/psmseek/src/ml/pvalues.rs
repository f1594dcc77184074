use super::weibull::WeibullParams;

const BONFERRONI_CUT_OFF_P: f64 = 0.0001;
const BONFERRONI_CUT_OFF_NP: f64 = 0.01;

/// Upper-tail probability of `score` under a shifted Weibull.
///
/// NaN when there is no fit (eta of zero), 1 when the score lies left of the
/// support.
pub fn compute_weibull_pvalue(score: f64, eta: f64, beta: f64, shift: f64) -> f64 {
    if eta == 0.0 {
        return f64::NAN;
    }
    if score + shift <= 0.0 {
        return 1.0;
    }
    (-((score + shift) / eta).powf(beta)).exp()
}

/// Family-wise correction of `p_value` over `num_tests` tests.
///
/// Uses the exact `1 - (1 - p)^n` unless both p and p*n are small, where
/// that form loses precision and p*n is used instead.
pub fn bonferroni_correction(p_value: f64, num_tests: usize) -> f64 {
    let n = num_tests as f64;
    let out = if p_value > BONFERRONI_CUT_OFF_P || p_value * n > BONFERRONI_CUT_OFF_NP {
        1.0 - (1.0 - p_value).powf(n)
    } else {
        p_value * n
    };
    out.clamp(0.0, 1.0)
}

/// The reportable p-value score, `-ln(p)` after optional correction.
/// Larger is more significant.
pub fn log_pvalue_score(
    score: f64,
    params: &WeibullParams,
    num_tests: usize,
    apply_bonferroni: bool,
) -> f64 {
    let pvalue = compute_weibull_pvalue(score, params.eta, params.beta, params.shift);
    let pvalue = if apply_bonferroni {
        bonferroni_correction(pvalue, num_tests)
    } else {
        pvalue
    };
    -pvalue.ln()
}
