pub mod pvalues;
pub mod qvalues;
pub mod weibull;

pub use pvalues::{
    bonferroni_correction,
    compute_weibull_pvalue,
    log_pvalue_score,
};
pub use qvalues::{
    LabelledScore,
    ScoreMap,
    TargetDecoy,
    assign_qval,
    benjamini_hochberg_map,
    score_to_qvalue_map,
};
pub use weibull::{
    NewtonOutcome,
    WeibullFit,
    WeibullParams,
    estimate_weibull,
    fit_three_parameter_weibull,
    fit_two_parameter_weibull,
};
