use serde::{
    Deserialize,
    Serialize,
};
use std::cmp::Ordering;

/// Every score a [`crate::Match`] can carry.
///
/// The discriminant doubles as the slot index into the per-match score and
/// rank arrays, so the order here is part of the storage layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreType {
    Sp,
    Xcorr,
    Evalue,
    DecoyXcorrQvalue,
    DecoyXcorrPeptideQvalue,
    DecoyXcorrPep,
    DecoyEvalueQvalue,
    DecoyEvaluePeptideQvalue,
    DecoyEvaluePep,
    LogpWeibullXcorr,
    LogpBonfWeibullXcorr,
    LogpQvalueWeibullXcorr,
    LogpPeptideQvalueWeibull,
    LogpWeibullPep,
    PercolatorScore,
    PercolatorQvalue,
    PercolatorPeptideQvalue,
    PercolatorPep,
    QrankerScore,
    QrankerQvalue,
    QrankerPeptideQvalue,
    QrankerPep,
    BaristaScore,
    BaristaQvalue,
    BaristaPeptideQvalue,
    BaristaPep,
    DeltaCn,
}

pub const NUM_SCORE_TYPES: usize = 27;

impl ScoreType {
    pub const ALL: [ScoreType; NUM_SCORE_TYPES] = [
        ScoreType::Sp,
        ScoreType::Xcorr,
        ScoreType::Evalue,
        ScoreType::DecoyXcorrQvalue,
        ScoreType::DecoyXcorrPeptideQvalue,
        ScoreType::DecoyXcorrPep,
        ScoreType::DecoyEvalueQvalue,
        ScoreType::DecoyEvaluePeptideQvalue,
        ScoreType::DecoyEvaluePep,
        ScoreType::LogpWeibullXcorr,
        ScoreType::LogpBonfWeibullXcorr,
        ScoreType::LogpQvalueWeibullXcorr,
        ScoreType::LogpPeptideQvalueWeibull,
        ScoreType::LogpWeibullPep,
        ScoreType::PercolatorScore,
        ScoreType::PercolatorQvalue,
        ScoreType::PercolatorPeptideQvalue,
        ScoreType::PercolatorPep,
        ScoreType::QrankerScore,
        ScoreType::QrankerQvalue,
        ScoreType::QrankerPeptideQvalue,
        ScoreType::QrankerPep,
        ScoreType::BaristaScore,
        ScoreType::BaristaQvalue,
        ScoreType::BaristaPeptideQvalue,
        ScoreType::BaristaPep,
        ScoreType::DeltaCn,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreType::Sp => "spscore",
            ScoreType::Xcorr => "xcorr score",
            ScoreType::Evalue => "evalue_score",
            ScoreType::DecoyXcorrQvalue => "decoy_xcorr_qvalue",
            ScoreType::DecoyXcorrPeptideQvalue => "decoy_xcorr_peptide_qvalue",
            ScoreType::DecoyXcorrPep => "decoy_xcorr_PEP",
            ScoreType::DecoyEvalueQvalue => "decoy_evalue_qvalue",
            ScoreType::DecoyEvaluePeptideQvalue => "decoy_evalue_peptide_qvalue",
            ScoreType::DecoyEvaluePep => "decoy_evalue_pep",
            ScoreType::LogpWeibullXcorr => "logp_weibull_xcorr",
            ScoreType::LogpBonfWeibullXcorr => "logp_bonf_weibull_xcorr",
            ScoreType::LogpQvalueWeibullXcorr => "logp_qvalue_weibull_xcorr",
            ScoreType::LogpPeptideQvalueWeibull => "logp_peptide_qvalue_weibull",
            ScoreType::LogpWeibullPep => "logp_weibull_PEP",
            ScoreType::PercolatorScore => "percolator_score",
            ScoreType::PercolatorQvalue => "percolator_qvalue",
            ScoreType::PercolatorPeptideQvalue => "percolator_peptide_qvalue",
            ScoreType::PercolatorPep => "percolator_PEP",
            ScoreType::QrankerScore => "qranker_score",
            ScoreType::QrankerQvalue => "qranker_qvalue",
            ScoreType::QrankerPeptideQvalue => "qranker_peptide_qvalue",
            ScoreType::QrankerPep => "qranker_PEP",
            ScoreType::BaristaScore => "barista_score",
            ScoreType::BaristaQvalue => "barista_qvalue",
            ScoreType::BaristaPeptideQvalue => "barista_peptide_qvalue",
            ScoreType::BaristaPep => "barista_PEP",
            ScoreType::DeltaCn => "delta_cn",
        }
    }

    /// The score type a collection is actually ordered by when a sort by
    /// `self` is requested.
    ///
    /// Derived statistics (q-values, PEPs) sort by the score family they
    /// were derived from, so that sorting by e.g. a decoy q-value reuses an
    /// existing xcorr ordering.
    pub fn sort_key(self) -> ScoreType {
        match self {
            ScoreType::Sp => ScoreType::Sp,
            ScoreType::Evalue
            | ScoreType::DecoyEvalueQvalue
            | ScoreType::DecoyEvaluePeptideQvalue
            | ScoreType::DecoyEvaluePep => ScoreType::Evalue,
            ScoreType::Xcorr
            | ScoreType::DecoyXcorrQvalue
            | ScoreType::LogpWeibullXcorr
            | ScoreType::DecoyXcorrPeptideQvalue
            | ScoreType::DecoyXcorrPep
            | ScoreType::DeltaCn => ScoreType::Xcorr,
            ScoreType::LogpBonfWeibullXcorr
            | ScoreType::LogpQvalueWeibullXcorr
            | ScoreType::LogpPeptideQvalueWeibull
            | ScoreType::LogpWeibullPep => ScoreType::LogpBonfWeibullXcorr,
            ScoreType::PercolatorScore => ScoreType::PercolatorScore,
            ScoreType::PercolatorQvalue
            | ScoreType::PercolatorPeptideQvalue
            | ScoreType::PercolatorPep => ScoreType::PercolatorQvalue,
            ScoreType::QrankerScore => ScoreType::QrankerScore,
            ScoreType::QrankerQvalue | ScoreType::QrankerPeptideQvalue | ScoreType::QrankerPep => {
                ScoreType::QrankerQvalue
            }
            ScoreType::BaristaScore => ScoreType::BaristaScore,
            ScoreType::BaristaQvalue | ScoreType::BaristaPeptideQvalue | ScoreType::BaristaPep => {
                ScoreType::BaristaQvalue
            }
        }
    }

    /// Whether a smaller value is better for this (sort key) type.
    pub fn smaller_is_better(self) -> bool {
        matches!(
            self,
            ScoreType::Evalue
                | ScoreType::PercolatorQvalue
                | ScoreType::QrankerQvalue
                | ScoreType::BaristaQvalue
        )
    }

    /// Raw score used to break ties between equal q-values.
    pub fn tie_breaker(self) -> Option<ScoreType> {
        match self {
            ScoreType::PercolatorQvalue => Some(ScoreType::PercolatorScore),
            ScoreType::QrankerQvalue => Some(ScoreType::QrankerScore),
            ScoreType::BaristaQvalue => Some(ScoreType::BaristaScore),
            _ => None,
        }
    }

    /// Where `assign_qvalues` stores the q-value computed from `self`.
    pub fn derived_qvalue_type(self) -> Option<ScoreType> {
        match self {
            ScoreType::Xcorr => Some(ScoreType::DecoyXcorrQvalue),
            ScoreType::DecoyXcorrQvalue => Some(ScoreType::DecoyXcorrPeptideQvalue),
            ScoreType::Evalue => Some(ScoreType::DecoyEvalueQvalue),
            ScoreType::DecoyEvalueQvalue => Some(ScoreType::DecoyEvaluePeptideQvalue),
            ScoreType::LogpBonfWeibullXcorr => Some(ScoreType::LogpQvalueWeibullXcorr),
            ScoreType::LogpQvalueWeibullXcorr => Some(ScoreType::LogpPeptideQvalueWeibull),
            ScoreType::PercolatorScore => Some(ScoreType::PercolatorQvalue),
            ScoreType::PercolatorQvalue => Some(ScoreType::PercolatorPeptideQvalue),
            ScoreType::QrankerScore => Some(ScoreType::QrankerQvalue),
            ScoreType::QrankerQvalue => Some(ScoreType::QrankerPeptideQvalue),
            ScoreType::BaristaScore => Some(ScoreType::BaristaQvalue),
            ScoreType::BaristaQvalue => Some(ScoreType::BaristaPeptideQvalue),
            _ => None,
        }
    }

    /// Where `assign_peps` stores the posterior error probability computed from `self`.
    pub fn derived_pep_type(self) -> Option<ScoreType> {
        match self {
            ScoreType::Xcorr => Some(ScoreType::DecoyXcorrPep),
            ScoreType::Evalue => Some(ScoreType::DecoyEvaluePep),
            ScoreType::LogpBonfWeibullXcorr => Some(ScoreType::LogpWeibullPep),
            ScoreType::PercolatorScore => Some(ScoreType::PercolatorPep),
            ScoreType::QrankerScore => Some(ScoreType::QrankerPep),
            ScoreType::BaristaScore => Some(ScoreType::BaristaPep),
            _ => None,
        }
    }
}

impl std::fmt::Display for ScoreType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Orders two optional scores so that the better one comes first.
///
/// Unscored values always sort after scored ones, whatever the direction.
pub fn compare_scores(a: Option<f64>, b: Option<f64>, smaller_is_better: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => {
            if smaller_is_better {
                a.total_cmp(&b)
            } else {
                b.total_cmp(&a)
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Bit-for-bit equality, the tie rule used when ranking.
pub fn same_score(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.to_bits() == b.to_bits(),
        (None, None) => true,
        _ => false,
    }
}
