use super::MatchCollection;
use crate::errors::{
    DataProcessingError,
    Result,
};
use crate::ml::{
    LabelledScore,
    ScoreMap,
    TargetDecoy,
    assign_qval,
    benjamini_hochberg_map,
    compute_weibull_pvalue,
    estimate_weibull,
    log_pvalue_score,
};
use crate::models::{
    MatchRef,
    ScoreType,
};
use std::io::Write;
use tracing::{
    debug,
    warn,
};

/// A match seen through its primary score and decoy label, for the
/// q-value engine. Matches without a primary score take no part.
struct QvalueEntry<'a> {
    m: &'a MatchRef,
    score: Option<f64>,
    label: TargetDecoy,
    q: f64,
}

impl LabelledScore for QvalueEntry<'_> {
    fn get_score(&self) -> f64 {
        self.score.unwrap_or(f64::NAN)
    }

    fn get_label(&self) -> TargetDecoy {
        self.label
    }

    fn assign_qval(&mut self, q: f64) {
        self.q = q;
    }

    fn get_qval(&self) -> f64 {
        self.q
    }

    fn is_applicable(&self) -> bool {
        self.score.is_some()
    }
}

impl MatchCollection {
    pub fn has_enough_weibull_points(&self) -> bool {
        self.decoy_score_pool.len() >= self.params.min_weibull_points
    }

    /// Fits the null distribution to the decoy score pool and keeps the
    /// parameters for p-value computation.
    ///
    /// Returns false when the pool is too small, in which case p-values
    /// must not be computed for this spectrum and charge.
    pub fn estimate_weibull_parameters_from_pool(&mut self, scan: u32, charge: u8) -> bool {
        if !self.has_enough_weibull_points() {
            warn!(
                "Too few psms ({}) to estimate Weibull parameters for scan {}, charge {}",
                self.decoy_score_pool.len(),
                scan,
                charge
            );
            return false;
        }

        let range = self.params.primary_shift_range;
        let Some(fit) = estimate_weibull(&mut self.decoy_score_pool, &self.params, &range) else {
            return false;
        };
        debug!(
            "Scan {} charge {}: eta {:.4} beta {:.4} shift {:.4} corr {:.4} from {} of {} scores",
            scan,
            charge,
            fit.params.eta,
            fit.params.beta,
            fit.params.shift,
            fit.params.correlation,
            fit.num_tail_samples,
            fit.num_scores
        );
        self.weibull = fit.params;
        true
    }

    /// Stores `-ln(p)` of every primary score under the fitted Weibull,
    /// Bonferroni-corrected by the experiment size when enabled, then
    /// ranks by it.
    ///
    /// With `pvalue_out`, the fit and each raw p-value are also written
    /// there, one per line.
    pub fn compute_p_values(&mut self, mut pvalue_out: Option<&mut dyn Write>) -> Result<()> {
        if !self.is_scored(ScoreType::Xcorr) {
            return Err(DataProcessingError::NotScored {
                score_type: ScoreType::Xcorr,
                context: "p-values need primary scores".to_string(),
            }
            .into());
        }

        let scan = self
            .matches
            .first()
            .map(|m| m.borrow().scan())
            .unwrap_or(0);
        let w = self.weibull;
        debug!(
            "Computing p-values for scan {} charge {} with eta {:.4} beta {:.4} shift {:.4}",
            scan,
            self.charge(),
            w.eta,
            w.beta,
            w.shift
        );

        if let Some(out) = pvalue_out.as_mut() {
            writeln!(
                out,
                "# scan: {} charge: {} candidates: {}",
                scan,
                self.charge(),
                self.experiment_size
            )?;
            writeln!(
                out,
                "# eta: {} beta: {} shift: {} correlation: {}",
                w.eta, w.beta, w.shift, w.correlation
            )?;
        }

        let num_tests = self.experiment_size;
        let apply_bonferroni = self.params.bonferroni_correction;
        for m in self.matches.iter() {
            let Some(xcorr) = m.borrow().required_score(ScoreType::Xcorr) else {
                continue;
            };
            if let Some(out) = pvalue_out.as_mut() {
                writeln!(out, "{}", compute_weibull_pvalue(xcorr, w.eta, w.beta, w.shift))?;
            }
            let logp = log_pvalue_score(xcorr, &w, num_tests, apply_bonferroni);
            m.borrow_mut()
                .set_score(ScoreType::LogpBonfWeibullXcorr, logp);
        }

        self.populate_match_rank(ScoreType::LogpBonfWeibullXcorr);
        self.set_scored(ScoreType::LogpBonfWeibullXcorr, true);
        Ok(())
    }

    /// Target-decoy q-values of the primary score over this (mixed)
    /// collection, stored as the decoy primary q-value.
    pub fn compute_decoy_qvalues(&mut self) -> Result<()> {
        if !self.is_scored(ScoreType::Xcorr) {
            return Err(DataProcessingError::NotScored {
                score_type: ScoreType::Xcorr,
                context: "decoy q-values need primary scores".to_string(),
            }
            .into());
        }
        self.sort(ScoreType::Xcorr);

        let mut entries: Vec<QvalueEntry<'_>> = self
            .matches
            .iter()
            .map(|m| {
                let b = m.borrow();
                QvalueEntry {
                    m,
                    score: b.score(ScoreType::Xcorr),
                    label: if b.is_decoy() {
                        TargetDecoy::Decoy
                    } else {
                        TargetDecoy::Target
                    },
                    q: 1.0,
                }
            })
            .collect();
        assign_qval(&mut entries);

        let mut num_assigned = 0usize;
        for e in entries.iter().filter(|e| e.is_applicable()) {
            e.m.borrow_mut()
                .set_score(ScoreType::DecoyXcorrQvalue, e.get_qval());
            num_assigned += 1;
        }
        debug!(
            "Assigned decoy q-values to {} of {} matches",
            num_assigned,
            entries.len()
        );
        self.set_scored(ScoreType::DecoyXcorrQvalue, true);
        Ok(())
    }

    /// Benjamini-Hochberg q-values of the Weibull p-values, stored as the
    /// Weibull q-value of every top-ranked target.
    ///
    /// Only targets with primary rank 1 (or no primary rank) and a finite
    /// p-value score take part. Returns the number of matches assigned.
    pub fn compute_weibull_qvalues(&mut self) -> Result<usize> {
        let score_type = ScoreType::LogpBonfWeibullXcorr;
        if !self.is_scored(score_type) {
            return Err(DataProcessingError::NotScored {
                score_type,
                context: "Weibull q-values need p-values".to_string(),
            }
            .into());
        }

        let eligible: Vec<(&MatchRef, f64)> = self
            .matches
            .iter()
            .filter_map(|m| {
                let b = m.borrow();
                if b.is_decoy() || b.rank(ScoreType::Xcorr) > 1 {
                    return None;
                }
                b.score(score_type)
                    .filter(|s| s.is_finite())
                    .map(|s| (m, s))
            })
            .collect();
        let logp: Vec<f64> = eligible.iter().map(|(_, s)| *s).collect();
        let map = benjamini_hochberg_map(&logp, self.params.pi_zero);

        for (m, s) in eligible.iter() {
            let q = map.get(*s).ok_or_else(|| DataProcessingError::MissingQValue {
                score: *s,
                context: format!("{} of scan {}", score_type, m.borrow().scan()),
            })?;
            m.borrow_mut()
                .set_score(ScoreType::LogpQvalueWeibullXcorr, q);
        }
        let num_assigned = eligible.len();
        debug!(
            "Assigned Weibull q-values to {} of {} matches",
            num_assigned,
            self.matches.len()
        );
        self.set_scored(ScoreType::LogpQvalueWeibullXcorr, true);
        Ok(num_assigned)
    }

    /// Looks up every match's `score_type` score in `map` and stores the
    /// result as the q-value derived from that type.
    pub fn assign_qvalues(&mut self, map: &ScoreMap, score_type: ScoreType) -> Result<()> {
        let derived = score_type
            .derived_qvalue_type()
            .ok_or(DataProcessingError::NoDerivedScoreType { score_type })?;
        self.assign_from_map(map, score_type, derived)
    }

    /// As [`MatchCollection::assign_qvalues`], storing posterior error
    /// probabilities instead.
    pub fn assign_peps(&mut self, map: &ScoreMap, score_type: ScoreType) -> Result<()> {
        let derived = score_type
            .derived_pep_type()
            .ok_or(DataProcessingError::NoDerivedScoreType { score_type })?;
        self.assign_from_map(map, score_type, derived)
    }

    fn assign_from_map(
        &mut self,
        map: &ScoreMap,
        score_type: ScoreType,
        derived: ScoreType,
    ) -> Result<()> {
        if !self.is_scored(score_type) {
            return Err(DataProcessingError::NotScored {
                score_type,
                context: format!("cannot derive {}", derived),
            }
            .into());
        }
        self.sort(score_type);

        for m in self.matches.iter() {
            let mut m = m.borrow_mut();
            let Some(score) = m.required_score(score_type) else {
                continue;
            };
            let value = map.get(score).ok_or_else(|| DataProcessingError::MissingQValue {
                score,
                context: format!(
                    "{} of scan {} charge {} {}",
                    score_type,
                    m.scan(),
                    m.charge(),
                    m.sequence()
                ),
            })?;
            m.set_score(derived, value);
        }
        self.set_scored(derived, true);
        Ok(())
    }
}
