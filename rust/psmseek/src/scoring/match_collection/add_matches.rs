use super::MatchCollection;
use crate::errors::{
    DataProcessingError,
    Result,
};
use crate::models::{
    Match,
    ScoreType,
    Spectrum,
    ZState,
};
use crate::traits::{
    CandidateSource,
    PsmScorer,
    ScoringInput,
};
use std::rc::Rc;
use tracing::debug;

impl MatchCollection {
    /// Searches one spectrum at one charge against every candidate.
    ///
    /// New matches are scored by the preliminary score (optionally
    /// filtering on it) and always by the primary score, ranked, and
    /// truncated. Matches already scored by an earlier call keep their
    /// scores. Returns how many matches were added. Zero is a valid outcome
    /// and still marks the requested types as scored.
    pub fn add_matches(
        &mut self,
        spectrum: &Rc<Spectrum>,
        z_state: ZState,
        candidates: &mut dyn CandidateSource,
        scorer: &dyn PsmScorer,
        do_sp_scoring: bool,
        filter_by_sp: bool,
    ) -> Result<usize> {
        if !z_state.is_set() {
            return Err(DataProcessingError::MissingInput {
                context: format!(
                    "charge state for spectrum {} is unset, cannot add matches",
                    spectrum.first_scan
                ),
            }
            .into());
        }
        if !self.set_z_state(z_state) {
            return Err(DataProcessingError::ChargeMismatch {
                current: self.charge(),
                requested: z_state.charge(),
            }
            .into());
        }

        let added = self.add_unscored_peptides(spectrum, z_state, candidates)?;
        if added == 0 {
            if do_sp_scoring {
                self.set_scored(ScoreType::Sp, true);
            }
            self.set_scored(ScoreType::Xcorr, true);
            return Ok(0);
        }

        let mut xcorr_max_rank = self.params.psms_per_spectrum_reported;

        if do_sp_scoring {
            self.score_unscored(ScoreType::Sp, scorer, false);
            self.populate_match_rank(ScoreType::Sp);
            self.save_top_sp_match();
            if filter_by_sp {
                let max_rank = self.params.max_rank_preliminary;
                self.truncate(max_rank + 1, ScoreType::Sp);
                xcorr_max_rank = max_rank;
            }
        }

        let store = self.params.store_primary_scores;
        self.score_unscored(ScoreType::Xcorr, scorer, store);
        self.populate_match_rank(ScoreType::Xcorr);
        self.truncate(xcorr_max_rank + 1, ScoreType::Xcorr);

        debug!(
            "Scan {} charge {}: added {}, kept {} of {} considered",
            spectrum.first_scan,
            z_state.charge(),
            added,
            self.matches.len(),
            self.experiment_size
        );
        Ok(added)
    }

    /// Scores every candidate by the primary score into the decoy score
    /// pool, keeping neither the candidates nor any match.
    pub fn add_decoy_scores(
        &mut self,
        spectrum: &Spectrum,
        z_state: ZState,
        candidates: &mut dyn CandidateSource,
        scorer: &dyn PsmScorer,
    ) -> usize {
        let mut count = 0;
        while candidates.has_next() {
            let Some(peptide) = candidates.next_candidate() else {
                break;
            };
            let sequence = peptide.display_sequence(peptide.decoy.needs_shuffle());
            let input = ScoringInput {
                sequence: &sequence,
                peptide: &peptide,
                charge: z_state.charge(),
            };
            self.decoy_score_pool
                .push(scorer.score(ScoreType::Xcorr, spectrum, input));
            count += 1;
        }
        debug!(
            "Added {} null scores for scan {}, pool holds {}",
            count,
            spectrum.first_scan,
            self.decoy_score_pool.len()
        );
        count
    }

    fn add_unscored_peptides(
        &mut self,
        spectrum: &Rc<Spectrum>,
        z_state: ZState,
        candidates: &mut dyn CandidateSource,
    ) -> Result<usize> {
        let start = self.matches.len();
        while candidates.has_next() {
            let Some(peptide) = candidates.next_candidate() else {
                break;
            };
            self.check_capacity(1, "too many candidates for one spectrum")?;
            let m = Match::new(peptide, spectrum.clone(), z_state, self.is_decoy);
            self.matches.push(m.into_ref());
        }
        let added = self.matches.len() - start;
        if added == 0 {
            return Ok(0);
        }

        self.experiment_size += added;
        self.last_sorted = None;

        let target_size = self.target_experiment_size();
        let ln_size = if target_size > 0 {
            (target_size as f64).ln()
        } else {
            0.0
        };
        for m in self.matches.iter() {
            m.borrow_mut().set_ln_experiment_size(ln_size);
        }
        Ok(added)
    }

    /// Scores every match not yet scored for `score_type`.
    fn score_unscored(&mut self, score_type: ScoreType, scorer: &dyn PsmScorer, store_in_pool: bool) {
        let mut num_scored = 0usize;
        for m in self.matches.iter() {
            if m.borrow().score(score_type).is_some() {
                continue;
            }
            let (score, ions) = {
                let m = m.borrow();
                let input = ScoringInput {
                    sequence: m.sequence(),
                    peptide: m.peptide(),
                    charge: m.charge(),
                };
                let score = scorer.score(score_type, m.spectrum(), input);
                let ions = if score_type == ScoreType::Sp {
                    scorer.matched_ion_counts(m.spectrum(), input)
                } else {
                    None
                };
                (score, ions)
            };

            let mut m = m.borrow_mut();
            m.set_score(score_type, score);
            if let Some((matched, possible)) = ions {
                m.set_by_ion_info(matched, possible);
            }
            if store_in_pool {
                self.decoy_score_pool.push(score);
            }
            num_scored += 1;
        }
        debug!("Scored {} matches by {}", num_scored, score_type);
        self.set_scored(score_type, true);
        self.last_sorted = None;
    }

    /// Keeps the best preliminary match around, replacing it only once it
    /// has lost the top preliminary rank.
    fn save_top_sp_match(&mut self) {
        let replace = match &self.top_scoring_sp {
            None => true,
            Some(m) => m.borrow().rank(ScoreType::Sp) > 1,
        };
        if replace {
            self.top_scoring_sp = self.matches.first().cloned();
        }
    }
}
