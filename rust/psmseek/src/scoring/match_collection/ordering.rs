use super::{
    MatchCollection,
    SortOrder,
};
use crate::models::{
    ScoreType,
    compare_by,
    compare_spectrum,
    same_score,
};
use std::rc::Rc;
use tracing::{
    debug,
    warn,
};

impl MatchCollection {
    /// Sorts best first by the canonical key of `score_type`.
    ///
    /// Does nothing when already sorted by that key.
    ///
    /// # Panics
    /// If a match iterator is open.
    pub fn sort(&mut self, score_type: ScoreType) {
        self.assert_unlocked("sort");
        let key = score_type.sort_key();
        if self.last_sorted == Some(SortOrder::Score(key)) {
            return;
        }
        self.matches
            .sort_by(|a, b| compare_by(&a.borrow(), &b.borrow(), key));
        self.last_sorted = Some(SortOrder::Score(key));
    }

    /// Sorts by scan, then charge, then best first by `score_type`, so that
    /// per-spectrum logic keeps working on merged collections.
    ///
    /// # Panics
    /// If a match iterator is open.
    pub fn spectrum_sort(&mut self, score_type: ScoreType) {
        self.assert_unlocked("sort");
        let key = score_type.sort_key();
        if self.last_sorted == Some(SortOrder::Spectrum(key)) {
            return;
        }
        self.matches.sort_by(|a, b| {
            let a = a.borrow();
            let b = b.borrow();
            compare_spectrum(&a, &b).then_with(|| compare_by(&a, &b, key))
        });
        self.last_sorted = Some(SortOrder::Spectrum(key));
    }

    /// Dense ranks for `score_type`: ties share a rank and the next
    /// distinct score gets the tied rank plus one.
    pub fn populate_match_rank(&mut self, score_type: ScoreType) {
        self.sort(score_type);

        let mut rank = 0u32;
        let mut prev: Option<Option<f64>> = None;
        for m in self.matches.iter() {
            let mut m = m.borrow_mut();
            let score = m.required_score(score_type);
            match prev {
                Some(p) if same_score(p, score) => {}
                _ => rank += 1,
            }
            m.set_rank(score_type, rank);
            prev = Some(score);
        }
        debug!(
            "Ranked {} matches by {}, {} distinct scores",
            self.matches.len(),
            score_type,
            rank
        );
    }

    /// Drops every match ranked worse than `max_rank` for `score_type`,
    /// walking back from the tail.
    ///
    /// # Panics
    /// If a match iterator is open.
    pub fn truncate(&mut self, max_rank: u32, score_type: ScoreType) {
        self.assert_unlocked("truncate");
        if self.matches.is_empty() {
            return;
        }
        self.sort(score_type);

        let keep = self
            .matches
            .iter()
            .rposition(|m| m.borrow().rank(score_type) <= max_rank)
            .map_or(0, |i| i + 1);
        if keep < self.matches.len() {
            debug!(
                "Truncating {} matches to {} (max {} rank {})",
                self.matches.len(),
                keep,
                score_type,
                max_rank
            );
            self.matches.truncate(keep);
        }
    }

    /// Merges score-tied matches with identical modified sequences into
    /// the first of them, extending its protein sources.
    ///
    /// Returns how many matches were removed. The experiment size shrinks
    /// by the same amount.
    ///
    /// # Panics
    /// If a match iterator is open, or a non-empty collection is not sorted
    /// by the preliminary or primary score.
    pub fn collapse_redundant_matches(&mut self) -> usize {
        self.assert_unlocked("collapse");
        if self.matches.is_empty() {
            return 0;
        }
        let key = match self.last_sorted {
            Some(SortOrder::Score(t)) if t == ScoreType::Sp || t == ScoreType::Xcorr => t,
            other => panic!(
                "Match collection must be sorted by {} or {} before collapsing, found {:?}",
                ScoreType::Sp,
                ScoreType::Xcorr,
                other
            ),
        };

        let n = self.matches.len();
        let mut keep = vec![true; n];
        let mut run_start = 0;
        while run_start < n {
            let score = self.matches[run_start].borrow().score(key);
            let mut run_end = run_start + 1;
            while run_end < n && same_score(self.matches[run_end].borrow().score(key), score) {
                run_end += 1;
            }

            for i in run_start..run_end {
                if !keep[i] {
                    continue;
                }
                for j in (i + 1)..run_end {
                    if !keep[j] {
                        continue;
                    }
                    let same_sequence = self.matches[i].borrow().modified_sequence_with_symbols()
                        == self.matches[j].borrow().modified_sequence_with_symbols();
                    if !same_sequence {
                        continue;
                    }
                    if !Rc::ptr_eq(&self.matches[i], &self.matches[j]) {
                        let other = self.matches[j].borrow();
                        self.matches[i]
                            .borrow_mut()
                            .peptide_mut()
                            .merge_sources(other.peptide());
                    }
                    keep[j] = false;
                }
            }
            run_start = run_end;
        }

        let mut idx = 0;
        self.matches.retain(|_| {
            let k = keep[idx];
            idx += 1;
            k
        });
        let removed = n - self.matches.len();
        if removed > 0 {
            debug!("Collapsed {} redundant matches", removed);
        }
        self.experiment_size = self.experiment_size.saturating_sub(removed);
        removed
    }

    /// Fills delta cn and delta lcn of every match from primary scores.
    ///
    /// Returns false (and leaves the matches alone) when the primary score
    /// is missing or delta cn is already known.
    pub fn calculate_delta_cn(&mut self) -> bool {
        if self.is_scored(ScoreType::DeltaCn) {
            return false;
        }
        if !self.is_scored(ScoreType::Xcorr) {
            warn!("Delta cn not calculated because match collection not scored for xcorr");
            return false;
        }

        self.sort(ScoreType::Xcorr);
        let scores = self.extract_scores(ScoreType::Xcorr);
        let Some(last) = scores.last().copied() else {
            self.set_scored(ScoreType::DeltaCn, true);
            return true;
        };

        let finite_or_zero = |x: f64| if x.is_finite() { x } else { 0.0 };
        for (idx, m) in self.matches.iter().enumerate() {
            let cur = scores[idx];
            let next = scores.get(idx + 1).copied().unwrap_or(cur);
            let denom = cur.max(1.0);
            let mut m = m.borrow_mut();
            m.set_delta_cn(finite_or_zero((cur - next) / denom));
            m.set_delta_lcn(finite_or_zero((cur - last) / denom));
        }

        self.delta_cn = self.matches[0].borrow().delta_cn();
        self.set_scored(ScoreType::DeltaCn, true);
        true
    }

    /// Delta cn of the best match. Zero (with an error log) when the
    /// primary score has not been computed.
    pub fn delta_cn(&self) -> f64 {
        if !self.is_scored(ScoreType::Xcorr) {
            tracing::error!("Cannot get delta cn of a match collection not scored for xcorr");
            return 0.0;
        }
        self.delta_cn
    }
}
