//! The match collection: an ordered, capacity-bounded set of PSMs for one
//! spectrum and charge (or, when post-processing, a batch read from file),
//! plus the bookkeeping needed to rank, truncate and calibrate it.

mod add_matches;
mod iter;
mod ordering;
mod post_process;
mod statistics;

pub use iter::{
    MatchGuard,
    MatchIterator,
};

use crate::config::SearchParameters;
use crate::errors::{
    DataProcessingError,
    Result,
};
use crate::ml::WeibullParams;
use crate::models::{
    FileRegistry,
    MatchRef,
    NUM_SCORE_TYPES,
    ScoreType,
    ZState,
};
use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;
use tracing::{
    debug,
    warn,
};

/// Which order the matches are currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SortOrder {
    /// Best first by the canonical key of a score type.
    Score(ScoreType),
    /// Grouped by scan and charge, best first by the key within a group.
    Spectrum(ScoreType),
}

#[derive(Debug)]
pub struct MatchCollection {
    params: Rc<SearchParameters>,
    matches: Vec<MatchRef>,
    scored_type: [bool; NUM_SCORE_TYPES],
    last_sorted: Option<SortOrder>,
    iterator_lock: Rc<Cell<usize>>,
    is_decoy: bool,
    post_process: bool,
    z_state: ZState,
    experiment_size: usize,
    target_experiment_size: usize,
    decoy_score_pool: Vec<f64>,
    weibull: WeibullParams,
    top_scoring_sp: Option<MatchRef>,
    has_distinct_matches: bool,
    delta_cn: f64,
}

impl MatchCollection {
    pub fn new(params: Rc<SearchParameters>, is_decoy: bool) -> Self {
        Self {
            params,
            matches: Vec::new(),
            scored_type: [false; NUM_SCORE_TYPES],
            last_sorted: None,
            iterator_lock: Rc::new(Cell::new(0)),
            is_decoy,
            post_process: false,
            z_state: ZState::default(),
            experiment_size: 0,
            target_experiment_size: 0,
            decoy_score_pool: Vec::new(),
            weibull: WeibullParams::default(),
            top_scoring_sp: None,
            has_distinct_matches: false,
            delta_cn: 0.0,
        }
    }

    /// An empty collection to be filled from serialized PSMs.
    pub fn new_post_process(params: Rc<SearchParameters>) -> Self {
        let mut out = Self::new(params, false);
        out.post_process = true;
        out
    }

    pub fn params(&self) -> &SearchParameters {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&MatchRef> {
        self.matches.get(idx)
    }

    pub fn is_decoy(&self) -> bool {
        self.is_decoy
    }

    pub fn is_post_process(&self) -> bool {
        self.post_process
    }

    pub fn z_state(&self) -> ZState {
        self.z_state
    }

    pub fn charge(&self) -> u8 {
        self.z_state.charge()
    }

    /// Sets the charge state. Only allowed while it is unset or unchanged.
    pub fn set_z_state(&mut self, z_state: ZState) -> bool {
        if self.charge() == 0 || self.charge() == z_state.charge() {
            self.z_state = z_state;
            true
        } else {
            warn!(
                "Cannot change the charge state of a match collection from {} to {} once it has been set",
                self.charge(),
                z_state.charge()
            );
            false
        }
    }

    /// Candidates considered before any truncation.
    pub fn experiment_size(&self) -> usize {
        self.experiment_size
    }

    pub fn set_experiment_size(&mut self, size: usize) {
        self.experiment_size = size;
    }

    /// Target candidates considered for this spectrum. For a target
    /// collection (or a decoy one that was never told) this is the
    /// experiment size.
    pub fn target_experiment_size(&self) -> usize {
        if self.is_decoy && self.target_experiment_size > 0 {
            self.target_experiment_size
        } else {
            self.experiment_size
        }
    }

    pub fn set_target_experiment_size(&mut self, size: usize) {
        self.target_experiment_size = size;
    }

    pub fn is_scored(&self, score_type: ScoreType) -> bool {
        self.scored_type[score_type.index()]
    }

    pub(crate) fn set_scored(&mut self, score_type: ScoreType, value: bool) {
        self.scored_type[score_type.index()] = value;
    }

    /// Marks the collection as scored for `score_type` without scoring.
    pub fn force_scored_by(&mut self, score_type: ScoreType) {
        self.set_scored(score_type, true);
    }

    pub fn scored_types(&self) -> Vec<ScoreType> {
        ScoreType::ALL
            .iter()
            .copied()
            .filter(|t| self.is_scored(*t))
            .collect()
    }

    /// The canonical score type the matches are currently sorted by, if
    /// they are sorted by score alone.
    pub fn last_sorted_by(&self) -> Option<ScoreType> {
        match self.last_sorted {
            Some(SortOrder::Score(t)) => Some(t),
            _ => None,
        }
    }

    pub fn is_iterator_locked(&self) -> bool {
        self.iterator_lock.get() > 0
    }

    pub(crate) fn assert_unlocked(&self, operation: &str) {
        assert!(
            !self.is_iterator_locked(),
            "Cannot {} a match collection while a match iterator is open",
            operation
        );
    }

    pub fn weibull(&self) -> WeibullParams {
        self.weibull
    }

    pub fn set_weibull(&mut self, params: WeibullParams) {
        self.weibull = params;
    }

    pub fn decoy_score_pool(&self) -> &[f64] {
        &self.decoy_score_pool
    }

    /// The best match by preliminary score, kept even if truncation by the
    /// primary score dropped it.
    pub fn top_scoring_sp(&self) -> Option<&MatchRef> {
        self.top_scoring_sp.as_ref()
    }

    pub fn has_distinct_matches(&self) -> bool {
        self.has_distinct_matches
    }

    pub fn set_has_distinct_matches(&mut self, distinct: bool) {
        self.has_distinct_matches = distinct;
    }

    /// Names of the custom scores carried by the first match.
    pub fn custom_score_names(&self) -> Vec<String> {
        self.matches
            .first()
            .map(|m| m.borrow().custom_score_names())
            .unwrap_or_default()
    }

    fn check_capacity(&self, additional: usize, context: &str) -> Result<()> {
        let capacity = self.params.match_capacity;
        if self.matches.len() + additional > capacity {
            return Err(DataProcessingError::CapacityExceeded {
                capacity,
                context: format!(
                    "{} (holding {}, adding {})",
                    context,
                    self.matches.len(),
                    additional
                ),
            }
            .into());
        }
        Ok(())
    }

    /// Shares `m` into this collection.
    pub fn add_match(&mut self, m: MatchRef) -> Result<()> {
        self.check_capacity(1, "cannot add to match collection")?;
        self.matches.push(m);
        self.last_sorted = None;
        Ok(())
    }

    /// Points every match at `path` in `registry`. None for an empty
    /// collection.
    pub fn set_file_path(&mut self, registry: &mut FileRegistry, path: &Path) -> Option<usize> {
        if self.matches.is_empty() {
            warn!("No matches in {} to set the file path of", path.display());
            return None;
        }
        let idx = registry.find_or_insert(path);
        for m in self.matches.iter() {
            m.borrow_mut().set_file_index(idx);
        }
        Some(idx)
    }

    /// Moves every match of `source` into `dest`, sharing them.
    ///
    /// The first merge into an empty `dest` adopts the scored types of
    /// `source`; later merges require them to be identical.
    pub fn merge(source: &MatchCollection, dest: &mut MatchCollection) -> Result<usize> {
        if dest.matches.is_empty() {
            dest.scored_type = source.scored_type;
        } else {
            for t in ScoreType::ALL {
                if dest.is_scored(t) != source.is_scored(t) {
                    return Err(DataProcessingError::ScoredTypeMismatch {
                        score_type: t,
                        context: format!(
                            "adding matches{} scored for {} to matches{} scored for it",
                            if source.is_scored(t) { "" } else { " not" },
                            t,
                            if dest.is_scored(t) { "" } else { " not" },
                        ),
                    }
                    .into());
                }
            }
        }

        dest.check_capacity(source.len(), "cannot merge match collections")?;
        debug!(
            "Merging {} matches into a collection of {}",
            source.len(),
            dest.len()
        );

        dest.matches.extend(source.matches.iter().cloned());

        if dest.target_experiment_size == 0 {
            dest.target_experiment_size = dest.target_experiment_size();
        }
        dest.experiment_size += source.experiment_size;
        dest.target_experiment_size += source.target_experiment_size();
        dest.last_sorted = None;
        Ok(source.len())
    }

    /// A collection sharing up to `count` matches drawn with replacement.
    ///
    /// Asking for at least as many matches as there are gives a copy
    /// sharing every match.
    pub fn random_sample(&self, count: usize, seed: u64) -> MatchCollection {
        let mut out = MatchCollection::new(self.params.clone(), self.is_decoy);
        out.post_process = self.post_process;
        out.z_state = self.z_state;
        out.experiment_size = self.experiment_size;
        out.target_experiment_size = self.target_experiment_size;
        out.scored_type = self.scored_type;
        out.weibull = self.weibull;

        if count >= self.matches.len() {
            out.matches = self.matches.clone();
            out.last_sorted = self.last_sorted;
            return out;
        }

        let mut rng = Lcg::new(seed);
        out.matches = (0..count)
            .map(|_| self.matches[rng.next_index(self.matches.len())].clone())
            .collect();
        out
    }

    /// Writes externally computed `scores` onto the matches in their
    /// current order, then ranks by `score_type`.
    ///
    /// With `preserve_order` the original order (and sort state) is restored
    /// after ranking.
    pub fn fill_result(&mut self, scores: &[f64], score_type: ScoreType, preserve_order: bool) {
        assert_eq!(
            scores.len(),
            self.matches.len(),
            "One score is needed per match"
        );
        for (m, s) in self.matches.iter().zip(scores.iter()) {
            m.borrow_mut().set_score(score_type, *s);
        }

        let saved = if preserve_order {
            Some((self.matches.clone(), self.last_sorted))
        } else {
            None
        };
        // The order changed under the sort state.
        if self.last_sorted.is_some() {
            self.last_sorted = None;
        }

        self.populate_match_rank(score_type);

        if let Some((matches, last_sorted)) = saved {
            self.matches = matches;
            self.last_sorted = last_sorted;
        }
        self.set_scored(score_type, true);
    }

    /// Scores of one type in the current order. Unscored matches give NaN.
    pub fn extract_scores(&self, score_type: ScoreType) -> Vec<f64> {
        self.matches
            .iter()
            .map(|m| m.borrow().score(score_type).unwrap_or(f64::NAN))
            .collect()
    }

    /// Copies the Weibull fit, no check that one was made.
    pub fn transfer_weibull(from: &MatchCollection, to: &mut MatchCollection) {
        to.weibull = from.weibull;
    }
}

/// Small seeded generator so that sampling is reproducible.
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed ^ 0x5DEE_CE66_D)
    }

    fn next_u64(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0
    }

    fn next_index(&mut self, len: usize) -> usize {
        ((self.next_u64() >> 33) % len as u64) as usize
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_set_z_state_only_once() {
        let mut mc = MatchCollection::new(params(), false);
        assert!(mc.set_z_state(ZState::new(2, 1000.0)));
        assert!(mc.set_z_state(ZState::new(2, 1000.0)));
        assert!(!mc.set_z_state(ZState::new(3, 1500.0)));
        assert_eq!(mc.charge(), 2);
    }

    #[test]
    fn test_capacity_boundary() {
        let params = Rc::new(SearchParameters {
            match_capacity: 3,
            ..SearchParameters::default()
        });
        let mut mc = MatchCollection::new(params, false);
        for i in 0..3 {
            mc.add_match(scored_match("PEPK", ScoreType::Xcorr, i as f64))
                .unwrap();
        }
        let err = mc
            .add_match(scored_match("PEPK", ScoreType::Xcorr, 9.0))
            .unwrap_err();
        assert!(matches!(
            err,
            crate::errors::PsmSeekError::DataProcessingError(
                DataProcessingError::CapacityExceeded { capacity: 3, .. }
            )
        ));
        assert_eq!(mc.len(), 3);
    }

    #[test]
    fn test_merge_shares_matches_and_sums_sizes() {
        let mut a = collection_with(ScoreType::Xcorr, &[1.0, 2.0]);
        a.set_experiment_size(10);
        let mut b = MatchCollection::new(params(), false);
        MatchCollection::merge(&a, &mut b).unwrap();
        MatchCollection::merge(&a, &mut b).unwrap();
        assert_eq!(b.len(), 4);
        assert_eq!(b.experiment_size(), 20);
        assert!(b.is_scored(ScoreType::Xcorr));
        assert_eq!(Rc::strong_count(a.get(0).unwrap()), 3);
    }

    #[test]
    fn test_merge_scored_type_mismatch() {
        let mut src = collection_with(ScoreType::Sp, &[1.0]);
        src.force_scored_by(ScoreType::Sp);
        let mut dest = collection_with(ScoreType::Sp, &[2.0]);
        dest.force_scored_by(ScoreType::Xcorr);
        let err = MatchCollection::merge(&src, &mut dest).unwrap_err();
        assert!(matches!(
            err,
            crate::errors::PsmSeekError::DataProcessingError(
                DataProcessingError::ScoredTypeMismatch {
                    score_type: ScoreType::Xcorr,
                    ..
                }
            )
        ));
        assert_eq!(dest.len(), 1);
    }

    #[test]
    fn test_random_sample_is_seeded() {
        let mc = collection_with(ScoreType::Xcorr, &[1.0, 2.0, 3.0, 4.0, 5.0]);
        let a = mc.random_sample(3, 7);
        let b = mc.random_sample(3, 7);
        assert_eq!(a.len(), 3);
        assert_eq!(
            a.extract_scores(ScoreType::Xcorr),
            b.extract_scores(ScoreType::Xcorr)
        );
        assert!(a.is_scored(ScoreType::Xcorr));

        let all = mc.random_sample(10, 7);
        assert_eq!(all.len(), 5);
    }

    #[test]
    fn test_fill_result_preserves_order() {
        let mut mc = collection_with(ScoreType::Sp, &[1.0, 2.0, 3.0]);
        mc.fill_result(&[0.5, 0.9, 0.1], ScoreType::PercolatorScore, true);
        assert_eq!(mc.extract_scores(ScoreType::PercolatorScore), vec![0.5, 0.9, 0.1]);
        let ranks: Vec<u32> = (0..3)
            .map(|i| mc.get(i).unwrap().borrow().rank(ScoreType::PercolatorScore))
            .collect();
        assert_eq!(ranks, vec![2, 1, 3]);
        assert!(mc.is_scored(ScoreType::PercolatorScore));
    }

    #[test]
    fn test_transfer_weibull() {
        let mut from = MatchCollection::new(params(), false);
        from.set_weibull(WeibullParams {
            eta: 1.0,
            beta: 2.0,
            shift: 0.5,
            correlation: 0.99,
        });
        let mut to = MatchCollection::new(params(), true);
        MatchCollection::transfer_weibull(&from, &mut to);
        assert_eq!(to.weibull(), from.weibull());
    }

    #[test]
    fn test_target_experiment_size_fallback() {
        let mut decoys = MatchCollection::new(params(), true);
        decoys.set_experiment_size(50);
        assert_eq!(decoys.target_experiment_size(), 50);
        decoys.set_target_experiment_size(80);
        assert_eq!(decoys.target_experiment_size(), 80);

        let mut targets = MatchCollection::new(params(), false);
        targets.set_experiment_size(30);
        targets.set_target_experiment_size(99);
        assert_eq!(targets.target_experiment_size(), 30);
    }
}
