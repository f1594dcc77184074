use super::decoy::DecoyMarking;
use super::peptide::{
    MassFormat,
    Peptide,
};
use super::score_type::{
    NUM_SCORE_TYPES,
    ScoreType,
    compare_scores,
};
use super::spectrum::{
    Spectrum,
    ZState,
};
use std::cell::{
    OnceCell,
    RefCell,
};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{
    Path,
    PathBuf,
};
use std::rc::Rc;
use tracing::warn;

/// Shared handle to a match. A match lives as long as any collection (or
/// the retained top-preliminary slot) still holds one of these.
pub type MatchRef = Rc<RefCell<Match>>;

/// One peptide-spectrum match.
#[derive(Debug, Clone)]
pub struct Match {
    peptide: Peptide,
    spectrum: Rc<Spectrum>,
    z_state: ZState,
    is_decoy: bool,
    post_process: bool,

    scores: [Option<f64>; NUM_SCORE_TYPES],
    ranks: [u32; NUM_SCORE_TYPES],
    custom_scores: BTreeMap<String, f64>,

    delta_cn: f64,
    delta_lcn: f64,
    ln_experiment_size: f64,
    ln_decoy_experiment_size: f64,

    by_ion_matched: u32,
    by_ion_possible: u32,
    by_ion_fraction_matched: f64,

    num_target_matches: u32,
    num_decoy_matches: u32,
    cleavage_type: Option<String>,
    file_index: Option<usize>,

    sequence: OnceCell<String>,
    mod_sequence_symbols: OnceCell<String>,
}

impl Match {
    pub fn new(peptide: Peptide, spectrum: Rc<Spectrum>, z_state: ZState, is_decoy: bool) -> Self {
        Self {
            peptide,
            spectrum,
            z_state,
            is_decoy,
            post_process: false,
            scores: [None; NUM_SCORE_TYPES],
            ranks: [0; NUM_SCORE_TYPES],
            custom_scores: BTreeMap::new(),
            delta_cn: 0.0,
            delta_lcn: 0.0,
            ln_experiment_size: 0.0,
            ln_decoy_experiment_size: 0.0,
            by_ion_matched: 0,
            by_ion_possible: 0,
            by_ion_fraction_matched: 0.0,
            num_target_matches: 0,
            num_decoy_matches: 0,
            cleavage_type: None,
            file_index: None,
            sequence: OnceCell::new(),
            mod_sequence_symbols: OnceCell::new(),
        }
    }

    /// A match rebuilt from a serialized PSM row. It owns its spectrum.
    pub fn new_post_process(
        peptide: Peptide,
        spectrum: Spectrum,
        z_state: ZState,
        is_decoy: bool,
    ) -> Self {
        let mut out = Self::new(peptide, Rc::new(spectrum), z_state, is_decoy);
        out.post_process = true;
        out
    }

    pub fn into_ref(self) -> MatchRef {
        Rc::new(RefCell::new(self))
    }

    pub fn peptide(&self) -> &Peptide {
        &self.peptide
    }

    pub(crate) fn peptide_mut(&mut self) -> &mut Peptide {
        &mut self.peptide
    }

    pub fn spectrum(&self) -> &Spectrum {
        &self.spectrum
    }

    pub fn spectrum_rc(&self) -> &Rc<Spectrum> {
        &self.spectrum
    }

    pub fn z_state(&self) -> ZState {
        self.z_state
    }

    pub fn set_z_state(&mut self, z_state: ZState) {
        self.z_state = z_state;
    }

    pub fn charge(&self) -> u8 {
        self.z_state.charge()
    }

    pub fn scan(&self) -> u32 {
        self.spectrum.first_scan
    }

    pub fn is_decoy(&self) -> bool {
        self.is_decoy
    }

    pub fn is_post_process(&self) -> bool {
        self.post_process
    }

    pub fn score(&self, score_type: ScoreType) -> Option<f64> {
        self.scores[score_type.index()]
    }

    /// Like [`Match::score`] but warns when the score has not been set.
    pub fn required_score(&self, score_type: ScoreType) -> Option<f64> {
        let out = self.score(score_type);
        if out.is_none() {
            warn!(
                "PSM spectrum {} charge {} sequence {} was not scored for {}",
                self.scan(),
                self.charge(),
                self.peptide.raw_sequence(),
                score_type
            );
        }
        out
    }

    pub fn set_score(&mut self, score_type: ScoreType, value: f64) {
        self.scores[score_type.index()] = Some(value);
    }

    pub fn rank(&self, score_type: ScoreType) -> u32 {
        self.ranks[score_type.index()]
    }

    pub fn set_rank(&mut self, score_type: ScoreType, rank: u32) {
        self.ranks[score_type.index()] = rank;
    }

    pub fn set_custom_score(&mut self, name: impl Into<String>, value: f64) {
        self.custom_scores.insert(name.into(), value);
    }

    pub fn custom_score(&self, name: &str) -> Option<f64> {
        self.custom_scores.get(name).copied()
    }

    pub fn custom_score_names(&self) -> Vec<String> {
        self.custom_scores.keys().cloned().collect()
    }

    /// Plain sequence as it should be displayed and scored. Decoys that were
    /// not shuffled upstream get shuffled here, once.
    pub fn sequence(&self) -> &str {
        self.sequence
            .get_or_init(|| self.peptide.display_sequence(self.shuffles()))
    }

    pub fn modified_sequence_with_symbols(&self) -> &str {
        self.mod_sequence_symbols
            .get_or_init(|| self.peptide.sequence_with_symbols(self.shuffles()))
    }

    pub fn modified_sequence_with_masses(&self, format: MassFormat) -> String {
        self.peptide.sequence_with_masses(self.shuffles(), format)
    }

    /// `X.SEQ.Y` with the flanking residues of the first protein source.
    pub fn sequence_sqt(&self, format: MassFormat) -> String {
        format!(
            "{}.{}.{}",
            self.peptide.n_term_flank(),
            self.modified_sequence_with_masses(format),
            self.peptide.c_term_flank()
        )
    }

    fn shuffles(&self) -> bool {
        self.is_decoy && self.peptide.decoy == DecoyMarking::PendingDecoy
    }

    pub fn delta_cn(&self) -> f64 {
        self.delta_cn
    }

    pub fn set_delta_cn(&mut self, x: f64) {
        self.delta_cn = x;
    }

    pub fn delta_lcn(&self) -> f64 {
        self.delta_lcn
    }

    pub fn set_delta_lcn(&mut self, x: f64) {
        self.delta_lcn = x;
    }

    pub fn ln_experiment_size(&self) -> f64 {
        self.ln_experiment_size
    }

    pub fn set_ln_experiment_size(&mut self, x: f64) {
        self.ln_experiment_size = x;
    }

    pub fn ln_decoy_experiment_size(&self) -> f64 {
        self.ln_decoy_experiment_size
    }

    pub fn set_ln_decoy_experiment_size(&mut self, x: f64) {
        self.ln_decoy_experiment_size = x;
    }

    pub fn set_by_ion_info(&mut self, matched: u32, possible: u32) {
        self.by_ion_matched = matched;
        self.by_ion_possible = possible;
        self.by_ion_fraction_matched = if possible == 0 {
            0.0
        } else {
            matched as f64 / possible as f64
        };
    }

    pub fn by_ion_matched(&self) -> u32 {
        self.by_ion_matched
    }

    pub fn by_ion_possible(&self) -> u32 {
        self.by_ion_possible
    }

    pub fn by_ion_fraction_matched(&self) -> f64 {
        self.by_ion_fraction_matched
    }

    pub fn num_target_matches(&self) -> u32 {
        self.num_target_matches
    }

    pub fn num_decoy_matches(&self) -> u32 {
        self.num_decoy_matches
    }

    pub fn set_match_counts(&mut self, targets: u32, decoys: u32) {
        self.num_target_matches = targets;
        self.num_decoy_matches = decoys;
    }

    pub fn cleavage_type(&self) -> Option<&str> {
        self.cleavage_type.as_deref()
    }

    pub fn set_cleavage_type(&mut self, x: Option<String>) {
        self.cleavage_type = x;
    }

    pub fn file_index(&self) -> Option<usize> {
        self.file_index
    }

    pub fn set_file_index(&mut self, idx: usize) {
        self.file_index = Some(idx);
    }

    pub fn set_file_path(&mut self, registry: &mut FileRegistry, path: &Path) -> usize {
        let idx = registry.find_or_insert(path);
        self.file_index = Some(idx);
        idx
    }
}

/// Orders matches best-first by `sort_key`, with the q-value tie-breakers.
/// `sort_key` must already be the canonical key (see [`ScoreType::sort_key`]).
pub fn compare_by(a: &Match, b: &Match, sort_key: ScoreType) -> Ordering {
    let primary = compare_scores(
        a.score(sort_key),
        b.score(sort_key),
        sort_key.smaller_is_better(),
    );
    if primary != Ordering::Equal {
        return primary;
    }
    match sort_key.tie_breaker() {
        Some(tb) => compare_scores(a.score(tb), b.score(tb), tb.smaller_is_better()),
        None => Ordering::Equal,
    }
}

/// Scan ascending, then charge ascending.
pub fn compare_spectrum(a: &Match, b: &Match) -> Ordering {
    a.scan()
        .cmp(&b.scan())
        .then_with(|| a.charge().cmp(&b.charge()))
}

/// Source files that post-processed matches were read from.
#[derive(Debug, Clone, Default)]
pub struct FileRegistry {
    paths: Vec<PathBuf>,
}

impl FileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, path: &Path) -> Option<usize> {
        self.paths.iter().position(|p| p == path)
    }

    pub fn find_or_insert(&mut self, path: &Path) -> usize {
        match self.find(path) {
            Some(idx) => idx,
            None => {
                self.paths.push(path.to_path_buf());
                self.paths.len() - 1
            }
        }
    }

    pub fn path(&self, idx: usize) -> Option<&Path> {
        self.paths.get(idx).map(|p| p.as_path())
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
