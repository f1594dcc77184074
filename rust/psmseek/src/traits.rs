//! Contracts for the collaborators a match collection consumes but does not
//! implement: where candidate peptides come from and how they get scored.

use crate::models::{
    Peptide,
    ScoreType,
    Spectrum,
};
use std::iter::Peekable;

/// A single-pass, non-restartable supply of candidate peptides.
///
/// Ownership of each returned peptide moves to the caller. Any iterator of
/// peptides can be used through [`IterCandidates`].
pub trait CandidateSource {
    fn has_next(&mut self) -> bool;
    fn next_candidate(&mut self) -> Option<Peptide>;
}

/// Adapts an iterator of peptides into a [`CandidateSource`].
pub struct IterCandidates<I: Iterator<Item = Peptide>> {
    inner: Peekable<I>,
}

impl<I: Iterator<Item = Peptide>> IterCandidates<I> {
    pub fn new(inner: impl IntoIterator<IntoIter = I, Item = Peptide>) -> Self {
        Self {
            inner: inner.into_iter().peekable(),
        }
    }
}

impl<I: Iterator<Item = Peptide>> CandidateSource for IterCandidates<I> {
    fn has_next(&mut self) -> bool {
        self.inner.peek().is_some()
    }

    fn next_candidate(&mut self) -> Option<Peptide> {
        self.inner.next()
    }
}

/// What a scorer gets to see for one candidate.
#[derive(Debug, Clone, Copy)]
pub struct ScoringInput<'a> {
    /// Sequence as it should be scored (already shuffled for decoys).
    pub sequence: &'a str,
    pub peptide: &'a Peptide,
    pub charge: u8,
}

/// Scores a spectrum against a candidate for one scoring function.
///
/// The ion-series prediction and the scoring math live behind this trait.
pub trait PsmScorer {
    fn score(&self, score_type: ScoreType, spectrum: &Spectrum, input: ScoringInput<'_>) -> f64;

    /// Matched and possible b/y fragment counts, reported after a
    /// preliminary scoring pass. Scorers that do not track them return None.
    fn matched_ion_counts(
        &self,
        _spectrum: &Spectrum,
        _input: ScoringInput<'_>,
    ) -> Option<(u32, u32)> {
        None
    }
}
