use psmseek::errors::PsmSeekError;
use psmseek::models::{
    Match,
    ProteinSource,
};
use psmseek::ml::compute_weibull_pvalue;
use psmseek::traits::{
    IterCandidates,
    ScoringInput,
};
use psmseek::{
    DataProcessingError,
    MatchCollection,
    Peptide,
    PsmScorer,
    ScoreType,
    SearchParameters,
    Spectrum,
    ZState,
};
use std::collections::HashMap;
use std::rc::Rc;

/// Looks scores up by sequence. Unknown sequences score by peptide mass.
struct TableScorer {
    scores: HashMap<String, (f64, f64)>,
}

impl TableScorer {
    fn new(rows: &[(&str, f64, f64)]) -> Self {
        Self {
            scores: rows
                .iter()
                .map(|(s, sp, xcorr)| (s.to_string(), (*sp, *xcorr)))
                .collect(),
        }
    }
}

impl PsmScorer for TableScorer {
    fn score(&self, score_type: ScoreType, _spectrum: &Spectrum, input: ScoringInput<'_>) -> f64 {
        match self.scores.get(input.sequence) {
            Some((sp, xcorr)) => match score_type {
                ScoreType::Sp => *sp,
                _ => *xcorr,
            },
            None => input.peptide.mass(),
        }
    }
}

fn spectrum() -> Rc<Spectrum> {
    Rc::new(Spectrum::new(1234, 600.3).with_charges(vec![2]))
}

fn z2() -> ZState {
    ZState::from_mz(2, 600.3)
}

fn candidates(seqs: &[&str]) -> IterCandidates<std::vec::IntoIter<Peptide>> {
    IterCandidates::new(
        seqs.iter()
            .map(|s| Peptide::new(*s, 1198.6).with_source(ProteinSource::new("prot", 'K', '-')))
            .collect::<Vec<_>>(),
    )
}

fn search(params: SearchParameters, rows: &[(&str, f64, f64)], do_sp: bool) -> MatchCollection {
    let mut mc = MatchCollection::new(Rc::new(params), false);
    let seqs: Vec<&str> = rows.iter().map(|r| r.0).collect();
    let scorer = TableScorer::new(rows);
    mc.add_matches(&spectrum(), z2(), &mut candidates(&seqs), &scorer, do_sp, false)
        .unwrap();
    mc
}

fn ten_rows() -> Vec<(&'static str, f64, f64)> {
    vec![
        ("AAAK", 10.0, 10.0),
        ("AACK", 20.0, 9.0),
        ("AADK", 30.0, 8.0),
        ("AAEK", 40.0, 7.0),
        ("AAFK", 50.0, 6.0),
        ("AAGK", 60.0, 5.0),
        ("AAHK", 70.0, 4.0),
        ("AAIK", 500.0, 3.0),
        ("AAKK", 80.0, 2.0),
        ("AALK", 90.0, 1.0),
    ]
}

#[test]
fn test_rank_monotonicity() {
    let rows = [
        ("AAAK", 5.0, 2.0),
        ("AACK", 5.0, 3.5),
        ("AADK", 1.0, 3.5),
        ("AAEK", 7.5, 0.5),
        ("AAFK", 1.0, 2.0),
        ("AAGK", 2.0, 3.5),
    ];
    let params = SearchParameters {
        psms_per_spectrum_reported: 100,
        ..SearchParameters::default()
    };
    let mut mc = search(params, &rows, true);

    for t in [ScoreType::Sp, ScoreType::Xcorr] {
        let guard = mc.iter_by(t);
        for pair in guard.windows(2) {
            let a = pair[0].borrow();
            let b = pair[1].borrow();
            assert!(a.rank(t) <= b.rank(t));
            assert_eq!(
                a.rank(t) == b.rank(t),
                a.score(t).unwrap().to_bits() == b.score(t).unwrap().to_bits()
            );
        }
    }
    mc.sort(ScoreType::Xcorr);
    let ranks: Vec<u32> = mc
        .iter()
        .iter()
        .map(|m| m.borrow().rank(ScoreType::Xcorr))
        .collect();
    assert_eq!(ranks, vec![1, 1, 1, 2, 2, 3]);
}

#[test]
fn test_truncation_is_idempotent() {
    let params = SearchParameters {
        psms_per_spectrum_reported: 100,
        ..SearchParameters::default()
    };
    let mut mc = search(params, &ten_rows(), false);
    assert_eq!(mc.len(), 10);
    mc.truncate(4, ScoreType::Xcorr);
    assert_eq!(mc.len(), 4);
    mc.truncate(4, ScoreType::Xcorr);
    assert_eq!(mc.len(), 4);
}

#[test]
fn test_second_sort_keeps_order() {
    let mut mc = search(SearchParameters::default(), &ten_rows(), true);
    mc.sort(ScoreType::Sp);
    let first: Vec<*const _> = mc.iter().iter().map(Rc::as_ptr).collect();
    mc.sort(ScoreType::Sp);
    let second: Vec<*const _> = mc.iter().iter().map(Rc::as_ptr).collect();
    assert_eq!(first, second);
    assert_eq!(mc.last_sorted_by(), Some(ScoreType::Sp));
}

#[test]
fn test_capacity_boundary() {
    let params = SearchParameters {
        match_capacity: 3,
        ..SearchParameters::default()
    };
    let rows = [("AAAK", 1.0, 1.0), ("AACK", 2.0, 2.0), ("AADK", 3.0, 3.0)];
    let mc = search(params.clone(), &rows, false);
    assert_eq!(mc.len(), 3);

    let mut mc = MatchCollection::new(Rc::new(params), false);
    let scorer = TableScorer::new(&rows);
    let err = mc
        .add_matches(
            &spectrum(),
            z2(),
            &mut candidates(&["AAAK", "AACK", "AADK", "AAEK"]),
            &scorer,
            false,
            false,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        PsmSeekError::DataProcessingError(DataProcessingError::CapacityExceeded { capacity: 3, .. })
    ));
}

#[test]
fn test_empty_candidate_source() {
    let mut mc = MatchCollection::new(Rc::new(SearchParameters::default()), false);
    let scorer = TableScorer::new(&[]);
    let added = mc
        .add_matches(&spectrum(), z2(), &mut candidates(&[]), &scorer, false, false)
        .unwrap();
    assert_eq!(added, 0);
    assert!(mc.is_scored(ScoreType::Xcorr));
    assert!(!mc.is_scored(ScoreType::Sp));
}

#[test]
fn test_merge_scored_type_mismatch() {
    let rows = ten_rows();
    let mut src = MatchCollection::new(Rc::new(SearchParameters::default()), false);
    src.add_match(Match::new(Peptide::new("AAAK", 500.0), spectrum(), z2(), false).into_ref())
        .unwrap();
    src.force_scored_by(ScoreType::Sp);

    let mut dest = search(SearchParameters::default(), &rows, true);
    assert!(dest.is_scored(ScoreType::Sp) && dest.is_scored(ScoreType::Xcorr));
    let before = dest.len();

    let err = MatchCollection::merge(&src, &mut dest).unwrap_err();
    assert!(matches!(
        err,
        PsmSeekError::DataProcessingError(DataProcessingError::ScoredTypeMismatch {
            score_type: ScoreType::Xcorr,
            ..
        })
    ));
    assert_eq!(dest.len(), before);
}

#[test]
fn test_top_scoring_preliminary_survives_truncation() {
    let mut mc = search(SearchParameters::default(), &ten_rows(), true);
    mc.truncate(5, ScoreType::Xcorr);
    assert_eq!(mc.len(), 5);

    let top = mc.top_scoring_sp().unwrap().clone();
    {
        let top = top.borrow();
        assert_eq!(top.sequence(), "AAIK");
        assert_eq!(top.rank(ScoreType::Sp), 1);
        assert_eq!(top.rank(ScoreType::Xcorr), 8);
    }
    assert!(mc.iter().iter().all(|m| !Rc::ptr_eq(m, &top)));
}

#[test]
fn test_qvalues_are_monotone() {
    let mut mc = MatchCollection::new(Rc::new(SearchParameters::default()), false);
    let layout = [
        (9.0, false),
        (8.5, false),
        (8.0, true),
        (7.0, false),
        (6.5, true),
        (6.0, false),
        (5.0, true),
        (4.0, true),
        (3.0, false),
    ];
    for (score, is_decoy) in layout {
        let mut m = Match::new(Peptide::new("PEPTIDEK", 900.0), spectrum(), z2(), is_decoy);
        m.set_score(ScoreType::Xcorr, score);
        mc.add_match(m.into_ref()).unwrap();
    }
    // Never scored, so not applicable.
    let na = Match::new(Peptide::new("PEPTIDEK", 900.0), spectrum(), z2(), true).into_ref();
    mc.add_match(na.clone()).unwrap();
    mc.force_scored_by(ScoreType::Xcorr);

    mc.compute_decoy_qvalues().unwrap();

    let q: Vec<f64> = mc
        .iter()
        .iter()
        .filter_map(|m| m.borrow().score(ScoreType::DecoyXcorrQvalue))
        .collect();
    assert_eq!(q.len(), layout.len());
    // Best first, so reading from worst to best never increases.
    assert!(q.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(q[0], 0.0);
    assert_eq!(na.borrow().score(ScoreType::DecoyXcorrQvalue), None);
}

#[test]
fn test_collapse_redundant_matches() {
    let mut mc = MatchCollection::new(Rc::new(SearchParameters::default()), false);
    mc.set_experiment_size(2);
    for prot in ["sp|P1", "sp|P2"] {
        let pep = Peptide::new("LESLIEK", 810.4).with_source(ProteinSource::new(prot, 'R', 'A'));
        let mut m = Match::new(pep, spectrum(), z2(), false);
        m.set_score(ScoreType::Xcorr, 4.25);
        mc.add_match(m.into_ref()).unwrap();
    }
    mc.force_scored_by(ScoreType::Xcorr);
    mc.sort(ScoreType::Xcorr);

    assert_eq!(mc.collapse_redundant_matches(), 1);
    assert_eq!(mc.len(), 1);
    assert_eq!(mc.experiment_size(), 1);
    let survivor = mc.get(0).unwrap().borrow();
    assert_eq!(survivor.peptide().sources().len(), 2);
    assert_eq!(survivor.peptide().protein_ids(), "sp|P1,sp|P2");
}

#[test]
#[should_panic(expected = "while a match iterator is open")]
fn test_truncate_with_open_iterator_panics() {
    let mut mc = search(SearchParameters::default(), &ten_rows(), false);
    let mut it = mc.match_iterator(Some(ScoreType::Xcorr));
    let _ = it.next();
    mc.truncate(1, ScoreType::Xcorr);
}

#[test]
fn test_weibull_round_trip_gives_uniform_pvalues() {
    let (eta, beta, shift) = (2.0, 3.0, 0.5);
    let n = 1000;
    let null_scores: Vec<f64> = (0..n)
        .map(|i| {
            let f = ((n - i) as f64 - 0.3) / (n as f64 + 0.4);
            eta * (-(1.0 - f).ln()).powf(1.0 / beta) - shift
        })
        .collect();

    let params = Rc::new(SearchParameters {
        bonferroni_correction: false,
        ..SearchParameters::default()
    });
    let mut decoys = MatchCollection::new(params.clone(), true);
    let pool_source: Vec<Peptide> = null_scores
        .iter()
        .map(|s| Peptide::new("NULLK", *s))
        .collect();
    let scorer = TableScorer::new(&[]);
    let added = decoys.add_decoy_scores(&spectrum(), z2(), &mut IterCandidates::new(pool_source), &scorer);
    assert_eq!(added, n);
    assert!(decoys.has_enough_weibull_points());
    assert!(decoys.estimate_weibull_parameters_from_pool(1234, 2));

    let fit = decoys.weibull();
    assert!((fit.eta - eta).abs() < 1e-2);
    assert!((fit.beta - beta).abs() < 1e-2);
    assert!((fit.shift - shift).abs() < 1e-2);

    let mut pvalues: Vec<f64> = null_scores
        .iter()
        .map(|s| compute_weibull_pvalue(*s, fit.eta, fit.beta, fit.shift))
        .collect();
    pvalues.sort_by(|a, b| a.total_cmp(b));
    let mean = pvalues.iter().sum::<f64>() / n as f64;
    assert!((mean - 0.5).abs() < 0.02);
    for (k, p) in pvalues.iter().enumerate() {
        let expected = (k as f64 + 0.5) / n as f64;
        assert!((p - expected).abs() < 0.02, "p-value {} at {} drifts", p, k);
    }

    // Calibrated p-values flow into a target collection.
    let mut targets = search(
        SearchParameters {
            bonferroni_correction: false,
            ..SearchParameters::default()
        },
        &[("AAAK", 1.0, 4.0), ("AACK", 1.0, 1.0)],
        false,
    );
    MatchCollection::transfer_weibull(&decoys, &mut targets);
    targets.compute_p_values(None).unwrap();
    let logp = targets.extract_scores(ScoreType::LogpBonfWeibullXcorr);
    assert!(logp[0] > logp[1]);
    let expected = -compute_weibull_pvalue(4.0, fit.eta, fit.beta, fit.shift).ln();
    assert!((logp[0] - expected).abs() < 1e-12);
}
