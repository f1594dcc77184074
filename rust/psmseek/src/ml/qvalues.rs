use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetDecoy {
    Target,
    Decoy,
}

pub trait LabelledScore {
    fn get_score(&self) -> f64;
    fn get_label(&self) -> TargetDecoy;
    fn assign_qval(&mut self, q: f64);
    fn get_qval(&self) -> f64;

    /// Entries that are not applicable are neither counted nor assigned.
    fn is_applicable(&self) -> bool {
        true
    }
}

impl LabelledScore for (f64, TargetDecoy, f64) {
    fn get_score(&self) -> f64 {
        self.0
    }

    fn get_label(&self) -> TargetDecoy {
        self.1
    }

    fn assign_qval(&mut self, q: f64) {
        self.2 = q
    }

    fn get_qval(&self) -> f64 {
        self.2
    }
}

/// Assign q_values in place.
///
/// # Invariants
/// * `scores` must be sorted best first.
///
/// The local FDR at each position is decoys / targets seen so far, and 1.0
/// while no target has been seen. The backward pass keeps the running
/// minimum so q-values never increase as the score improves.
pub fn assign_qval<T: LabelledScore>(scores: &mut [T]) {
    let mut decoy = 0usize;
    let mut target = 0usize;

    for score in scores.iter_mut() {
        if !score.is_applicable() {
            continue;
        }
        match score.get_label() {
            TargetDecoy::Decoy => decoy += 1,
            TargetDecoy::Target => target += 1,
        }
        let fdr = if target == 0 {
            1.0
        } else {
            decoy as f64 / target as f64
        };
        score.assign_qval(fdr);
    }

    // Reverse slice, and calculate the cumulative minimum
    let mut q_min = 1.0f64;
    for score in scores.iter_mut().rev() {
        if !score.is_applicable() {
            continue;
        }
        q_min = q_min.min(score.get_qval());
        score.assign_qval(q_min);
    }
}

/// Exact-score lookup table, keyed on the bit pattern of the score.
#[derive(Debug, Clone, Default)]
pub struct ScoreMap {
    inner: HashMap<u64, f64>,
}

impl ScoreMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, score: f64, value: f64) {
        self.inner.insert(score.to_bits(), value);
    }

    pub fn get(&self, score: f64) -> Option<f64> {
        self.inner.get(&score.to_bits()).copied()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

fn best_first(scores: &mut [f64], smaller_is_better: bool) {
    if smaller_is_better {
        scores.sort_by(|a, b| a.total_cmp(b));
    } else {
        scores.sort_by(|a, b| b.total_cmp(a));
    }
}

/// Turns FDRs ordered best first into q-values with a running minimum from
/// the worst end.
fn fdr_to_qvalue(fdrs: &mut [f64]) {
    let mut q_min = f64::INFINITY;
    for fdr in fdrs.iter_mut().rev() {
        q_min = q_min.min(*fdr);
        *fdr = q_min;
    }
}

/// Target-decoy competition q-values for every distinct target score.
///
/// The FDR at a target is `(d + 1) / t`, capped at 1, where `t` counts the
/// targets down to it and `d` the decoys strictly better than it. Tied
/// targets share the FDR of the first of the tie.
pub fn score_to_qvalue_map(targets: &[f64], decoys: &[f64], smaller_is_better: bool) -> ScoreMap {
    let mut targets = targets.to_vec();
    let mut decoys = decoys.to_vec();
    best_first(&mut targets, smaller_is_better);
    best_first(&mut decoys, smaller_is_better);

    let better = |a: f64, b: f64| if smaller_is_better { a < b } else { a > b };

    let mut fdrs = Vec::with_capacity(targets.len());
    let mut decoy_idx = 0usize;
    for (target_idx, score) in targets.iter().enumerate() {
        if target_idx > 0 && targets[target_idx - 1].to_bits() == score.to_bits() {
            let tied = fdrs[target_idx - 1];
            fdrs.push(tied);
            continue;
        }
        while decoy_idx < decoys.len() && better(decoys[decoy_idx], *score) {
            decoy_idx += 1;
        }
        let fdr = (decoy_idx + 1) as f64 / (target_idx + 1) as f64;
        fdrs.push(fdr.min(1.0));
    }
    fdr_to_qvalue(&mut fdrs);

    let mut out = ScoreMap::new();
    for (score, q) in targets.iter().zip(fdrs.iter()) {
        out.insert(*score, *q);
    }
    out
}

/// Benjamini-Hochberg q-values keyed by `-ln(p)`.
///
/// The FDR of the i-th best p-value (1-based) is `p * n * pi_zero / i`.
/// Equal p-values take the q-value of their first position. Non-finite
/// inputs are ignored.
pub fn benjamini_hochberg_map(log_pvalues: &[f64], pi_zero: f64) -> ScoreMap {
    let mut sorted: Vec<f64> = log_pvalues.iter().copied().filter(|x| x.is_finite()).collect();
    best_first(&mut sorted, false);

    let n = sorted.len() as f64;
    let mut fdrs: Vec<f64> = sorted
        .iter()
        .enumerate()
        .map(|(idx, logp)| (-logp).exp() * n * pi_zero / (idx + 1) as f64)
        .collect();
    fdr_to_qvalue(&mut fdrs);

    let mut out = ScoreMap::new();
    for (logp, q) in sorted.iter().zip(fdrs.iter()) {
        if out.get(*logp).is_none() {
            out.insert(*logp, *q);
        }
    }
    out
}
