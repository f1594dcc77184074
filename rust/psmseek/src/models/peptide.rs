use super::decoy::{
    DecoyMarking,
    as_decoy_order,
};
use serde::Serialize;

/// A modification placed on one residue of a peptide.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Modification {
    /// Zero-based residue index in the (target) sequence.
    pub position: usize,
    /// None for a modification only known by its mass.
    pub symbol: Option<char>,
    pub mass_delta: f64,
}

/// Where a peptide comes from: which protein and what residues flank it.
/// A '-' flank marks a protein terminus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProteinSource {
    pub protein_id: String,
    pub start_idx: Option<usize>,
    pub n_term_flank: char,
    pub c_term_flank: char,
}

impl ProteinSource {
    pub fn new(protein_id: impl Into<String>, n_term_flank: char, c_term_flank: char) -> Self {
        Self {
            protein_id: protein_id.into(),
            start_idx: None,
            n_term_flank,
            c_term_flank,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MassFormat {
    /// One bracket per residue with the summed modification mass.
    #[default]
    MergedMods,
    /// One bracket per residue listing each modification mass.
    SeparateMods,
}

/// A candidate peptide as handed over by a candidate source.
///
/// The peptide is produced elsewhere (digestion, modification expansion)
/// and is only read here, except for its protein source list which grows
/// when redundant matches get collapsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Peptide {
    sequence: String,
    modifications: Vec<Modification>,
    mass: f64,
    sources: Vec<ProteinSource>,
    pub decoy: DecoyMarking,
    unshuffled_sequence: Option<String>,
}

impl Peptide {
    pub fn new(sequence: impl Into<String>, mass: f64) -> Self {
        Self {
            sequence: sequence.into(),
            modifications: Vec::new(),
            mass,
            sources: Vec::new(),
            decoy: DecoyMarking::Target,
            unshuffled_sequence: None,
        }
    }

    pub fn with_modification(mut self, position: usize, symbol: char, mass_delta: f64) -> Self {
        self.modifications.push(Modification {
            position,
            symbol: Some(symbol),
            mass_delta,
        });
        self
    }

    /// A modification without a symbol, written as `[mass]`.
    pub fn with_mass_modification(mut self, position: usize, mass_delta: f64) -> Self {
        self.modifications.push(Modification {
            position,
            symbol: None,
            mass_delta,
        });
        self
    }

    pub fn with_source(mut self, source: ProteinSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_decoy(mut self, decoy: DecoyMarking) -> Self {
        self.decoy = decoy;
        self
    }

    pub fn with_unshuffled_sequence(mut self, seq: impl Into<String>) -> Self {
        self.unshuffled_sequence = Some(seq.into());
        self
    }

    /// The sequence as stored, without any decoy transformation.
    pub fn raw_sequence(&self) -> &str {
        &self.sequence
    }

    pub fn unshuffled_sequence(&self) -> Option<&str> {
        self.unshuffled_sequence.as_deref()
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn modifications(&self) -> &[Modification] {
        &self.modifications
    }

    pub fn sources(&self) -> &[ProteinSource] {
        &self.sources
    }

    /// Adds every source of `other` this peptide does not list yet.
    pub fn merge_sources(&mut self, other: &Peptide) {
        for src in other.sources.iter() {
            if !self.sources.contains(src) {
                self.sources.push(src.clone());
            }
        }
    }

    pub fn protein_ids(&self) -> String {
        self.sources
            .iter()
            .map(|s| s.protein_id.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn flanking_aa(&self) -> String {
        self.sources
            .iter()
            .map(|s| format!("{}{}", s.n_term_flank, s.c_term_flank))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn n_term_flank(&self) -> char {
        self.sources.first().map(|s| s.n_term_flank).unwrap_or('-')
    }

    pub fn c_term_flank(&self) -> char {
        self.sources.first().map(|s| s.c_term_flank).unwrap_or('-')
    }

    /// Residues paired with the modifications that sit on them, in display
    /// order (decoy-shuffled when `shuffle` is set).
    fn residues(&self, shuffle: bool) -> Vec<(char, Vec<&Modification>)> {
        let mut out: Vec<(char, Vec<&Modification>)> =
            self.sequence.chars().map(|c| (c, Vec::new())).collect();
        for m in self.modifications.iter() {
            if let Some(slot) = out.get_mut(m.position) {
                slot.1.push(m);
            }
        }
        if shuffle {
            as_decoy_order(&mut out);
        }
        out
    }

    pub fn display_sequence(&self, shuffle: bool) -> String {
        self.residues(shuffle).into_iter().map(|(c, _)| c).collect()
    }

    /// Symbol modifications follow their residue. Those without a symbol
    /// are bracketed with their exact mass so that the string parses back.
    pub fn sequence_with_symbols(&self, shuffle: bool) -> String {
        let mut out = String::with_capacity(self.sequence.len() + self.modifications.len());
        for (aa, mods) in self.residues(shuffle) {
            out.push(aa);
            let mut masses = Vec::new();
            for m in mods {
                match m.symbol {
                    Some(c) => out.push(c),
                    None => masses.push(m.mass_delta.to_string()),
                }
            }
            if !masses.is_empty() {
                out.push('[');
                out.push_str(&masses.join(","));
                out.push(']');
            }
        }
        out
    }

    pub fn sequence_with_masses(&self, shuffle: bool, format: MassFormat) -> String {
        let mut out = String::with_capacity(self.sequence.len() * 2);
        for (aa, mods) in self.residues(shuffle) {
            out.push(aa);
            if mods.is_empty() {
                continue;
            }
            match format {
                MassFormat::MergedMods => {
                    let total: f64 = mods.iter().map(|m| m.mass_delta).sum();
                    out.push_str(&format!("[{:.2}]", total));
                }
                MassFormat::SeparateMods => {
                    let parts: Vec<String> =
                        mods.iter().map(|m| format!("{:.2}", m.mass_delta)).collect();
                    out.push_str(&format!("[{}]", parts.join(",")));
                }
            }
        }
        out
    }
}
