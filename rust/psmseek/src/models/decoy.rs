use serde::Serialize;

/// Whether a peptide is a target or a decoy, and if a decoy, whether its
/// sequence has already been shuffled.
///
/// NOTE: A `PendingDecoy` carries its target sequence and is shuffled on
/// display, a `Decoy` is stored already shuffled and prints as-is.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, std::hash::Hash, PartialOrd, Ord, Default)]
pub enum DecoyMarking {
    #[default]
    Target,
    PendingDecoy,
    Decoy,
}

impl DecoyMarking {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecoyMarking::Target => "Target",
            DecoyMarking::PendingDecoy => "Decoy",
            DecoyMarking::Decoy => "Decoy",
        }
    }

    pub fn is_decoy(&self) -> bool {
        match self {
            DecoyMarking::Target => false,
            DecoyMarking::PendingDecoy => true,
            DecoyMarking::Decoy => true,
        }
    }

    pub fn needs_shuffle(&self) -> bool {
        matches!(self, DecoyMarking::PendingDecoy)
    }
}

/// Reverses everything but the terminal residues, so the decoy keeps the
/// cleavage sites of its target.
pub(crate) fn as_decoy_order<T>(residues: &mut [T]) {
    if residues.len() > 2 {
        let last = residues.len() - 1;
        residues[1..last].reverse();
    }
}

pub(crate) fn as_decoy_string(sequence: &str) -> String {
    let mut chars: Vec<char> = sequence.chars().collect();
    as_decoy_order(&mut chars);
    chars.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoy() {
        let sequence = "PEPTIDEPINK";
        let decoy = as_decoy_string(sequence);
        assert_eq!(sequence, "PEPTIDEPINK");
        assert_eq!(decoy, "PNIPEDITPEK");
    }

    #[test]
    fn test_short_sequences_are_unchanged() {
        assert_eq!(as_decoy_string("PK"), "PK");
        assert_eq!(as_decoy_string("K"), "K");
        assert_eq!(as_decoy_string(""), "");
    }
}
