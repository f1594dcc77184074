mod decoy;
mod peptide;
mod psm;
mod score_type;
mod spectrum;

pub use decoy::DecoyMarking;
pub use peptide::{
    MassFormat,
    Modification,
    Peptide,
    ProteinSource,
};
pub use psm::{
    FileRegistry,
    Match,
    MatchRef,
    compare_by,
    compare_spectrum,
};
pub use score_type::{
    NUM_SCORE_TYPES,
    ScoreType,
    compare_scores,
    same_score,
};
pub use spectrum::{
    MASS_PROTON,
    Spectrum,
    ZState,
};
