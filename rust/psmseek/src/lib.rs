pub mod config;
pub mod data_sources;
pub mod errors;
pub mod ml;
pub mod models;
pub mod scoring;
pub mod traits;

pub use config::SearchParameters;
pub use data_sources::{
    PsmTableReader,
    PsmTableWriter,
    ScanIndex,
};
pub use errors::{
    DataProcessingError,
    PsmSeekError,
    Result,
};
pub use models::{
    Match,
    MatchRef,
    Peptide,
    ScoreType,
    Spectrum,
    ZState,
};
pub use scoring::MatchCollection;
pub use traits::{
    CandidateSource,
    PsmScorer,
};
