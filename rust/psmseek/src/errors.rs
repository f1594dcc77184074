use crate::models::ScoreType;
use std::path::PathBuf;

// Everything that can go wrong while assembling, ordering or calibrating
// a match collection. These are the "fatal" conditions: callers propagate
// them and the binary reports and exits.
#[derive(Debug)]
pub enum DataProcessingError {
    CapacityExceeded {
        capacity: usize,
        context: String,
    },
    ScoredTypeMismatch {
        score_type: ScoreType,
        context: String,
    },
    NotScored {
        score_type: ScoreType,
        context: String,
    },
    MissingInput {
        context: String,
    },
    NotPostProcess {
        context: String,
    },
    MissingQValue {
        score: f64,
        context: String,
    },
    NoDerivedScoreType {
        score_type: ScoreType,
    },
    ChargeMismatch {
        current: u8,
        requested: u8,
    },
}

#[derive(Debug)]
pub enum PsmReadingError {
    Csv {
        source: csv::Error,
        context: &'static str,
    },
    MissingColumn {
        column: &'static str,
        row: usize,
    },
    InvalidField {
        column: &'static str,
        value: String,
        row: usize,
    },
}

impl DataProcessingError {
    pub fn append_to_context(mut self, context: &str) -> Self {
        match &mut self {
            DataProcessingError::CapacityExceeded {
                context: owned_context,
                ..
            } => {
                owned_context.push_str(context);
            }
            DataProcessingError::ScoredTypeMismatch {
                context: owned_context,
                ..
            } => {
                owned_context.push_str(context);
            }
            DataProcessingError::NotScored {
                context: owned_context,
                ..
            } => {
                owned_context.push_str(context);
            }
            DataProcessingError::MissingInput {
                context: owned_context,
            } => {
                owned_context.push_str(context);
            }
            DataProcessingError::NotPostProcess {
                context: owned_context,
            } => {
                owned_context.push_str(context);
            }
            DataProcessingError::MissingQValue {
                context: owned_context,
                ..
            } => {
                owned_context.push_str(context);
            }
            DataProcessingError::NoDerivedScoreType { .. } => {}
            DataProcessingError::ChargeMismatch { .. } => {}
        }
        self
    }
}

impl std::fmt::Display for DataProcessingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataProcessingError::CapacityExceeded { capacity, context } => write!(
                f,
                "match count exceeds the collection capacity of {}: {}",
                capacity, context
            ),
            DataProcessingError::ScoredTypeMismatch {
                score_type,
                context,
            } => write!(
                f,
                "cannot combine collections scored differently for {}: {}",
                score_type, context
            ),
            DataProcessingError::NotScored {
                score_type,
                context,
            } => write!(
                f,
                "collection was not scored by {} before use: {}",
                score_type, context
            ),
            DataProcessingError::MissingInput { context } => {
                write!(f, "missing required input: {}", context)
            }
            DataProcessingError::NotPostProcess { context } => {
                write!(f, "not a post-process collection: {}", context)
            }
            DataProcessingError::MissingQValue { score, context } => write!(
                f,
                "cannot find q-value corresponding to score of {}: {}",
                score, context
            ),
            DataProcessingError::NoDerivedScoreType { score_type } => {
                write!(f, "no derived score type exists for {}", score_type)
            }
            DataProcessingError::ChargeMismatch { current, requested } => write!(
                f,
                "collection holds charge {} matches, cannot add charge {}",
                current, requested
            ),
        }
    }
}

impl std::fmt::Display for PsmReadingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug)]
pub enum PsmSeekError {
    Io {
        source: std::io::Error,
        path: Option<PathBuf>,
    },
    ParseError {
        msg: String,
    },
    DataProcessingError(DataProcessingError),
    PsmReadingError(PsmReadingError),
}

impl std::fmt::Display for PsmSeekError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PsmSeekError::Io { source, path } => match path {
                Some(path) => write!(f, "I/O error on {}: {}", path.display(), source),
                None => write!(f, "I/O error: {}", source),
            },
            PsmSeekError::ParseError { msg } => write!(f, "parse error: {}", msg),
            PsmSeekError::DataProcessingError(x) => write!(f, "{}", x),
            PsmSeekError::PsmReadingError(x) => write!(f, "{}", x),
        }
    }
}

impl std::error::Error for PsmSeekError {}

pub type Result<T> = std::result::Result<T, PsmSeekError>;

impl From<std::io::Error> for PsmSeekError {
    fn from(x: std::io::Error) -> Self {
        Self::Io {
            source: x,
            path: None,
        }
    }
}

impl From<std::num::ParseIntError> for PsmSeekError {
    fn from(x: std::num::ParseIntError) -> Self {
        Self::ParseError { msg: x.to_string() }
    }
}

impl From<std::num::ParseFloatError> for PsmSeekError {
    fn from(x: std::num::ParseFloatError) -> Self {
        Self::ParseError { msg: x.to_string() }
    }
}

impl From<serde_json::Error> for PsmSeekError {
    fn from(val: serde_json::Error) -> Self {
        PsmSeekError::ParseError {
            msg: val.to_string(),
        }
    }
}

impl From<regex::Error> for PsmSeekError {
    fn from(val: regex::Error) -> Self {
        PsmSeekError::ParseError {
            msg: val.to_string(),
        }
    }
}

impl From<DataProcessingError> for PsmSeekError {
    fn from(x: DataProcessingError) -> Self {
        Self::DataProcessingError(x)
    }
}

impl From<PsmReadingError> for PsmSeekError {
    fn from(x: PsmReadingError) -> Self {
        Self::PsmReadingError(x)
    }
}

impl From<csv::Error> for PsmSeekError {
    fn from(x: csv::Error) -> Self {
        Self::PsmReadingError(PsmReadingError::Csv {
            source: x,
            context: "",
        })
    }
}
