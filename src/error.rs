use thiserror::Error;

/// Failure reported by a [`ModelEvaluator`](crate::evaluator::ModelEvaluator).
///
/// Kept separate from [`AutocalError`] so evaluator implementations only need
/// to describe what went wrong with one simulator call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Evaluation failed: {reason}")]
pub struct EvaluationError {
    pub reason: String,
}

impl EvaluationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for EvaluationError {
    fn from(e: std::io::Error) -> Self {
        Self::new(format!("IO: {}", e))
    }
}

#[derive(Error, Debug)]
pub enum AutocalError {
    #[error("Invalid bounds for parameter '{name}': min {min} > max {max}")]
    InvalidBounds { name: String, min: f64, max: f64 },

    #[error("Population of {population} points cannot be split into {num_complexes} equal complexes")]
    PartitionSize {
        population: usize,
        num_complexes: usize,
    },

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV Parsing Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type AcResult<T> = Result<T, AutocalError>;
