pub mod api;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod loader;
pub mod optimizer;
pub mod point;
pub mod reports;
pub mod space;

pub use error::{AcResult, AutocalError, EvaluationError};
pub use evaluator::{EvaluatorFactory, ModelEvaluator, WorkerContext};
pub use optimizer::{calibrate, CalibrationOptions, CalibrationOutcome, Calibrator};
pub use point::{CandidatePoint, ParameterVector};
pub use space::{ParameterBound, ParameterSpace};
