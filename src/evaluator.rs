use crate::error::EvaluationError;
use crate::point::ParameterVector;
use std::path::{Path, PathBuf};

/// Maps a parameter vector to an objective value (higher = better fit).
///
/// Implementations typically stage the parameters, run the simulator and
/// parse its reported fit metric. Calls block until the simulator is done and
/// must tolerate being asked for the same vector more than once.
pub trait ModelEvaluator {
    fn evaluate(&mut self, params: &ParameterVector<'_>) -> Result<f64, EvaluationError>;
}

impl<E: ModelEvaluator + ?Sized> ModelEvaluator for &mut E {
    fn evaluate(&mut self, params: &ParameterVector<'_>) -> Result<f64, EvaluationError> {
        (**self).evaluate(params)
    }
}

impl<E: ModelEvaluator + ?Sized> ModelEvaluator for Box<E> {
    fn evaluate(&mut self, params: &ParameterVector<'_>) -> Result<f64, EvaluationError> {
        (**self).evaluate(params)
    }
}

/// Adapter that turns a closure into a [`ModelEvaluator`].
pub struct FnEvaluator<F> {
    f: F,
}

impl<F> ModelEvaluator for FnEvaluator<F>
where
    F: FnMut(&ParameterVector<'_>) -> Result<f64, EvaluationError>,
{
    fn evaluate(&mut self, params: &ParameterVector<'_>) -> Result<f64, EvaluationError> {
        (self.f)(params)
    }
}

pub fn from_fn<F>(f: F) -> FnEvaluator<F>
where
    F: FnMut(&ParameterVector<'_>) -> Result<f64, EvaluationError>,
{
    FnEvaluator { f }
}

/// What a parallel worker knows about itself when its evaluator is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerContext {
    pub index: usize,
    /// Private scratch directory. Concurrent evaluators that stage files
    /// must not share one.
    pub workdir: Option<PathBuf>,
}

impl WorkerContext {
    /// Creates `root/worker-<index>` when a root is given.
    pub fn prepare(index: usize, root: Option<&Path>) -> std::io::Result<Self> {
        let workdir = match root {
            Some(root) => {
                let dir = root.join(format!("worker-{}", index));
                std::fs::create_dir_all(&dir)?;
                Some(dir)
            }
            None => None,
        };
        Ok(Self { index, workdir })
    }
}

/// Builds one independent evaluator per parallel worker.
pub trait EvaluatorFactory: Sync {
    type Evaluator: ModelEvaluator + Send;

    fn create(&self, worker: &WorkerContext) -> Result<Self::Evaluator, EvaluationError>;
}

impl<F, E> EvaluatorFactory for F
where
    F: Fn(&WorkerContext) -> Result<E, EvaluationError> + Sync,
    E: ModelEvaluator + Send,
{
    type Evaluator = E;

    fn create(&self, worker: &WorkerContext) -> Result<E, EvaluationError> {
        self(worker)
    }
}

/// Runs one evaluation and rejects NaN, which no ranking can place.
pub(crate) fn evaluate_checked<E: ModelEvaluator + ?Sized>(
    evaluator: &mut E,
    params: &ParameterVector<'_>,
) -> Result<f64, EvaluationError> {
    let value = evaluator.evaluate(params)?;
    if value.is_nan() {
        return Err(EvaluationError::new(format!(
            "objective is NaN for {:?}",
            params.values()
        )));
    }
    Ok(value)
}
