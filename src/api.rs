use crate::config::{ExecutionMode, SceParams};
use crate::error::AcResult;
use crate::evaluator::{EvaluatorFactory, WorkerContext};
use crate::optimizer::runner::{CalibrationOutcome, Calibrator, ProgressCallback};
use crate::space::ParameterSpace;
use tracing::info;

/// Runs a calibration exactly as `params` describe it.
///
/// Sequential runs build a single evaluator for worker 0 (inside
/// `workspace_root/worker-0` when a root is configured); parallel runs build
/// one per complex.
pub fn run_calibration<F, CB>(
    space: ParameterSpace,
    params: &SceParams,
    factory: &F,
    callback: CB,
) -> AcResult<CalibrationOutcome>
where
    F: EvaluatorFactory,
    CB: ProgressCallback,
{
    let options = params.to_options(&space);
    let calibrator = Calibrator::new(space, options)?;
    let mut rng = params.rng();

    info!(execution = %params.execution, seed = ?params.seed, "API: running calibration");

    match params.execution {
        ExecutionMode::Parallel => calibrator.run_parallel(factory, &mut rng, callback),
        ExecutionMode::Sequential => {
            let ctx = WorkerContext::prepare(0, calibrator.options().workspace_root.as_deref())?;
            let mut evaluator = factory.create(&ctx)?;
            calibrator.run(&mut evaluator, &mut rng, callback)
        }
    }
}
