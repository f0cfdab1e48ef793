use crate::error::{AcResult, AutocalError};
use crate::evaluator::{evaluate_checked, EvaluatorFactory, ModelEvaluator, WorkerContext};
use crate::optimizer::cce::{
    CceEngine, CceSettings, CceStats, DEFAULT_CONTRACTION_COEF, DEFAULT_REFLECTION_COEF,
};
use crate::optimizer::partition::{partition, recombine, Complex};
use crate::optimizer::population::Population;
use crate::point::{CandidatePoint, ParameterVector};
use crate::space::ParameterSpace;
use fastrand::Rng;
use rayon::prelude::*;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use strum_macros::{Display, EnumString};
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

pub const DEFAULT_MAX_TRIALS: usize = 100;
pub const DEFAULT_CONVERGENCE_EPSILON: f64 = 1e-6;
pub const DEFAULT_CONVERGENCE_WINDOW: usize = 5;

/// Shared abort flag. Checked between evaluator calls at every state
/// transition and before each CCE inner iteration.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct CalibrationOptions {
    pub num_complexes: usize,
    pub complex_size: usize,
    pub simplex_size: usize,
    pub alpha: usize,

    /// Maximum number of shuffle rounds.
    #[builder(default = DEFAULT_MAX_TRIALS)]
    pub max_trials: usize,
    #[builder(default = DEFAULT_CONVERGENCE_EPSILON)]
    pub convergence_epsilon: f64,
    /// Number of rounds the best objective is compared across.
    #[builder(default = DEFAULT_CONVERGENCE_WINDOW)]
    pub convergence_window: usize,

    #[builder(default = DEFAULT_REFLECTION_COEF)]
    pub reflection_coef: f64,
    #[builder(default = DEFAULT_CONTRACTION_COEF)]
    pub contraction_coef: f64,

    /// Must equal `num_complexes * complex_size` when given.
    #[builder(default, setter(strip_option))]
    pub sample_size: Option<usize>,
    /// Fill the first slots of the initial sample instead of random draws.
    #[builder(default)]
    pub initial_points: Vec<Vec<f64>>,
    #[builder(default, setter(strip_option))]
    pub max_time: Option<Duration>,
    /// Parent of the per-worker directories used by `run_parallel`.
    #[builder(default, setter(strip_option))]
    pub workspace_root: Option<PathBuf>,
    #[builder(default)]
    pub cancel: CancelToken,
}

impl CalibrationOptions {
    pub fn cce_settings(&self) -> CceSettings {
        CceSettings {
            simplex_size: self.simplex_size,
            alpha: self.alpha,
            reflection_coef: self.reflection_coef,
            contraction_coef: self.contraction_coef,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// `max_trials` shuffle rounds completed.
    MaxTrials,
    /// Best objective improved less than epsilon over the convergence window.
    Converged,
    TimeLimit,
    /// Cancelled by token or progress callback.
    Aborted,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalibrationOutcome {
    /// Best point seen at any shuffle boundary.
    pub best: CandidatePoint,
    /// Last fully shuffled population.
    pub population: Population,
    pub rounds: usize,
    pub evaluations: usize,
    /// Best-so-far objective after the initial sample and after each round.
    pub history: Vec<f64>,
    pub termination: TerminationReason,
    pub elapsed: Duration,
}

/// Snapshot handed to a [`ProgressCallback`]. Round 0 is the initial sample.
#[derive(Debug)]
pub struct RoundReport<'a> {
    pub round: usize,
    pub population: &'a Population,
    pub best: &'a CandidatePoint,
    pub evaluations: usize,
    pub stats: CceStats,
}

/// Receives a report after the initial sample and after every shuffle.
/// Returning `false` stops the run.
pub trait ProgressCallback {
    fn on_round(&self, report: &RoundReport<'_>) -> bool;
}

impl<T: ProgressCallback + ?Sized> ProgressCallback for &T {
    fn on_round(&self, report: &RoundReport<'_>) -> bool {
        (**self).on_round(report)
    }
}

/// Callback that never stops the run.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl ProgressCallback for Silent {
    fn on_round(&self, _report: &RoundReport<'_>) -> bool {
        true
    }
}

/// How evaluations are spread over evaluators.
trait Workers {
    fn evaluate_batch(
        &mut self,
        space: &ParameterSpace,
        batch: Vec<Vec<f64>>,
    ) -> AcResult<Vec<CandidatePoint>>;

    fn evolve_all(
        &mut self,
        engine: &CceEngine<'_>,
        complexes: &mut [Complex],
        streams: &mut [Rng],
        cancel: &CancelToken,
    ) -> AcResult<CceStats>;
}

struct Sequential<'e, E: ?Sized> {
    evaluator: &'e mut E,
}

impl<E: ModelEvaluator + ?Sized> Workers for Sequential<'_, E> {
    fn evaluate_batch(
        &mut self,
        space: &ParameterSpace,
        batch: Vec<Vec<f64>>,
    ) -> AcResult<Vec<CandidatePoint>> {
        let mut out = Vec::with_capacity(batch.len());
        for values in batch {
            let params = ParameterVector::new(space, &values);
            let objective = evaluate_checked(&mut *self.evaluator, &params)?;
            out.push(CandidatePoint::new(values, objective));
        }
        Ok(out)
    }

    fn evolve_all(
        &mut self,
        engine: &CceEngine<'_>,
        complexes: &mut [Complex],
        streams: &mut [Rng],
        cancel: &CancelToken,
    ) -> AcResult<CceStats> {
        let mut total = CceStats::default();
        for (complex, rng) in complexes.iter_mut().zip(streams.iter_mut()) {
            total += engine.evolve(complex, &mut *self.evaluator, rng, cancel)?;
        }
        Ok(total)
    }
}

/// One evaluator per complex slot.
struct Parallel<E> {
    evaluators: Vec<E>,
}

impl<E: ModelEvaluator + Send> Workers for Parallel<E> {
    fn evaluate_batch(
        &mut self,
        space: &ParameterSpace,
        batch: Vec<Vec<f64>>,
    ) -> AcResult<Vec<CandidatePoint>> {
        let chunk = batch.len().div_ceil(self.evaluators.len()).max(1);

        let chunks: Vec<Vec<AcResult<CandidatePoint>>> = batch
            .par_chunks(chunk)
            .zip(self.evaluators.par_iter_mut())
            .map(|(values, evaluator)| {
                let mut out = Vec::with_capacity(values.len());
                for v in values {
                    let res = evaluate_checked(&mut *evaluator, &ParameterVector::new(space, v))
                        .map(|objective| CandidatePoint::new(v.clone(), objective))
                        .map_err(AutocalError::from);
                    let failed = res.is_err();
                    out.push(res);
                    if failed {
                        break;
                    }
                }
                out
            })
            .collect();

        // First failure in slot order, independent of thread scheduling
        chunks.into_iter().flatten().collect()
    }

    fn evolve_all(
        &mut self,
        engine: &CceEngine<'_>,
        complexes: &mut [Complex],
        streams: &mut [Rng],
        cancel: &CancelToken,
    ) -> AcResult<CceStats> {
        let results: Vec<AcResult<CceStats>> = complexes
            .par_iter_mut()
            .zip(self.evaluators.par_iter_mut())
            .zip(streams.par_iter_mut())
            .map(|((complex, evaluator), rng)| engine.evolve(complex, evaluator, rng, cancel))
            .collect();

        let mut total = CceStats::default();
        for r in results {
            total += r?;
        }
        Ok(total)
    }
}

/// Shuffled Complex Evolution driver.
pub struct Calibrator {
    space: ParameterSpace,
    options: CalibrationOptions,
}

impl Calibrator {
    /// Validates the configuration. Nothing is evaluated here.
    pub fn new(space: ParameterSpace, options: CalibrationOptions) -> AcResult<Self> {
        validate(&space, &options)?;
        debug!(?options, params = space.len(), "calibrator configured");
        Ok(Self { space, options })
    }

    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    pub fn options(&self) -> &CalibrationOptions {
        &self.options
    }

    pub fn sample_size(&self) -> usize {
        self.options.num_complexes * self.options.complex_size
    }

    /// Single-threaded run. Every evaluation goes through `evaluator`.
    pub fn run<E, CB>(
        &self,
        evaluator: &mut E,
        rng: &mut Rng,
        callback: CB,
    ) -> AcResult<CalibrationOutcome>
    where
        E: ModelEvaluator + ?Sized,
        CB: ProgressCallback,
    {
        let mut workers = Sequential { evaluator };
        self.drive(&mut workers, rng, callback)
    }

    /// Evolves complexes concurrently, one factory-built evaluator per complex.
    ///
    /// With a deterministic evaluator this produces the same outcome as
    /// [`Calibrator::run`] for the same seed.
    pub fn run_parallel<F, CB>(
        &self,
        factory: &F,
        rng: &mut Rng,
        callback: CB,
    ) -> AcResult<CalibrationOutcome>
    where
        F: EvaluatorFactory,
        CB: ProgressCallback,
    {
        let mut evaluators = Vec::with_capacity(self.options.num_complexes);
        for index in 0..self.options.num_complexes {
            let ctx = WorkerContext::prepare(index, self.options.workspace_root.as_deref())?;
            evaluators.push(factory.create(&ctx)?);
        }

        let mut workers = Parallel { evaluators };
        self.drive(&mut workers, rng, callback)
    }

    fn drive<W: Workers, CB: ProgressCallback>(
        &self,
        workers: &mut W,
        rng: &mut Rng,
        callback: CB,
    ) -> AcResult<CalibrationOutcome> {
        let opts = &self.options;
        let cancel = &opts.cancel;
        let start_time = Instant::now();
        let sample_size = self.sample_size();
        let engine = CceEngine::new(&self.space, opts.cce_settings());

        info!(
            params = self.space.len(),
            sample_size,
            complexes = opts.num_complexes,
            max_trials = opts.max_trials,
            "Starting SCE calibration"
        );

        // 1. Sample
        let mut batch = Vec::with_capacity(sample_size);
        batch.extend(opts.initial_points.iter().cloned());
        while batch.len() < sample_size {
            batch.push(self.space.sample(rng));
        }

        // 2. Evaluate initial population
        let mut population = Population::from_points(workers.evaluate_batch(&self.space, batch)?);
        let mut evaluations = sample_size;
        let mut best = population
            .best()
            .cloned()
            .ok_or_else(|| AutocalError::Config("Empty initial population".to_string()))?;
        let mut history = vec![best.objective()];
        let mut rounds = 0;

        info!(best = best.objective(), "Initial population evaluated");

        let keep_going = callback.on_round(&RoundReport {
            round: 0,
            population: &population,
            best: &best,
            evaluations,
            stats: CceStats::default(),
        });

        let termination = if !keep_going || cancel.is_cancelled() {
            TerminationReason::Aborted
        } else {
            loop {
                if rounds >= opts.max_trials {
                    break TerminationReason::MaxTrials;
                }
                if let Some(limit) = opts.max_time {
                    if start_time.elapsed() >= limit {
                        break TerminationReason::TimeLimit;
                    }
                }
                if cancel.is_cancelled() {
                    break TerminationReason::Aborted;
                }

                // 3. Partition
                let mut complexes = partition(&population, opts.num_complexes)?;

                // One stream per complex, drawn in id order so scheduling never matters
                let mut streams: Vec<Rng> = (0..complexes.len())
                    .map(|_| Rng::with_seed(rng.u64(..)))
                    .collect();

                // 4. Evolve
                let stats = workers.evolve_all(&engine, &mut complexes, &mut streams, cancel)?;
                evaluations += stats.evaluations;
                debug!(round = rounds + 1, ?stats, "Complexes evolved");

                if cancel.is_cancelled() {
                    warn!(round = rounds + 1, "Cancelled mid-round, discarding partial evolution");
                    break TerminationReason::Aborted;
                }

                // 5. Shuffle
                population = Population::from_points(recombine(complexes));
                rounds += 1;

                if let Some(top) = population.best() {
                    if top.objective() > best.objective() {
                        best = top.clone();
                    }
                }
                history.push(best.objective());

                info!(
                    round = rounds,
                    best = best.objective(),
                    evaluations,
                    "Shuffle round complete"
                );

                let keep_going = callback.on_round(&RoundReport {
                    round: rounds,
                    population: &population,
                    best: &best,
                    evaluations,
                    stats,
                });
                if !keep_going {
                    break TerminationReason::Aborted;
                }

                // 6. Convergence
                if has_converged(&history, opts.convergence_window, opts.convergence_epsilon) {
                    break TerminationReason::Converged;
                }
            }
        };

        let elapsed = start_time.elapsed();
        info!(
            %termination,
            rounds,
            evaluations,
            best = best.objective(),
            "Calibration finished in {:.2?}",
            elapsed
        );

        Ok(CalibrationOutcome {
            best,
            population,
            rounds,
            evaluations,
            history,
            termination,
            elapsed,
        })
    }
}

/// True when the best objective gained less than `epsilon` over the last
/// `window` rounds. `history[0]` is the initial sample.
pub fn has_converged(history: &[f64], window: usize, epsilon: f64) -> bool {
    if window == 0 || history.len() <= window {
        return false;
    }
    let now = history[history.len() - 1];
    let then = history[history.len() - 1 - window];
    now - then < epsilon
}

fn validate(space: &ParameterSpace, opts: &CalibrationOptions) -> AcResult<()> {
    let n = space.len();
    let config = |msg: String| Err(AutocalError::Config(msg));

    if opts.num_complexes < 1 {
        return config("num_complexes must be >= 1".to_string());
    }

    if let Some(s) = opts.sample_size {
        if s != opts.num_complexes * opts.complex_size {
            return Err(AutocalError::PartitionSize {
                population: s,
                num_complexes: opts.num_complexes,
            });
        }
    }

    if opts.complex_size < n + 1 {
        return config(format!(
            "complex_size must be >= parameter count + 1 ({}), got {}",
            n + 1,
            opts.complex_size
        ));
    }
    if opts.simplex_size < 2 || opts.simplex_size > opts.complex_size {
        return config(format!(
            "simplex_size must be within [2, {}], got {}",
            opts.complex_size, opts.simplex_size
        ));
    }
    if opts.alpha < 1 {
        return config("alpha must be >= 1".to_string());
    }
    if opts.max_trials < 1 {
        return config("max_trials must be >= 1".to_string());
    }
    if opts.convergence_window < 1 {
        return config("convergence_window must be >= 1".to_string());
    }
    if !opts.convergence_epsilon.is_finite() || opts.convergence_epsilon < 0.0 {
        return config(format!(
            "convergence_epsilon must be finite and >= 0, got {}",
            opts.convergence_epsilon
        ));
    }
    if !opts.reflection_coef.is_finite() || opts.reflection_coef <= 0.0 {
        return config(format!(
            "reflection_coef must be > 0, got {}",
            opts.reflection_coef
        ));
    }
    if !(opts.contraction_coef > 0.0 && opts.contraction_coef <= 1.0) {
        return config(format!(
            "contraction_coef must be within (0, 1], got {}",
            opts.contraction_coef
        ));
    }

    let sample_size = opts.num_complexes * opts.complex_size;
    if opts.initial_points.len() > sample_size {
        return config(format!(
            "{} initial points exceed the sample size of {}",
            opts.initial_points.len(),
            sample_size
        ));
    }
    for (i, p) in opts.initial_points.iter().enumerate() {
        if !space.contains(p) {
            return config(format!("initial point #{} lies outside the parameter space", i));
        }
    }

    Ok(())
}

/// Runs a full calibration with a single evaluator and no progress reporting.
pub fn calibrate<E: ModelEvaluator + ?Sized>(
    space: &ParameterSpace,
    evaluator: &mut E,
    options: CalibrationOptions,
    rng: &mut Rng,
) -> AcResult<CalibrationOutcome> {
    Calibrator::new(space.clone(), options)?.run(evaluator, rng, Silent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convergence_needs_a_full_window() {
        assert!(!has_converged(&[1.0, 1.0], 2, 0.1));
        assert!(has_converged(&[1.0, 1.0, 1.0], 2, 0.1));
    }

    #[test]
    fn test_convergence_compares_window_endpoints() {
        let history = [0.0, 0.5, 0.9, 0.95, 0.96];
        assert!(has_converged(&history, 2, 0.1));
        assert!(!has_converged(&history, 3, 0.1));
    }

    #[test]
    fn test_zero_epsilon_never_converges_on_flat_history() {
        assert!(!has_converged(&[1.0; 10], 3, 0.0));
    }

    #[test]
    fn test_termination_reason_strings() {
        assert_eq!(TerminationReason::MaxTrials.to_string(), "max_trials");
        assert_eq!(
            "time_limit".parse::<TerminationReason>().unwrap(),
            TerminationReason::TimeLimit
        );
    }
}
