#![allow(dead_code)]

use autocal::evaluator::{EvaluatorFactory, ModelEvaluator, WorkerContext};
use autocal::optimizer::{RoundReport, ProgressCallback};
use autocal::{EvaluationError, ParameterSpace, ParameterVector};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// x in [0, 10], y in [0, 5]
pub fn two_param_space() -> ParameterSpace {
    ParameterSpace::from_triples([("x", 0.0, 10.0), ("y", 0.0, 5.0)]).unwrap()
}

/// Negative squared distance to `target`; peaks at 0.
pub fn neg_sq_dist(values: &[f64], target: &[f64]) -> f64 {
    -values
        .iter()
        .zip(target)
        .map(|(v, t)| (v - t) * (v - t))
        .sum::<f64>()
}

/// Deterministic stand-in for a simulator. Records every vector it sees.
#[derive(Debug, Clone)]
pub struct AnalyticEvaluator {
    pub target: Vec<f64>,
    pub seen: Vec<Vec<f64>>,
}

impl AnalyticEvaluator {
    pub fn new(target: &[f64]) -> Self {
        Self {
            target: target.to_vec(),
            seen: Vec::new(),
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.len()
    }
}

impl ModelEvaluator for AnalyticEvaluator {
    fn evaluate(&mut self, params: &ParameterVector<'_>) -> Result<f64, EvaluationError> {
        self.seen.push(params.values().to_vec());
        Ok(neg_sq_dist(params.values(), &self.target))
    }
}

/// Hands back pre-recorded objective values, then `fallback`.
#[derive(Debug, Clone)]
pub struct ScriptedEvaluator {
    pub script: VecDeque<f64>,
    pub fallback: f64,
    pub seen: Vec<Vec<f64>>,
}

impl ScriptedEvaluator {
    pub fn new(script: &[f64], fallback: f64) -> Self {
        Self {
            script: script.iter().copied().collect(),
            fallback,
            seen: Vec::new(),
        }
    }
}

impl ModelEvaluator for ScriptedEvaluator {
    fn evaluate(&mut self, params: &ParameterVector<'_>) -> Result<f64, EvaluationError> {
        self.seen.push(params.values().to_vec());
        Ok(self.script.pop_front().unwrap_or(self.fallback))
    }
}

/// Succeeds `ok_calls` times, then reports a simulator crash.
#[derive(Debug, Clone)]
pub struct FailingEvaluator {
    pub ok_calls: usize,
    pub calls: usize,
}

impl FailingEvaluator {
    pub fn new(ok_calls: usize) -> Self {
        Self { ok_calls, calls: 0 }
    }
}

impl ModelEvaluator for FailingEvaluator {
    fn evaluate(&mut self, params: &ParameterVector<'_>) -> Result<f64, EvaluationError> {
        self.calls += 1;
        if self.calls > self.ok_calls {
            return Err(EvaluationError::new("simulator exited with status 139"));
        }
        Ok(-params.values().iter().sum::<f64>())
    }
}

/// Builds an [`AnalyticEvaluator`] per worker.
pub struct AnalyticFactory {
    pub target: Vec<f64>,
}

impl EvaluatorFactory for AnalyticFactory {
    type Evaluator = AnalyticEvaluator;

    fn create(&self, _worker: &WorkerContext) -> Result<AnalyticEvaluator, EvaluationError> {
        Ok(AnalyticEvaluator::new(&self.target))
    }
}

/// Same objective everywhere.
#[derive(Debug, Clone, Copy)]
pub struct ConstantEvaluator {
    pub value: f64,
}

impl ModelEvaluator for ConstantEvaluator {
    fn evaluate(&mut self, _params: &ParameterVector<'_>) -> Result<f64, EvaluationError> {
        Ok(self.value)
    }
}

pub struct ConstantFactory {
    pub value: f64,
}

impl EvaluatorFactory for ConstantFactory {
    type Evaluator = ConstantEvaluator;

    fn create(&self, _worker: &WorkerContext) -> Result<ConstantEvaluator, EvaluationError> {
        Ok(ConstantEvaluator { value: self.value })
    }
}

/// Evaluator that stages parameters through a file in its own directory,
/// the way a real simulator wrapper would.
pub struct StagingEvaluator {
    pub workdir: PathBuf,
    pub target: Vec<f64>,
}

impl ModelEvaluator for StagingEvaluator {
    fn evaluate(&mut self, params: &ParameterVector<'_>) -> Result<f64, EvaluationError> {
        let path = self.workdir.join("params.txt");
        let text: Vec<String> = params.iter().map(|(k, v)| format!("{} {}", k, v)).collect();
        fs::write(&path, text.join("\n"))?;

        let staged = fs::read_to_string(&path)?;
        let values: Vec<f64> = staged
            .lines()
            .map(|l| {
                l.split_whitespace()
                    .nth(1)
                    .and_then(|v| v.parse().ok())
                    .ok_or_else(|| EvaluationError::new(format!("malformed line '{}'", l)))
            })
            .collect::<Result<_, _>>()?;
        Ok(neg_sq_dist(&values, &self.target))
    }
}

pub struct StagingFactory {
    pub target: Vec<f64>,
    pub workdirs: Mutex<Vec<PathBuf>>,
}

impl EvaluatorFactory for StagingFactory {
    type Evaluator = StagingEvaluator;

    fn create(&self, worker: &WorkerContext) -> Result<StagingEvaluator, EvaluationError> {
        let workdir = worker
            .workdir
            .clone()
            .ok_or_else(|| EvaluationError::new("staging needs a workdir"))?;
        self.workdirs.lock().unwrap().push(workdir.clone());
        Ok(StagingEvaluator {
            workdir,
            target: self.target.clone(),
        })
    }
}

/// What a progress callback saw for one round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundSnapshot {
    pub round: usize,
    pub sorted: bool,
    pub size: usize,
    pub best: f64,
    pub population_best: f64,
}

/// Records every report; stops the run after `stop_after` rounds if set.
#[derive(Default)]
pub struct Recorder {
    pub rounds: RefCell<Vec<RoundSnapshot>>,
    pub stop_after: Option<usize>,
}

impl ProgressCallback for Recorder {
    fn on_round(&self, report: &RoundReport<'_>) -> bool {
        self.rounds.borrow_mut().push(RoundSnapshot {
            round: report.round,
            sorted: report.population.is_sorted_descending(),
            size: report.population.len(),
            best: report.best.objective(),
            population_best: report.population.best().map(|p| p.objective()).unwrap_or(f64::NAN),
        });
        match self.stop_after {
            Some(n) => report.round < n,
            None => true,
        }
    }
}
