use crate::error::AcResult;
use crate::optimizer::cce::{DEFAULT_CONTRACTION_COEF, DEFAULT_REFLECTION_COEF};
use crate::optimizer::runner::{
    CalibrationOptions, DEFAULT_CONVERGENCE_EPSILON, DEFAULT_CONVERGENCE_WINDOW,
    DEFAULT_MAX_TRIALS,
};
use crate::space::ParameterSpace;
use clap::Args;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Sequential,
    Parallel,
}

/// SCE settings as read from a JSON file or a host binary's command line.
#[derive(Args, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceParams {
    #[arg(long, default_value_t = 2)]
    pub num_complexes: usize,
    /// Defaults to 2n + 1 for n parameters.
    #[arg(long)]
    pub complex_size: Option<usize>,
    /// Defaults to n + 1 for n parameters.
    #[arg(long)]
    pub simplex_size: Option<usize>,
    #[arg(long, default_value_t = 1)]
    pub alpha: usize,

    #[arg(long, default_value_t = DEFAULT_MAX_TRIALS)]
    pub max_trials: usize,
    #[arg(long, default_value_t = DEFAULT_CONVERGENCE_EPSILON)]
    pub convergence_epsilon: f64,
    #[arg(long, default_value_t = DEFAULT_CONVERGENCE_WINDOW)]
    pub convergence_window: usize,

    #[arg(long, default_value_t = DEFAULT_REFLECTION_COEF)]
    pub reflection_coef: f64,
    #[arg(long, default_value_t = DEFAULT_CONTRACTION_COEF)]
    pub contraction_coef: f64,

    #[arg(long, default_value_t = ExecutionMode::Sequential)]
    pub execution: ExecutionMode,
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(long)]
    pub max_seconds: Option<u64>,
    #[arg(long)]
    pub workspace_root: Option<PathBuf>,
}

impl Default for SceParams {
    fn default() -> Self {
        Self {
            num_complexes: 2,
            complex_size: None,
            simplex_size: None,
            alpha: 1,
            max_trials: DEFAULT_MAX_TRIALS,
            convergence_epsilon: DEFAULT_CONVERGENCE_EPSILON,
            convergence_window: DEFAULT_CONVERGENCE_WINDOW,
            reflection_coef: DEFAULT_REFLECTION_COEF,
            contraction_coef: DEFAULT_CONTRACTION_COEF,
            execution: ExecutionMode::Sequential,
            seed: None,
            max_seconds: None,
            workspace_root: None,
        }
    }
}

impl SceParams {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> AcResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn complex_size_for(&self, space: &ParameterSpace) -> usize {
        self.complex_size.unwrap_or(2 * space.len() + 1)
    }

    pub fn simplex_size_for(&self, space: &ParameterSpace) -> usize {
        self.simplex_size.unwrap_or(space.len() + 1)
    }

    /// Resolves size defaults against `space`. Validation happens in
    /// [`Calibrator::new`](crate::optimizer::Calibrator::new).
    pub fn to_options(&self, space: &ParameterSpace) -> CalibrationOptions {
        let mut opts = CalibrationOptions::builder()
            .num_complexes(self.num_complexes)
            .complex_size(self.complex_size_for(space))
            .simplex_size(self.simplex_size_for(space))
            .alpha(self.alpha)
            .max_trials(self.max_trials)
            .convergence_epsilon(self.convergence_epsilon)
            .convergence_window(self.convergence_window)
            .reflection_coef(self.reflection_coef)
            .contraction_coef(self.contraction_coef)
            .build();
        opts.max_time = self.max_seconds.map(Duration::from_secs);
        opts.workspace_root = self.workspace_root.clone();
        opts
    }

    pub fn rng(&self) -> fastrand::Rng {
        if let Some(s) = self.seed {
            fastrand::Rng::with_seed(s)
        } else {
            fastrand::Rng::new()
        }
    }
}
