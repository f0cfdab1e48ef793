use crate::error::AcResult;
use crate::evaluator::{evaluate_checked, ModelEvaluator};
use crate::optimizer::partition::Complex;
use crate::optimizer::runner::CancelToken;
use crate::optimizer::sampling::weighted_sample_without_replacement;
use crate::optimizer::weights::rank_weights;
use crate::point::{CandidatePoint, ParameterVector};
use crate::space::ParameterSpace;
use fastrand::Rng;
use serde::Serialize;
use std::ops::AddAssign;
use tracing::trace;

pub const DEFAULT_REFLECTION_COEF: f64 = 1.0;
pub const DEFAULT_CONTRACTION_COEF: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CceSettings {
    pub simplex_size: usize,
    pub alpha: usize,
    pub reflection_coef: f64,
    pub contraction_coef: f64,
}

/// Operator counts for one or more complexes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CceStats {
    pub iterations: usize,
    /// In-bounds reflections that were evaluated.
    pub reflections: usize,
    pub contractions: usize,
    pub mutations: usize,
    pub evaluations: usize,
}

impl AddAssign for CceStats {
    fn add_assign(&mut self, rhs: Self) {
        self.iterations += rhs.iterations;
        self.reflections += rhs.reflections;
        self.contractions += rhs.contractions;
        self.mutations += rhs.mutations;
        self.evaluations += rhs.evaluations;
    }
}

/// Coordinate-wise mean.
pub fn centroid<'a, I>(points: I) -> Vec<f64>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut sum: Vec<f64> = Vec::new();
    let mut n = 0usize;
    for p in points {
        if sum.is_empty() {
            sum = vec![0.0; p.len()];
        }
        for (s, &v) in sum.iter_mut().zip(p) {
            *s += v;
        }
        n += 1;
    }
    if n > 0 {
        let n = n as f64;
        sum.iter_mut().for_each(|s| *s /= n);
    }
    sum
}

/// `centroid + coef * (centroid - worst)`
pub fn reflect(centroid: &[f64], worst: &[f64], coef: f64) -> Vec<f64> {
    centroid
        .iter()
        .zip(worst)
        .map(|(&c, &w)| c + coef * (c - w))
        .collect()
}

/// `worst + coef * (centroid - worst)`
pub fn contract(worst: &[f64], centroid: &[f64], coef: f64) -> Vec<f64> {
    worst
        .iter()
        .zip(centroid)
        .map(|(&w, &c)| w + coef * (c - w))
        .collect()
}

/// Competitive Complex Evolution over a single complex.
pub struct CceEngine<'a> {
    space: &'a ParameterSpace,
    settings: CceSettings,
}

impl<'a> CceEngine<'a> {
    pub fn new(space: &'a ParameterSpace, settings: CceSettings) -> Self {
        Self { space, settings }
    }

    pub fn settings(&self) -> &CceSettings {
        &self.settings
    }

    /// Runs `alpha` inner iterations on `complex`.
    ///
    /// Stops early (without error) when `cancel` fires; the caller decides
    /// whether the partially evolved complex is kept.
    pub fn evolve<E: ModelEvaluator + ?Sized>(
        &self,
        complex: &mut Complex,
        evaluator: &mut E,
        rng: &mut Rng,
        cancel: &CancelToken,
    ) -> AcResult<CceStats> {
        let mut stats = CceStats::default();

        for _ in 0..self.settings.alpha {
            if cancel.is_cancelled() {
                break;
            }
            self.step(complex, evaluator, rng, &mut stats)?;
        }

        complex.sort_descending();
        Ok(stats)
    }

    /// One inner iteration: select a simplex and replace its worst point.
    pub fn step<E: ModelEvaluator + ?Sized>(
        &self,
        complex: &mut Complex,
        evaluator: &mut E,
        rng: &mut Rng,
        stats: &mut CceStats,
    ) -> AcResult<()> {
        let q = self.settings.simplex_size;
        stats.iterations += 1;

        // 1. Rank the complex and weight it
        complex.sort_descending();
        let weights = rank_weights(complex.len());

        // 2. Simplex positions, ascending == best-first since the complex is sorted
        let simplex = weighted_sample_without_replacement(rng, &weights, q);
        let worst_pos = simplex[q - 1];
        let worst = complex.members[worst_pos].point.clone();

        // 3. Centroid of everything but the worst
        let centroid = centroid(
            simplex[..q - 1]
                .iter()
                .map(|&i| complex.members[i].point.values()),
        );

        // 4-5. Reflection, or mutation when it leaves the space
        let reflected = reflect(&centroid, worst.values(), self.settings.reflection_coef);
        let mut candidate = if self.space.contains(&reflected) {
            stats.reflections += 1;
            self.evaluate(reflected, evaluator, stats)?
        } else {
            trace!(complex = complex.id, "reflection out of bounds, mutating");
            self.mutate(evaluator, rng, stats)?
        };

        // 6. Contraction towards the centroid
        if candidate.objective() < worst.objective() {
            let contracted = contract(worst.values(), &centroid, self.settings.contraction_coef);
            candidate = if self.space.contains(&contracted) {
                stats.contractions += 1;
                self.evaluate(contracted, evaluator, stats)?
            } else {
                self.mutate(evaluator, rng, stats)?
            };

            // 7. Still worse: random point
            if candidate.objective() < worst.objective() {
                trace!(complex = complex.id, "contraction failed, mutating");
                candidate = self.mutate(evaluator, rng, stats)?;
            }
        }

        // 8-9. Unconditional replacement at the same member slot
        complex.members[worst_pos].point = candidate;
        Ok(())
    }

    fn mutate<E: ModelEvaluator + ?Sized>(
        &self,
        evaluator: &mut E,
        rng: &mut Rng,
        stats: &mut CceStats,
    ) -> AcResult<CandidatePoint> {
        stats.mutations += 1;
        let values = self.space.sample(rng);
        self.evaluate(values, evaluator, stats)
    }

    fn evaluate<E: ModelEvaluator + ?Sized>(
        &self,
        values: Vec<f64>,
        evaluator: &mut E,
        stats: &mut CceStats,
    ) -> AcResult<CandidatePoint> {
        debug_assert!(self.space.contains(&values));
        let objective = evaluate_checked(evaluator, &ParameterVector::new(self.space, &values))?;
        stats.evaluations += 1;
        Ok(CandidatePoint::new(values, objective))
    }
}
