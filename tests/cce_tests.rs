mod common;

use autocal::evaluator::from_fn;
use autocal::optimizer::cce::{CceEngine, CceSettings, CceStats};
use autocal::optimizer::{CancelToken, Complex, Member};
use autocal::{CandidatePoint, EvaluationError, ParameterSpace, ParameterVector};
use common::{AnalyticEvaluator, ScriptedEvaluator};
use fastrand::Rng;
use proptest::prelude::*;

fn unit_line() -> ParameterSpace {
    ParameterSpace::from_triples([("x", 0.0, 10.0)]).unwrap()
}

fn settings(q: usize, alpha: usize) -> CceSettings {
    CceSettings {
        simplex_size: q,
        alpha,
        reflection_coef: 1.0,
        contraction_coef: 0.5,
    }
}

/// Builds a complex from `(x, objective)` pairs, best first.
fn complex_of(points: &[(f64, f64)]) -> Complex {
    Complex {
        id: 0,
        members: points
            .iter()
            .enumerate()
            .map(|(origin, &(x, f))| Member {
                origin,
                point: CandidatePoint::new(vec![x], f),
            })
            .collect(),
    }
}

#[test]
fn test_out_of_bounds_reflection_is_never_evaluated() {
    common::init_tracing();
    let space = unit_line();
    let engine = CceEngine::new(&space, settings(2, 1));

    // centroid 9, worst 1 -> reflection at 17
    let mut complex = complex_of(&[(9.0, 0.0), (1.0, -64.0)]);
    let mut evaluator = AnalyticEvaluator::new(&[9.0]);
    let mut rng = Rng::with_seed(7);

    let stats = engine
        .evolve(&mut complex, &mut evaluator, &mut rng, &CancelToken::new())
        .unwrap();

    assert_eq!(stats.reflections, 0);
    assert!(stats.mutations >= 1);
    assert_eq!(stats.evaluations, evaluator.calls());
    assert!(evaluator.seen.iter().all(|v| space.contains(v)));
    assert!(!evaluator.seen.contains(&vec![17.0]));
    assert_eq!(complex.len(), 2);
}

#[test]
fn test_failed_reflection_falls_back_to_contraction() {
    let space = unit_line();
    let engine = CceEngine::new(&space, settings(2, 1));

    // f = -(x - 4.5)^2; reflection lands on 7 (worse), contraction on 4
    let mut complex = complex_of(&[(5.0, -0.25), (3.0, -2.25)]);
    let mut evaluator = AnalyticEvaluator::new(&[4.5]);
    let mut rng = Rng::with_seed(1);

    let stats = engine
        .evolve(&mut complex, &mut evaluator, &mut rng, &CancelToken::new())
        .unwrap();

    assert_eq!(
        stats,
        CceStats {
            iterations: 1,
            reflections: 1,
            contractions: 1,
            mutations: 0,
            evaluations: 2,
        }
    );
    assert_eq!(evaluator.seen, vec![vec![7.0], vec![4.0]]);

    let replaced = &complex.members[1];
    assert_eq!(replaced.origin, 1);
    assert_eq!(replaced.point.values(), &[4.0]);
    assert_eq!(replaced.point.objective(), -0.25);
}

#[test]
fn test_mutation_replaces_worst_unconditionally() {
    let space = unit_line();
    let engine = CceEngine::new(&space, settings(2, 1));

    // reflection -> -5, contraction -> -3, mutation -> -100; all worse than 0
    let mut complex = complex_of(&[(6.0, 10.0), (4.0, 0.0)]);
    let mut evaluator = ScriptedEvaluator::new(&[-5.0, -3.0], -100.0);
    let mut rng = Rng::with_seed(3);

    let stats = engine
        .evolve(&mut complex, &mut evaluator, &mut rng, &CancelToken::new())
        .unwrap();

    assert_eq!(stats.reflections, 1);
    assert_eq!(stats.contractions, 1);
    assert_eq!(stats.mutations, 1);
    assert_eq!(stats.evaluations, 3);
    assert_eq!(evaluator.seen[0], vec![8.0]);
    assert_eq!(evaluator.seen[1], vec![5.0]);

    let last = &complex.members[1];
    assert_eq!(last.point.objective(), -100.0);
    assert_eq!(last.point.values(), evaluator.seen[2].as_slice());
    assert_eq!(complex.members[0].point.objective(), 10.0);
}

#[test]
fn test_evolve_leaves_complex_sorted() {
    let space = unit_line();
    let engine = CceEngine::new(&space, settings(3, 6));

    let mut complex = complex_of(&[(1.0, -1.0), (2.0, -2.0), (3.0, -3.0), (4.0, -4.0)]);
    let mut evaluator = from_fn(|p: &ParameterVector<'_>| -> Result<f64, EvaluationError> {
        Ok(-p.values()[0])
    });
    let mut rng = Rng::with_seed(11);

    let stats = engine
        .evolve(&mut complex, &mut evaluator, &mut rng, &CancelToken::new())
        .unwrap();

    assert_eq!(stats.iterations, 6);
    let objectives: Vec<f64> = complex.points().map(|p| p.objective()).collect();
    assert!(objectives.windows(2).all(|w| w[0] >= w[1]), "{:?}", objectives);

    let mut origins = complex.origins();
    origins.sort_unstable();
    assert_eq!(origins, vec![0, 1, 2, 3]);
}

#[test]
fn test_cancelled_engine_does_not_evaluate() {
    let space = unit_line();
    let engine = CceEngine::new(&space, settings(2, 5));
    let mut complex = complex_of(&[(5.0, 1.0), (3.0, 0.0)]);
    let mut evaluator = AnalyticEvaluator::new(&[5.0]);
    let cancel = CancelToken::new();
    cancel.cancel();

    let stats = engine
        .evolve(&mut complex, &mut evaluator, &mut Rng::with_seed(0), &cancel)
        .unwrap();

    assert_eq!(stats, CceStats::default());
    assert_eq!(evaluator.calls(), 0);
}

#[test]
fn test_evaluator_error_propagates() {
    let space = unit_line();
    let engine = CceEngine::new(&space, settings(2, 3));
    let mut complex = complex_of(&[(5.0, 1.0), (3.0, 0.0)]);
    let mut evaluator = common::FailingEvaluator::new(0);

    let err = engine
        .evolve(&mut complex, &mut evaluator, &mut Rng::with_seed(0), &CancelToken::new())
        .unwrap_err();
    assert!(err.to_string().contains("status 139"), "{}", err);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_every_evaluated_point_is_feasible(seed in any::<u64>(), alpha in 1usize..6) {
        let space = ParameterSpace::from_triples([("a", -1.0, 1.0), ("b", 0.0, 0.01)]).unwrap();
        let engine = CceEngine::new(&space, settings(3, alpha));
        let mut rng = Rng::with_seed(seed);
        let mut evaluator = AnalyticEvaluator::new(&[0.9, 0.005]);

        let members = (0..5)
            .map(|origin| {
                let values = space.sample(&mut rng);
                let f = common::neg_sq_dist(&values, &evaluator.target);
                Member { origin, point: CandidatePoint::new(values, f) }
            })
            .collect();
        let mut complex = Complex { id: 2, members };

        let stats = engine
            .evolve(&mut complex, &mut evaluator, &mut rng, &CancelToken::new())
            .unwrap();

        prop_assert_eq!(stats.iterations, alpha);
        prop_assert_eq!(stats.evaluations, evaluator.calls());
        for v in &evaluator.seen {
            prop_assert!(space.contains(v), "evaluated infeasible point {:?}", v);
        }
        prop_assert!(complex.points().all(|p| space.contains(p.values())));
    }
}
