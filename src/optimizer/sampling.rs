use fastrand::Rng;

/// Draws `k` distinct indices from `0..weights.len()` with probability
/// proportional to the remaining weights (roulette wheel, one spin per pick).
///
/// Returned indices are in ascending order. Zero-weight entries are only
/// taken once every positive entry is exhausted. `k` must not exceed
/// `weights.len()`; larger values are capped.
pub fn weighted_sample_without_replacement(rng: &mut Rng, weights: &[f64], k: usize) -> Vec<usize> {
    debug_assert!(k <= weights.len(), "cannot draw {} of {}", k, weights.len());
    let k = k.min(weights.len());

    let mut remaining: Vec<f64> = weights.iter().map(|w| w.max(0.0)).collect();
    let mut taken = vec![false; weights.len()];
    let mut picks = Vec::with_capacity(k);

    for _ in 0..k {
        let total: f64 = remaining.iter().sum();

        let pick = if total > 0.0 {
            let target = rng.f64() * total;
            let mut acc = 0.0;
            let mut chosen = None;
            let mut last_positive = None;
            for (i, &w) in remaining.iter().enumerate() {
                if w <= 0.0 {
                    continue;
                }
                last_positive = Some(i);
                acc += w;
                if target < acc {
                    chosen = Some(i);
                    break;
                }
            }
            // Accumulated rounding can leave target just above the final sum
            chosen.or(last_positive)
        } else {
            None
        };

        let idx = match pick {
            Some(i) => i,
            None => {
                let free: Vec<usize> = (0..taken.len()).filter(|&i| !taken[i]).collect();
                free[rng.usize(0..free.len())]
            }
        };

        taken[idx] = true;
        remaining[idx] = 0.0;
        picks.push(idx);
    }

    picks.sort_unstable();
    picks
}
