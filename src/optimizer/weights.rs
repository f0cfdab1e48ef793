/// Triangular rank weight for rank `r` (1 = best) out of `m` points:
/// `2 (m + 1 - r) / (m (m + 1))`.
#[inline(always)]
pub fn rank_weight(rank: usize, m: usize) -> f64 {
    debug_assert!(rank >= 1 && rank <= m);
    let m_f = m as f64;
    2.0 * (m_f + 1.0 - rank as f64) / (m_f * (m_f + 1.0))
}

/// Selection weights for a complex already sorted best-first. Sums to 1.
pub fn rank_weights(m: usize) -> Vec<f64> {
    (1..=m).map(|r| rank_weight(r, m)).collect()
}
