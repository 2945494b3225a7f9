//! Reciprocal-rank fusion of per-space rankings.
//!
//! Combines independently ranked result lists using only rank positions,
//! never raw scores. Cosine similarities, sparse dot products and max-sim
//! sums live on incompatible scales; rank-based fusion sidesteps any
//! per-space score normalization.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;

/// Rank-smoothing constant from Cormack, Clarke and Buettcher (SIGIR 2009).
///
/// Dampens the dominance of top ranks so an item ranked well by several
/// spaces can outscore an item ranked first by only one.
pub const RRF_K: usize = 60;

/// Fuses ranked lists into one ranking by reciprocal rank.
///
/// Each item's fused score is the sum of `1 / (k + rank)` over every list
/// it appears in, with ranks starting at 1. Output is sorted by fused score
/// descending; ties keep first-appearance order across the input lists
/// (earlier list first, then earlier rank).
pub fn reciprocal_rank_fusion<T: Clone + Eq + Hash>(
    rankings: &[Vec<(T, f32)>],
    k: usize,
) -> Vec<(T, f32)> {
    let mut fused: HashMap<T, f32> = HashMap::new();
    let mut order: Vec<T> = Vec::new();

    for ranking in rankings {
        for (rank, (item, _score)) in ranking.iter().enumerate() {
            let contribution = 1.0 / (k + rank + 1) as f32;
            match fused.get_mut(item) {
                Some(score) => *score += contribution,
                None => {
                    fused.insert(item.clone(), contribution);
                    order.push(item.clone());
                }
            }
        }
    }

    let mut combined: Vec<(T, f32)> = order
        .into_iter()
        .map(|item| {
            let score = fused.get(&item).copied().unwrap_or(0.0);
            (item, score)
        })
        .collect();
    // Stable sort keeps first-appearance order among equal scores.
    combined.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    combined
}
