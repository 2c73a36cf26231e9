//! Rank-aware metrics: mean reciprocal rank and (normalized) discounted
//! cumulative gain.

use crate::types::{ItemId, Recommendation, UserId, UserItemPair};
use std::collections::HashMap;

/// Logarithmic discount for a 0-based rank
fn discount(rank_index: usize) -> f64 {
    ((rank_index + 2) as f64).log2()
}

/// Ground-truth relevance at each of the first `k` ranks; 0 for unknown
/// pairs and for ranks past the end of the list
fn gains(rec: &Recommendation, actual: &HashMap<UserItemPair, f32>, k: usize) -> Vec<f64> {
    (0..k)
        .map(|i| {
            rec.items
                .get(i)
                .and_then(|item| actual.get(&UserItemPair::new(rec.user_id, item.item.id)))
                .map_or(0.0, |v| f64::from(*v))
        })
        .collect()
}

fn discounted_sum(gains: &[f64]) -> f64 {
    gains
        .iter()
        .enumerate()
        .map(|(i, gain)| gain / discount(i))
        .sum()
}

/// DCG@k of a single list
pub fn list_dcg(rec: &Recommendation, actual: &HashMap<UserItemPair, f32>, k: usize) -> f64 {
    discounted_sum(&gains(rec, actual, k))
}

/// Best achievable DCG@k for the items of a single list
pub fn list_idcg(rec: &Recommendation, actual: &HashMap<UserItemPair, f32>, k: usize) -> f64 {
    let mut relevance: Vec<f64> = rec
        .items
        .iter()
        .map(|item| {
            actual
                .get(&UserItemPair::new(rec.user_id, item.item.id))
                .map_or(0.0, |v| f64::from(*v))
        })
        .collect();
    relevance.sort_by(|a, b| b.total_cmp(a));
    relevance.resize(k, 0.0);

    discounted_sum(&relevance)
}

/// Mean reciprocal rank of the first relevant item
///
/// Lists without a relevant item contribute 0 but still count. NaN for no
/// lists.
pub fn mrr<F>(recommendations: &[Recommendation], is_relevant: F) -> f64
where
    F: Fn(UserId, ItemId) -> bool,
{
    if recommendations.is_empty() {
        return f64::NAN;
    }

    let reciprocal_sum: f64 = recommendations
        .iter()
        .filter_map(|rec| {
            rec.item_ids()
                .position(|item_id| is_relevant(rec.user_id, item_id))
                .map(|pos| 1.0 / (pos + 1) as f64)
        })
        .sum();

    reciprocal_sum / recommendations.len() as f64
}

/// Average DCG@k over all lists; NaN for no lists
pub fn dcg(
    recommendations: &[Recommendation],
    actual: &HashMap<UserItemPair, f32>,
    k: usize,
) -> f64 {
    if recommendations.is_empty() {
        return f64::NAN;
    }

    let total: f64 = recommendations
        .iter()
        .map(|rec| list_dcg(rec, actual, k))
        .sum();
    total / recommendations.len() as f64
}

/// Average NDCG@k over lists whose ideal DCG is non-zero
///
/// NaN when no list has any positive ideal gain.
pub fn ndcg(
    recommendations: &[Recommendation],
    actual: &HashMap<UserItemPair, f32>,
    k: usize,
) -> f64 {
    let mut sum = 0.0;
    let mut counted = 0usize;

    for rec in recommendations {
        let idcg = list_idcg(rec, actual, k);
        if idcg == 0.0 {
            continue;
        }
        sum += list_dcg(rec, actual, k) / idcg;
        counted += 1;
    }

    if counted == 0 {
        return f64::NAN;
    }
    sum / counted as f64
}
