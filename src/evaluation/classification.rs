//! Set-based relevance metrics: precision, recall, accuracy and mean
//! average precision.
//!
//! Relevance is supplied by the caller, either per `(user, item)` pair or as
//! the full relevant item set of a user.

use crate::types::{ItemId, Recommendation, UserId};
use std::collections::{BTreeMap, HashSet};

/// Union of recommended items per user, ordered by user id
fn recommended_by_user(recommendations: &[Recommendation]) -> BTreeMap<UserId, HashSet<ItemId>> {
    let mut by_user: BTreeMap<UserId, HashSet<ItemId>> = BTreeMap::new();
    for rec in recommendations {
        by_user.entry(rec.user_id).or_default().extend(rec.item_ids());
    }
    by_user
}

/// Fraction of all recommended slots that are relevant
///
/// Repeated recommendations count once per slot. NaN when nothing was
/// recommended.
pub fn precision<F>(recommendations: &[Recommendation], is_relevant: F) -> f64
where
    F: Fn(UserId, ItemId) -> bool,
{
    let mut total = 0usize;
    let mut relevant = 0usize;

    for rec in recommendations {
        for item_id in rec.item_ids() {
            total += 1;
            if is_relevant(rec.user_id, item_id) {
                relevant += 1;
            }
        }
    }

    if total == 0 {
        return f64::NAN;
    }
    relevant as f64 / total as f64
}

/// Mean over users of the fraction of their relevant items that were recommended
///
/// Users with no relevant items are skipped. NaN when no user remains.
pub fn recall<F>(recommendations: &[Recommendation], relevant_items: F) -> f64
where
    F: Fn(UserId) -> Vec<ItemId>,
{
    let mut sum = 0.0;
    let mut users = 0usize;

    for (user_id, recommended) in recommended_by_user(recommendations) {
        let relevant: HashSet<ItemId> = relevant_items(user_id).into_iter().collect();
        if relevant.is_empty() {
            continue;
        }
        let hits = relevant.intersection(&recommended).count();
        sum += hits as f64 / relevant.len() as f64;
        users += 1;
    }

    if users == 0 {
        return f64::NAN;
    }
    sum / users as f64
}

/// Mean over users of `(TP + TN) / number_of_items`
///
/// With `R` the recommended set and `V` the relevant set of a user,
/// `TP = |R ∩ V|` and `TN = number_of_items - |R ∪ V|`. NaN when there are
/// no users or the catalog size is zero.
pub fn accuracy<F>(recommendations: &[Recommendation], relevant_items: F, number_of_items: usize) -> f64
where
    F: Fn(UserId) -> Vec<ItemId>,
{
    if number_of_items == 0 {
        return f64::NAN;
    }

    let by_user = recommended_by_user(recommendations);
    if by_user.is_empty() {
        return f64::NAN;
    }

    let catalog = number_of_items as f64;
    let sum: f64 = by_user
        .iter()
        .map(|(user_id, recommended)| {
            let relevant: HashSet<ItemId> = relevant_items(*user_id).into_iter().collect();
            let true_positives = recommended.intersection(&relevant).count() as f64;
            let union = recommended.union(&relevant).count() as f64;
            let true_negatives = catalog - union;
            (true_positives + true_negatives) / catalog
        })
        .sum();

    sum / by_user.len() as f64
}

/// Mean over users of the precision of that user's lists
///
/// Users whose lists are all empty have no defined precision and are
/// skipped. NaN when no user remains.
pub fn mean_average_precision<F>(recommendations: &[Recommendation], is_relevant: F) -> f64
where
    F: Fn(UserId, ItemId) -> bool,
{
    let mut per_user: BTreeMap<UserId, (usize, usize)> = BTreeMap::new();
    for rec in recommendations {
        let entry = per_user.entry(rec.user_id).or_default();
        for item_id in rec.item_ids() {
            entry.0 += 1;
            if is_relevant(rec.user_id, item_id) {
                entry.1 += 1;
            }
        }
    }

    let precisions: Vec<f64> = per_user
        .values()
        .filter(|(total, _)| *total > 0)
        .map(|(total, relevant)| *relevant as f64 / *total as f64)
        .collect();

    if precisions.is_empty() {
        return f64::NAN;
    }
    precisions.iter().sum::<f64>() / precisions.len() as f64
}
