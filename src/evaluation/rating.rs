//! Rating-error metrics: how far predicted preferences are from observed ones.
//!
//! Only recommended items that carry a prediction take part, and only where
//! ground truth exists for the same `(user, item)` pair.

use crate::types::{Recommendation, UserItemPair, UserItemPreference};
use std::collections::{HashMap, HashSet};

/// Distinct `(pair, predicted value)` entries across all lists, in first-seen order
pub fn expected_preferences(recommendations: &[Recommendation]) -> Vec<UserItemPreference> {
    let mut seen = HashSet::new();
    let mut expected = Vec::new();

    for rec in recommendations {
        for item in &rec.items {
            let Some(value) = item.expected_preference else {
                continue;
            };
            let pair = UserItemPair::new(rec.user_id, item.item.id);
            if seen.insert((pair, value.to_bits())) {
                expected.push(UserItemPreference::new(pair, value));
            }
        }
    }

    expected
}

/// `(actual - predicted)` for every prediction with known ground truth
fn errors<'a>(
    recommendations: &[Recommendation],
    actual: &'a HashMap<UserItemPair, f32>,
) -> impl Iterator<Item = f64> + 'a {
    expected_preferences(recommendations)
        .into_iter()
        .filter_map(move |exp| {
            actual
                .get(&exp.pair)
                .map(|truth| f64::from(*truth) - f64::from(exp.value))
        })
}

/// Mean absolute error; NaN when no prediction can be compared
pub fn mae(recommendations: &[Recommendation], actual: &HashMap<UserItemPair, f32>) -> f64 {
    let (sum, count) = errors(recommendations, actual)
        .fold((0.0, 0usize), |(sum, count), err| (sum + err.abs(), count + 1));

    if count == 0 {
        return f64::NAN;
    }
    sum / count as f64
}

/// Root mean square error; NaN when no prediction can be compared
pub fn rmse(recommendations: &[Recommendation], actual: &HashMap<UserItemPair, f32>) -> f64 {
    let (sum, count) = errors(recommendations, actual)
        .fold((0.0, 0usize), |(sum, count), err| (sum + err * err, count + 1));

    if count == 0 {
        return f64::NAN;
    }
    (sum / count as f64).sqrt()
}
