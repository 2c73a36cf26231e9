//! Catalogue coverage and intra-list diversity

use crate::recommender::Recommender;
use crate::types::{Item, Recommendation, User};

/// Fraction of `users` the recommender is able to serve; NaN for no users
pub fn user_coverage<R>(recommender: &R, users: &[User]) -> f64
where
    R: Recommender + ?Sized,
{
    fraction(users, |user| recommender.can_recommend_to_user(user))
}

/// Fraction of `items` the recommender is able to recommend; NaN for no items
pub fn item_coverage<R>(recommender: &R, items: &[Item]) -> f64
where
    R: Recommender + ?Sized,
{
    fraction(items, |item| recommender.can_recommend_item(item))
}

fn fraction<T>(population: &[T], covered: impl Fn(&T) -> bool) -> f64 {
    if population.is_empty() {
        return f64::NAN;
    }
    let hits = population.iter().filter(|x| covered(x)).count();
    hits as f64 / population.len() as f64
}

/// Mean pairwise difference inside a single list
///
/// `None` for lists shorter than two items.
pub fn list_diversity<F>(rec: &Recommendation, difference: F) -> Option<f64>
where
    F: Fn(&Item, &Item) -> f64,
{
    let items = &rec.items;
    let n = items.len();
    if n < 2 {
        return None;
    }

    let mut total = 0.0;
    for (i, a) in items.iter().enumerate() {
        for b in &items[i + 1..] {
            total += difference(&a.item, &b.item);
        }
    }

    let pairs = n * (n - 1) / 2;
    Some(total / pairs as f64)
}

/// Average intra-list diversity over lists with at least two items
///
/// NaN when no list qualifies.
pub fn diversity<F>(recommendations: &[Recommendation], difference: F) -> f64
where
    F: Fn(&Item, &Item) -> f64,
{
    let scores: Vec<f64> = recommendations
        .iter()
        .filter_map(|rec| list_diversity(rec, &difference))
        .collect();

    if scores.is_empty() {
        return f64::NAN;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}
