//! Ground-truth preferences from logged feedback
//!
//! When a log holds explicit ratings only, the truth for a pair is simply
//! the newest rating. Implicit feedback has no common scale, so as soon as
//! any is present the caller must supply an [`Aggregator`] that turns all
//! feedback for one pair into a preference value.

use crate::error::{RecsysError, Result};
use crate::types::{Feedback, UserItemPair};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Turns all feedback for one `(user, item)` pair, in log order, into a
/// preference; `None` leaves the pair without ground truth
pub type Aggregator = Arc<dyn Fn(&[Feedback]) -> Option<f32> + Send + Sync>;

/// Aggregators shipped with the crate, selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinAggregator {
    /// No aggregator; logs with implicit feedback cannot be resolved
    #[default]
    None,
    /// [`latest_explicit`]
    LatestExplicit,
    /// [`mean`]
    Mean,
}

impl BuiltinAggregator {
    pub fn build(self) -> Option<Aggregator> {
        let aggregator: Aggregator = match self {
            BuiltinAggregator::None => return None,
            BuiltinAggregator::LatestExplicit => Arc::new(latest_explicit),
            BuiltinAggregator::Mean => Arc::new(mean),
        };
        Some(aggregator)
    }
}

/// Resolve one preference per pair from a feedback log
///
/// Explicit-only logs resolve to the rating with the latest `at_time`, ties
/// going to the one logged last; click events are ignored. Any implicit
/// feedback routes every pair through `aggregator` and fails with
/// [`RecsysError::MissingAggregator`] when there is none.
pub fn resolve_preferences(
    feedback: &[Feedback],
    aggregator: Option<&Aggregator>,
) -> Result<HashMap<UserItemPair, f32>> {
    if !feedback.iter().any(Feedback::is_implicit) {
        return Ok(resolve_explicit(feedback));
    }

    let aggregator = aggregator.ok_or(RecsysError::MissingAggregator)?;

    let mut groups: HashMap<UserItemPair, Vec<Feedback>> = HashMap::new();
    for fb in feedback {
        groups.entry(fb.pair()).or_default().push(fb.clone());
    }

    let total = groups.len();
    let resolved: HashMap<UserItemPair, f32> = groups
        .into_iter()
        .filter_map(|(pair, group)| aggregator(&group).map(|value| (pair, value)))
        .collect();

    debug!(
        "Aggregated {} of {} feedback pairs into preferences",
        resolved.len(),
        total
    );
    Ok(resolved)
}

fn resolve_explicit(feedback: &[Feedback]) -> HashMap<UserItemPair, f32> {
    let mut latest: HashMap<UserItemPair, (DateTime<Utc>, f32)> = HashMap::new();

    for fb in feedback {
        if let Feedback::Explicit {
            at_time, preference, ..
        } = fb
        {
            let entry = latest.entry(fb.pair()).or_insert((*at_time, *preference));
            if *at_time >= entry.0 {
                *entry = (*at_time, *preference);
            }
        }
    }

    latest
        .into_iter()
        .map(|(pair, (_, value))| (pair, value))
        .collect()
}

/// Newest explicit rating in the group; implicit feedback and clicks are ignored
pub fn latest_explicit(group: &[Feedback]) -> Option<f32> {
    group
        .iter()
        .filter_map(|fb| match fb {
            Feedback::Explicit {
                at_time, preference, ..
            } => Some((*at_time, *preference)),
            _ => None,
        })
        .fold(None, |best: Option<(DateTime<Utc>, f32)>, current| match best {
            Some(b) if b.0 > current.0 => Some(b),
            _ => Some(current),
        })
        .map(|(_, value)| value)
}

/// Mean of explicit ratings and numeric implicit values in the group
pub fn mean(group: &[Feedback]) -> Option<f32> {
    let values: Vec<f32> = group
        .iter()
        .filter_map(|fb| match fb {
            Feedback::Explicit { preference, .. } => Some(*preference),
            Feedback::Implicit { value, .. } => value.trim().parse::<f32>().ok(),
            Feedback::Click { .. } => None,
        })
        .collect();

    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f32>() / values.len() as f32)
}
