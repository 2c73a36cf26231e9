//! One-shot evaluation of a recommendation log against a feedback log
//!
//! Every metric that can be derived from logs alone is computed here. Ground
//! truth comes from [`resolve_preferences`], and an item is relevant to a
//! user when the resolved preference reaches the configured threshold.
//! Coverage and diversity need a live recommender or item payloads and are
//! left to the caller.

use super::click_through::{ctr, CtrDefinition};
use super::classification::{accuracy, mean_average_precision, precision, recall};
use super::latency::{mean_response_time, median_response_time};
use super::preferences::{resolve_preferences, Aggregator};
use super::ranking::{dcg, mrr, ndcg};
use super::rating::{mae, rmse};
use crate::config::EvaluationSettings;
use crate::error::Result;
use crate::types::{Feedback, ItemId, Recommendation, UserId, UserItemPair};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// All log-derivable metrics; undefined values are NaN (`null` in JSON)
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub recommendation_lists: usize,
    pub users: usize,
    pub feedback_events: usize,
    pub resolved_preferences: usize,
    pub rank_position: usize,
    pub ctr_definition: CtrDefinition,

    pub mae: f64,
    pub rmse: f64,
    pub mrr: f64,
    pub dcg: f64,
    pub ndcg: f64,
    pub ctr: f64,
    pub precision: f64,
    pub recall: f64,
    pub accuracy: f64,
    pub mean_average_precision: f64,
    pub mean_response_time_ms: f64,
    pub median_response_time_ms: f64,
}

impl MetricsReport {
    /// Compute with the aggregator named in `settings`
    pub fn compute(
        recommendations: &[Recommendation],
        feedback: &[Feedback],
        settings: &EvaluationSettings,
    ) -> Result<Self> {
        let aggregator = settings.aggregator.build();
        Self::compute_with(recommendations, feedback, settings, aggregator.as_ref())
    }

    /// Compute with an explicitly supplied aggregator
    pub fn compute_with(
        recommendations: &[Recommendation],
        feedback: &[Feedback],
        settings: &EvaluationSettings,
        aggregator: Option<&Aggregator>,
    ) -> Result<Self> {
        let preferences = resolve_preferences(feedback, aggregator)?;
        let k = settings.rank_position;
        let threshold = settings.relevance_threshold;
        let ctr_definition = settings.ctr_definition();

        let relevant_pairs: HashSet<UserItemPair> = preferences
            .iter()
            .filter(|(_, value)| **value >= threshold)
            .map(|(pair, _)| *pair)
            .collect();

        let mut relevant_by_user: HashMap<UserId, Vec<ItemId>> = HashMap::new();
        for pair in &relevant_pairs {
            relevant_by_user.entry(pair.user_id).or_default().push(pair.item_id);
        }

        let is_relevant =
            |user_id: UserId, item_id: ItemId| relevant_pairs.contains(&UserItemPair::new(user_id, item_id));
        let relevant_items =
            |user_id: UserId| relevant_by_user.get(&user_id).cloned().unwrap_or_default();

        let users: HashSet<UserId> = recommendations.iter().map(|rec| rec.user_id).collect();

        Ok(Self {
            recommendation_lists: recommendations.len(),
            users: users.len(),
            feedback_events: feedback.len(),
            resolved_preferences: preferences.len(),
            rank_position: k,
            mae: mae(recommendations, &preferences),
            rmse: rmse(recommendations, &preferences),
            mrr: mrr(recommendations, is_relevant),
            dcg: dcg(recommendations, &preferences, k),
            ndcg: ndcg(recommendations, &preferences, k),
            ctr: ctr(recommendations, feedback, &ctr_definition),
            precision: precision(recommendations, is_relevant),
            recall: recall(recommendations, relevant_items),
            accuracy: settings
                .number_of_items
                .map_or(f64::NAN, |n| accuracy(recommendations, relevant_items, n)),
            mean_average_precision: mean_average_precision(recommendations, is_relevant),
            mean_response_time_ms: mean_response_time(recommendations),
            median_response_time_ms: median_response_time(recommendations),
            ctr_definition,
        })
    }
}

fn metric(value: f64) -> String {
    if value.is_nan() {
        "n/a".to_string()
    } else {
        format!("{:.5}", value)
    }
}

impl fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} recommendation lists for {} users, {} feedback events ({} resolved preferences)",
            self.recommendation_lists, self.users, self.feedback_events, self.resolved_preferences
        )?;

        let rows = [
            ("MAE".to_string(), self.mae),
            ("RMSE".to_string(), self.rmse),
            ("MRR".to_string(), self.mrr),
            (format!("DCG@{}", self.rank_position), self.dcg),
            (format!("NDCG@{}", self.rank_position), self.ndcg),
            (format!("CTR ({})", self.ctr_definition), self.ctr),
            ("Precision".to_string(), self.precision),
            ("Recall".to_string(), self.recall),
            ("Accuracy".to_string(), self.accuracy),
            ("MAP".to_string(), self.mean_average_precision),
            ("Mean response (ms)".to_string(), self.mean_response_time_ms),
            ("Median response (ms)".to_string(), self.median_response_time_ms),
        ];

        for (label, value) in rows {
            writeln!(f, "  {:<34} {}", label, metric(value))?;
        }
        Ok(())
    }
}
