//! Recording wrapper around a recommender
//!
//! A [`Tracker`] is itself a [`Recommender`]. Serving calls pass straight
//! through to the wrapped system; on success the returned list is recorded
//! with its wall-clock time and measured latency. Feedback is recorded first
//! and then forwarded.
//!
//! # Key Features
//!
//! - **Lock-free recording**: both logs are [`AppendLog`]s, so serving threads never block each other
//! - **Failure transparency**: delegate errors propagate unchanged and nothing is recorded
//! - **Snapshot evaluation**: every metric runs over point-in-time copies of the logs
//! - **Persistence**: logs can be written to and restored from the text log format

use crate::config::EvaluationSettings;
use crate::error::{RecsysError, Result};
use crate::evaluation::click_through::{self, CtrDefinition};
use crate::evaluation::preferences::{resolve_preferences, Aggregator};
use crate::evaluation::report::MetricsReport;
use crate::evaluation::{classification, coverage, latency, ranking, rating};
use crate::recommender::Recommender;
use crate::storage::{self, AppendLog};
use crate::types::{Feedback, Item, ItemId, Recommendation, RecommendedItem, User, UserId, UserItemPair};
use chrono::Utc;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Records every recommendation served by, and all feedback sent to, one system
pub struct Tracker {
    name: String,
    system: Arc<dyn Recommender>,
    recommendations: AppendLog<Recommendation>,
    feedback: AppendLog<Feedback>,
    aggregator: Option<Aggregator>,
}

impl Tracker {
    /// Track `system`, naming the tracker after it
    pub fn new(system: Arc<dyn Recommender>) -> Self {
        Self {
            name: system.name(),
            system,
            recommendations: AppendLog::new(),
            feedback: AppendLog::new(),
            aggregator: None,
        }
    }

    /// Override the name written as the recommendation log header
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Aggregator used to resolve ground truth from implicit feedback
    pub fn with_aggregator(mut self, aggregator: Aggregator) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    /// Name of the tracker, used as the recommendation log header
    pub fn tracker_name(&self) -> &str {
        &self.name
    }

    /// The wrapped system
    pub fn system(&self) -> &Arc<dyn Recommender> {
        &self.system
    }

    /// Snapshot of the recommendation log in insertion order
    pub fn recommendations(&self) -> Vec<Recommendation> {
        self.recommendations.snapshot()
    }

    /// Snapshot of the feedback log in insertion order
    pub fn feedback(&self) -> Vec<Feedback> {
        self.feedback.snapshot()
    }

    pub fn recommendation_count(&self) -> usize {
        self.recommendations.len()
    }

    pub fn feedback_count(&self) -> usize {
        self.feedback.len()
    }

    /// Record feedback without forwarding it, e.g. when replaying history
    pub fn add_feedback<I>(&self, batch: I)
    where
        I: IntoIterator<Item = Feedback>,
    {
        self.feedback.push_all(batch);
    }

    fn record(&self, user: &User, items: &[RecommendedItem], started: Instant) {
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.recommendations
            .push(Recommendation::new(user.id, items.to_vec(), Utc::now(), elapsed_ms));
        debug!(
            "{} recorded {} items for user {} in {}ms",
            self.name,
            items.len(),
            user.id,
            elapsed_ms
        );
    }

    /// Ground truth resolved from the feedback log
    pub fn preferences(&self) -> Result<HashMap<UserItemPair, f32>> {
        resolve_preferences(&self.feedback(), self.aggregator.as_ref())
    }

    pub fn mae(&self) -> Result<f64> {
        Ok(rating::mae(&self.recommendations(), &self.preferences()?))
    }

    pub fn rmse(&self) -> Result<f64> {
        Ok(rating::rmse(&self.recommendations(), &self.preferences()?))
    }

    pub fn dcg(&self, k: usize) -> Result<f64> {
        Ok(ranking::dcg(&self.recommendations(), &self.preferences()?, k))
    }

    pub fn ndcg(&self, k: usize) -> Result<f64> {
        Ok(ranking::ndcg(&self.recommendations(), &self.preferences()?, k))
    }

    pub fn mrr<F>(&self, is_relevant: F) -> f64
    where
        F: Fn(UserId, ItemId) -> bool,
    {
        ranking::mrr(&self.recommendations(), is_relevant)
    }

    pub fn ctr(&self, definition: &CtrDefinition) -> f64 {
        click_through::ctr(&self.recommendations(), &self.feedback(), definition)
    }

    pub fn user_coverage(&self, users: &[User]) -> f64 {
        coverage::user_coverage(self.system.as_ref(), users)
    }

    pub fn item_coverage(&self, items: &[Item]) -> f64 {
        coverage::item_coverage(self.system.as_ref(), items)
    }

    pub fn diversity<F>(&self, difference: F) -> f64
    where
        F: Fn(&Item, &Item) -> f64,
    {
        coverage::diversity(&self.recommendations(), difference)
    }

    pub fn precision<F>(&self, is_relevant: F) -> f64
    where
        F: Fn(UserId, ItemId) -> bool,
    {
        classification::precision(&self.recommendations(), is_relevant)
    }

    pub fn recall<F>(&self, relevant_items: F) -> f64
    where
        F: Fn(UserId) -> Vec<ItemId>,
    {
        classification::recall(&self.recommendations(), relevant_items)
    }

    pub fn accuracy<F>(&self, relevant_items: F, number_of_items: usize) -> f64
    where
        F: Fn(UserId) -> Vec<ItemId>,
    {
        classification::accuracy(&self.recommendations(), relevant_items, number_of_items)
    }

    pub fn mean_average_precision<F>(&self, is_relevant: F) -> f64
    where
        F: Fn(UserId, ItemId) -> bool,
    {
        classification::mean_average_precision(&self.recommendations(), is_relevant)
    }

    pub fn mean_response_time(&self) -> f64 {
        latency::mean_response_time(&self.recommendations())
    }

    pub fn median_response_time(&self) -> f64 {
        latency::median_response_time(&self.recommendations())
    }

    /// Every log-derivable metric at once
    ///
    /// The tracker's own aggregator takes precedence over the one named in
    /// `settings`.
    pub fn report(&self, settings: &EvaluationSettings) -> Result<MetricsReport> {
        let recommendations = self.recommendations();
        let feedback = self.feedback();
        match &self.aggregator {
            Some(aggregator) => {
                MetricsReport::compute_with(&recommendations, &feedback, settings, Some(aggregator))
            }
            None => MetricsReport::compute(&recommendations, &feedback, settings),
        }
    }

    /// Write the recommendation log, headed by the tracker name
    pub fn save_recommendations(&self, path: &Path) -> Result<()> {
        storage::save_recommendations(path, &self.name, &self.recommendations())
    }

    /// Append a saved recommendation log; returns the number of lists loaded
    ///
    /// Fails with [`RecsysError::NameMismatch`] when the file was written by
    /// a differently named tracker.
    pub fn load_recommendations(&self, path: &Path) -> Result<usize> {
        let (name, loaded) = storage::load_recommendations(path)?;
        if name != self.name {
            return Err(RecsysError::NameMismatch {
                expected: self.name.clone(),
                found: name,
            });
        }
        let count = loaded.len();
        self.recommendations.push_all(loaded);
        Ok(count)
    }

    pub fn save_feedback(&self, path: &Path) -> Result<()> {
        storage::save_feedback(path, &self.feedback())
    }

    /// Append a saved feedback log without forwarding; returns the number of events
    pub fn load_feedback(&self, path: &Path) -> Result<usize> {
        let loaded = storage::load_feedback(path)?;
        let count = loaded.len();
        self.add_feedback(loaded);
        Ok(count)
    }
}

impl Recommender for Tracker {
    fn name(&self) -> String {
        self.system.name()
    }

    fn version(&self) -> String {
        self.system.version()
    }

    fn can_recommend_to_user(&self, user: &User) -> bool {
        self.system.can_recommend_to_user(user)
    }

    fn can_recommend_item(&self, item: &Item) -> bool {
        self.system.can_recommend_item(item)
    }

    fn can_predict_preference(&self, user: &User, item: &Item) -> bool {
        self.system.can_predict_preference(user, item)
    }

    fn handle_feedback(&self, feedback: &Feedback) -> Result<()> {
        self.feedback.push(feedback.clone());
        self.system.handle_feedback(feedback).map_err(|e| {
            warn!(
                "{} failed to handle feedback for {}: {}",
                self.name,
                feedback.pair(),
                e
            );
            e
        })
    }

    fn get_expected_preference(&self, user: &User, item: &Item) -> Result<f32> {
        self.system.get_expected_preference(user, item)
    }

    fn get_ranking(&self, user: &User, items: &[Item]) -> Result<Vec<RecommendedItem>> {
        let started = Instant::now();
        let ranking = self.system.get_ranking(user, items).map_err(|e| {
            warn!("{} failed to rank items for user {}: {}", self.name, user.id, e);
            e
        })?;
        self.record(user, &ranking, started);
        Ok(ranking)
    }

    fn get_recommendation(
        &self,
        user: &User,
        items: &[Item],
        count: Option<usize>,
    ) -> Result<Vec<RecommendedItem>> {
        let started = Instant::now();
        let recommendation = self
            .system
            .get_recommendation(user, items, count)
            .map_err(|e| {
                warn!("{} failed to recommend to user {}: {}", self.name, user.id, e);
                e
            })?;
        self.record(user, &recommendation, started);
        Ok(recommendation)
    }
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("name", &self.name)
            .field("system", &self.system.system_id())
            .field("recommendations", &self.recommendations.len())
            .field("feedback", &self.feedback.len())
            .field("aggregator", &self.aggregator.is_some())
            .finish()
    }
}
