//! Common test utilities and helpers
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use mockall::mock;
use recsys_tracker_core::{
    Feedback, Item, ManagedRecommender, ParamValue, Recommender, RecommendedItem, RecsysError,
    Result, User,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

mock! {
    pub System {}

    impl Recommender for System {
        fn name(&self) -> String;
        fn version(&self) -> String;
        fn can_recommend_to_user(&self, user: &User) -> bool;
        fn can_recommend_item(&self, item: &Item) -> bool;
        fn can_predict_preference(&self, user: &User, item: &Item) -> bool;
        fn handle_feedback(&self, feedback: &Feedback) -> Result<()>;
        fn get_expected_preference(&self, user: &User, item: &Item) -> Result<f32>;
        fn get_ranking(&self, user: &User, items: &[Item]) -> Result<Vec<RecommendedItem>>;
        fn get_recommendation(
            &self,
            user: &User,
            items: &[Item],
            count: Option<usize>,
        ) -> Result<Vec<RecommendedItem>>;
    }
}

/// Mock with a fixed identity; other expectations are up to the test
pub fn named_mock(name: &str, version: &str) -> MockSystem {
    let mut mock = MockSystem::new();
    let name = name.to_string();
    let version = version.to_string();
    mock.expect_name().returning(move || name.clone());
    mock.expect_version().returning(move || version.clone());
    mock
}

/// Deterministic recommender: predicts `(user + item) % 5 + offset`
///
/// Serves every user and every non-negative item id.
pub struct ToyRecommender {
    name: String,
    offset: Mutex<f64>,
    trained: AtomicUsize,
    feedback_seen: AtomicUsize,
}

impl ToyRecommender {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            offset: Mutex::new(0.0),
            trained: AtomicUsize::new(0),
            feedback_seen: AtomicUsize::new(0),
        }
    }

    pub fn feedback_seen(&self) -> usize {
        self.feedback_seen.load(Ordering::SeqCst)
    }

    pub fn times_trained(&self) -> usize {
        self.trained.load(Ordering::SeqCst)
    }

    fn offset(&self) -> f64 {
        *self.offset.lock().expect("offset lock")
    }
}

impl Recommender for ToyRecommender {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn version(&self) -> String {
        "1.0".to_string()
    }

    fn can_recommend_to_user(&self, _user: &User) -> bool {
        true
    }

    fn can_recommend_item(&self, item: &Item) -> bool {
        item.id >= 0
    }

    fn can_predict_preference(&self, _user: &User, item: &Item) -> bool {
        item.id >= 0
    }

    fn handle_feedback(&self, _feedback: &Feedback) -> Result<()> {
        self.feedback_seen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn get_expected_preference(&self, user: &User, item: &Item) -> Result<f32> {
        if item.id < 0 {
            return Err(RecsysError::Recommender(format!("unknown item {}", item.id)));
        }
        Ok(((user.id + item.id).rem_euclid(5) as f64 + self.offset()) as f32)
    }

    fn get_ranking(&self, user: &User, items: &[Item]) -> Result<Vec<RecommendedItem>> {
        let mut ranked = items
            .iter()
            .map(|item| Ok(RecommendedItem::new(*item, Some(self.get_expected_preference(user, item)?))))
            .collect::<Result<Vec<_>>>()?;
        ranked.sort_by(|a, b| {
            b.expected_preference
                .partial_cmp(&a.expected_preference)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.item.id.cmp(&b.item.id))
        });
        Ok(ranked)
    }

    fn get_recommendation(
        &self,
        user: &User,
        items: &[Item],
        count: Option<usize>,
    ) -> Result<Vec<RecommendedItem>> {
        let mut ranked = self.get_ranking(user, items)?;
        if let Some(count) = count {
            ranked.truncate(count);
        }
        Ok(ranked)
    }
}

impl ManagedRecommender for ToyRecommender {
    fn params(&self) -> Vec<(String, ParamValue)> {
        vec![("Offset".to_string(), ParamValue::Float(self.offset()))]
    }

    fn param(&self, name: &str) -> Result<ParamValue> {
        match name {
            "Offset" => Ok(ParamValue::Float(self.offset())),
            _ => Err(RecsysError::UnknownParameter(name.to_string())),
        }
    }

    fn set_param(&self, name: &str, value: ParamValue) -> Result<()> {
        match (name, value) {
            ("Offset", ParamValue::Float(v)) => {
                *self.offset.lock().expect("offset lock") = v;
                Ok(())
            }
            ("Offset", other) => Err(RecsysError::InvalidParameter {
                name: name.to_string(),
                reason: format!("expected a float, got {}", other),
            }),
            _ => Err(RecsysError::UnknownParameter(name.to_string())),
        }
    }

    fn train(&self) -> Result<()> {
        self.trained.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn save_model(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.offset().to_string())?;
        Ok(())
    }

    fn load_model(&self, path: &Path) -> Result<()> {
        let contents = std::fs::read_to_string(path)?;
        let offset = contents.trim().parse::<f64>().map_err(|e| RecsysError::InvalidParameter {
            name: "Offset".to_string(),
            reason: e.to_string(),
        })?;
        *self.offset.lock().expect("offset lock") = offset;
        Ok(())
    }
}

/// Fixed timestamp `secs` seconds after 2020-09-13T12:26:40Z
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_600_000_000 + secs, 0)
        .single()
        .expect("valid timestamp")
}

pub fn items(ids: &[i64]) -> Vec<Item> {
    ids.iter().map(|id| Item::new(*id)).collect()
}
