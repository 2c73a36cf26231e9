//! Recommender capability interfaces
//!
//! The tracking core never looks inside a recommendation algorithm. It needs
//! exactly the operations of [`Recommender`]; registries that also tune and
//! retrain systems need [`ManagedRecommender`].
//!
//! Implementations are shared across serving threads, so every method takes
//! `&self`; algorithms that learn from feedback keep their state behind their
//! own locks.

use crate::error::Result;
use crate::types::{Feedback, Item, RecommendedItem, SystemId, User};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Operations the tracker requires from any recommender
pub trait Recommender: Send + Sync {
    /// Name of the algorithm
    fn name(&self) -> String;

    /// Version of the algorithm
    fn version(&self) -> String;

    /// Name and version together
    fn system_id(&self) -> SystemId {
        SystemId::new(self.name(), self.version())
    }

    /// Whether the system can predict the user's preference for any item
    fn can_recommend_to_user(&self, user: &User) -> bool;

    /// Whether the system can recommend this item to any user
    fn can_recommend_item(&self, item: &Item) -> bool;

    /// Whether the system can predict this user's preference for this item
    fn can_predict_preference(&self, user: &User, item: &Item) -> bool;

    /// Pass a user's feedback back to the system
    fn handle_feedback(&self, feedback: &Feedback) -> Result<()>;

    /// Predicted preference of `user` for `item`
    fn get_expected_preference(&self, user: &User, item: &Item) -> Result<f32>;

    /// Rank `items` for `user`, best first
    fn get_ranking(&self, user: &User, items: &[Item]) -> Result<Vec<RecommendedItem>>;

    /// Pick items from `items` that may interest `user`, best first
    ///
    /// `count` of `None` asks for as many as the system can provide.
    fn get_recommendation(
        &self,
        user: &User,
        items: &[Item],
        count: Option<usize>,
    ) -> Result<Vec<RecommendedItem>>;
}

/// Value of a tuning parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// A recommender that can be tuned, retrained and persisted from outside
///
/// Unknown parameter names are reported as
/// [`RecsysError::UnknownParameter`](crate::error::RecsysError::UnknownParameter).
pub trait ManagedRecommender: Recommender {
    /// All parameters with their current values
    fn params(&self) -> Vec<(String, ParamValue)>;

    /// Current value of one parameter
    fn param(&self, name: &str) -> Result<ParamValue>;

    /// Change one parameter; takes effect on the next `train`
    fn set_param(&self, name: &str, value: ParamValue) -> Result<()>;

    /// Retrain the model
    fn train(&self) -> Result<()>;

    /// Persist the trained model
    fn save_model(&self, path: &Path) -> Result<()>;

    /// Restore a previously persisted model
    fn load_model(&self, path: &Path) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_value_display() {
        assert_eq!(ParamValue::Int(30).to_string(), "30");
        assert_eq!(ParamValue::Float(0.015).to_string(), "0.015");
        assert_eq!(ParamValue::Bool(true).to_string(), "true");
        assert_eq!(ParamValue::Text("sgd".into()).to_string(), "sgd");
    }

    #[test]
    fn test_param_value_serde() {
        let json = serde_json::to_string(&ParamValue::Float(0.5)).expect("Failed to serialize");
        assert_eq!(json, r#"{"type":"float","value":0.5}"#);
    }
}
