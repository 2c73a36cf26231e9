//! Recsys Tracker - recording and evaluation for recommender systems
//!
//! Wraps production recommenders so that every served list and every piece
//! of user feedback is recorded, then scores the recorded history offline:
//! - Lock-free, append-only event logs safe for concurrent serving threads
//! - Rating, ranking, classification, click-through, coverage and latency metrics
//! - A registry for A/B splitting users between several tracked systems
//! - A line-based text format for persisting and reloading logs
//!
//! # Architecture
//!
//! - **Types**: Core data structures (Feedback, Recommendation, SystemId, etc.)
//! - **Recommender**: The capability interface a tracked system implements
//! - **Storage**: [`AppendLog`] and the text log format
//! - **Evaluation**: Pure metric functions and [`MetricsReport`]
//! - **Tracking**: [`Tracker`] and [`SystemRegistry`]
//!
//! # Example
//!
//! ```ignore
//! use recsys_tracker_core::{assignment, SystemRegistry, Recommender, User};
//!
//! fn main() -> recsys_tracker_core::Result<()> {
//!     let registry = SystemRegistry::new();
//!     let svd = registry.add_system(Arc::new(Svd::default()))?.system_id();
//!     let uib = registry.add_system(Arc::new(Uib::default()))?.system_id();
//!     registry.set_assigner(assignment::modulo(vec![svd, uib])?);
//!
//!     // Route a user and serve them through their tracker
//!     let id = registry.register_user(42)?;
//!     let tracker = registry.tracker(&id)?;
//!     let top = tracker.get_recommendation(&User::new(42), &catalogue, Some(10))?;
//!
//!     // Score what was served so far
//!     println!("{}", tracker.report(&Default::default())?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod evaluation;
pub mod recommender;
pub mod storage;
pub mod tracking;
pub mod types;

// Re-export commonly used types
pub use config::{EvaluationSettings, LoggingConfig, TrackerConfig};
pub use error::{RecsysError, Result};
pub use evaluation::{CtrDefinition, MetricsReport};
pub use recommender::{ManagedRecommender, ParamValue, Recommender};
pub use storage::AppendLog;
pub use tracking::{assignment, Assigner, SystemRegistry, Tracker};
pub use types::{
    Feedback, Item, ItemId, Recommendation, RecommendedItem, SystemId, User, UserId, UserItemPair,
    UserItemPreference,
};
