//! Offline evaluation of recorded recommendations.
//!
//! Every metric is a pure function over snapshots of the recommendation and
//! feedback logs. None of them fail: when the input leaves a metric
//! undefined (no lists, no overlapping ground truth, zero denominators) the
//! result is `f64::NAN`, and callers are expected to check for it.
//!
//! # Metric families
//!
//! - **rating**: MAE, RMSE against resolved ground-truth preferences
//! - **ranking**: MRR, DCG@k, NDCG@k
//! - **classification**: precision, recall, accuracy, MAP
//! - **click_through**: CTR under a selectable click/impression definition
//! - **coverage**: user and item coverage, intra-list diversity
//! - **latency**: mean and median response time
//!
//! [`preferences`] turns a feedback log into ground truth and
//! [`report::MetricsReport`] bundles everything derivable from logs alone.

pub mod classification;
pub mod click_through;
pub mod coverage;
pub mod latency;
pub mod preferences;
pub mod ranking;
pub mod rating;
pub mod report;

pub use classification::{accuracy, mean_average_precision, precision, recall};
pub use click_through::{ctr, ClickSignal, CtrDefinition, Impressions};
pub use coverage::{diversity, item_coverage, user_coverage};
pub use latency::{mean_response_time, median_response_time};
pub use preferences::{resolve_preferences, Aggregator, BuiltinAggregator};
pub use ranking::{dcg, mrr, ndcg};
pub use rating::{mae, rmse};
pub use report::MetricsReport;
