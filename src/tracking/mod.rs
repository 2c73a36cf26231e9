//! Instrumentation of live recommender systems
//!
//! - **Tracker**: wraps one system and records what it serves and what users answer
//! - **SystemRegistry**: the systems and trackers of a service, plus user routing
//! - **assignment**: ready-made user-to-tracker routing functions

pub mod assignment;
pub mod registry;
pub mod tracker;

pub use assignment::Assigner;
pub use registry::SystemRegistry;
pub use tracker::Tracker;
