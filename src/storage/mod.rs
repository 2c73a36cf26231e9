//! Event storage
//!
//! In-process storage is the lock-free [`AppendLog`]; persistence is the
//! line-based text format in [`log_format`].

pub mod append_log;
pub mod log_format;

pub use append_log::AppendLog;
pub use log_format::{
    load_feedback, load_recommendations, read_feedback, read_recommendations, save_feedback,
    save_recommendations, write_feedback, write_recommendations,
};
