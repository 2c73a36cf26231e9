//! Evaluation and logging configuration
//!
//! Settings can come from three layers, later ones winning:
//! 1. Built-in defaults
//! 2. A TOML file
//! 3. `RECSYS__<SECTION>__<KEY>` environment variables
//!
//! ```toml
//! [evaluation]
//! rank_position = 10
//! relevance_threshold = 4.0
//! click_source = "implicit"
//! click_implicit_type = "click"
//! impressions = "distinct_pairs"
//! aggregator = "latest_explicit"
//! number_of_items = 1682
//!
//! [logging]
//! level = "debug"
//! ```

use crate::error::{RecsysError, Result};
use crate::evaluation::click_through::{ClickSignal, CtrDefinition, Impressions};
use crate::evaluation::preferences::BuiltinAggregator;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "RECSYS";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default)]
    pub evaluation: EvaluationSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which feedback variant counts as a click
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickSource {
    /// Dedicated click events
    #[default]
    Event,
    /// Implicit feedback of type `click_implicit_type`
    Implicit,
}

/// Parameters of the metric report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationSettings {
    /// Cut-off `k` for DCG and NDCG
    pub rank_position: usize,

    /// Ground-truth preference at or above which an item counts as relevant
    pub relevance_threshold: f32,

    pub click_source: ClickSource,

    pub click_implicit_type: String,

    /// Denominator of the click-through rate
    pub impressions: Impressions,

    /// Aggregator used when the feedback log holds implicit feedback
    pub aggregator: BuiltinAggregator,

    /// Catalogue size, needed for accuracy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_items: Option<usize>,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            rank_position: 10,
            relevance_threshold: 4.0,
            click_source: ClickSource::Event,
            click_implicit_type: "click".to_string(),
            impressions: Impressions::DistinctPairs,
            aggregator: BuiltinAggregator::None,
            number_of_items: None,
        }
    }
}

impl EvaluationSettings {
    /// Click-through definition selected by these settings
    pub fn ctr_definition(&self) -> CtrDefinition {
        let clicks = match self.click_source {
            ClickSource::Event => ClickSignal::ClickEvent,
            ClickSource::Implicit => ClickSignal::ImplicitType(self.click_implicit_type.clone()),
        };
        CtrDefinition::new(clicks, self.impressions)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter level
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TrackerConfig {
    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: TrackerConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Layer defaults, an optional TOML file and environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&TrackerConfig::default())?);

        if let Some(path) = path {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: TrackerConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let eval = &self.evaluation;

        if eval.rank_position == 0 {
            return Err(RecsysError::InvalidConfig(
                "evaluation.rank_position must be greater than 0".to_string(),
            ));
        }

        if !eval.relevance_threshold.is_finite() {
            return Err(RecsysError::InvalidConfig(
                "evaluation.relevance_threshold must be a finite number".to_string(),
            ));
        }

        if eval.click_source == ClickSource::Implicit && eval.click_implicit_type.trim().is_empty() {
            return Err(RecsysError::InvalidConfig(
                "evaluation.click_implicit_type must not be empty when click_source is implicit"
                    .to_string(),
            ));
        }

        if eval.number_of_items == Some(0) {
            return Err(RecsysError::InvalidConfig(
                "evaluation.number_of_items must be greater than 0 when set".to_string(),
            ));
        }

        if self.logging.level.trim().is_empty() {
            return Err(RecsysError::InvalidConfig(
                "logging.level must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| RecsysError::InvalidConfig(e.to_string()))
    }
}
