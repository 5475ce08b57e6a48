//! Runtime configuration.
//!
//! Every section has a `Default` matching the documented constants, and
//! missing JSON fields fall back to those defaults, so `{}` is a valid
//! configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub processing: ProcessingConfig,
    pub classifier: ClassifierConfig,
}

impl Config {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Feature extraction limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Speeds above this (km/h) are treated as GNSS noise and replaced by 0.
    pub max_speed_kmh: f64,
    /// Requests with more fixes than this are rejected.
    pub max_fixes: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_speed_kmh: 200.0,
            max_fixes: 100_000,
        }
    }
}

/// Which classification strategy to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    Threshold,
    Learned,
}

/// What to do when the learned model cannot be fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitFailurePolicy {
    /// Surface `ModelFitFailure` to the caller.
    #[default]
    Abort,
    /// Log a warning and classify with the threshold rule instead.
    FallBackToThreshold,
}

/// Segment classifier settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub strategy: StrategyKind,
    /// Speeds strictly above this (km/h) are labelled Highway by the threshold rule.
    pub threshold_kmh: f64,
    pub forest: ForestConfig,
    pub fit_failure: FitFailurePolicy,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Threshold,
            threshold_kmh: 60.0,
            forest: ForestConfig::default(),
            fit_failure: FitFailurePolicy::Abort,
        }
    }
}

/// Random forest hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub n_trees: usize,
    /// `None` grows trees until leaves are pure.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Seed for bootstrap sampling and feature selection.
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            seed: 42,
        }
    }
}
