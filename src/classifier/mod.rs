//! Segment classification.
//!
//! Two interchangeable strategies label a segment as Highway or Service
//! Road from its [`FeatureVector`]:
//!
//! - [`ThresholdStrategy`]: speed strictly above a fixed limit.
//! - [`LearnedStrategy`]: standardized features voted on by a random
//!   forest fitted once from the embedded [`TrainingSet`].
//!
//! Callers hold a [`SegmentClassifier`] and never branch on the strategy.

pub mod forest;
pub mod scaler;
pub mod training;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::config::{ClassifierConfig, FitFailurePolicy, ForestConfig, StrategyKind};
use crate::error::{Error, Result};
use crate::trajectory::Segment;

pub use forest::RandomForest;
pub use scaler::StandardScaler;
pub use training::{TrainingExample, TrainingSet};

/// Number of features per segment: speed, distance, turning angle.
pub const N_FEATURES: usize = 3;

/// Road type of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "Highway")]
    Highway,
    #[serde(rename = "Service Road")]
    ServiceRoad,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Highway => write!(f, "Highway"),
            Label::ServiceRoad => write!(f, "Service Road"),
        }
    }
}

/// The segment features the classifier consumes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// km/h
    pub speed: f64,
    /// meters
    pub distance: f64,
    /// degrees, [0, 180]
    pub turning_angle: f64,
}

impl FeatureVector {
    pub fn to_array(&self) -> [f64; N_FEATURES] {
        [self.speed, self.distance, self.turning_angle]
    }

    /// Reason the vector cannot be classified, if any.
    fn invalid_reason(&self) -> Option<String> {
        if !(self.speed.is_finite() && self.speed >= 0.0) {
            Some(format!("speed {}", self.speed))
        } else if !(self.distance.is_finite() && self.distance >= 0.0) {
            Some(format!("distance {}", self.distance))
        } else if !(0.0..=180.0).contains(&self.turning_angle) {
            Some(format!("turning angle {}", self.turning_angle))
        } else {
            None
        }
    }
}

impl From<&Segment> for FeatureVector {
    fn from(segment: &Segment) -> Self {
        Self {
            speed: segment.speed_kmh,
            distance: segment.distance_m,
            turning_angle: segment.turning_angle_deg,
        }
    }
}

/// Fixed speed rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdStrategy {
    pub speed_kmh: f64,
}

impl Default for ThresholdStrategy {
    fn default() -> Self {
        Self { speed_kmh: 60.0 }
    }
}

impl ThresholdStrategy {
    pub fn classify(&self, features: &FeatureVector) -> Label {
        if features.speed > self.speed_kmh {
            Label::Highway
        } else {
            Label::ServiceRoad
        }
    }
}

/// Fitted scaler and forest. Immutable after [`ClassifierModel::fit`].
#[derive(Debug, Clone)]
pub struct ClassifierModel {
    scaler: StandardScaler,
    forest: RandomForest,
}

impl ClassifierModel {
    pub fn fit(training: &TrainingSet, config: &ForestConfig) -> Result<Self> {
        training.validate()?;

        let rows = training.feature_rows();
        let scaler = StandardScaler::fit(&rows)?;
        let scaled: Vec<_> = rows.iter().map(|r| scaler.transform(r)).collect();
        let forest = RandomForest::fit(&scaled, &training.labels(), config)?;

        log::info!(
            "fitted classifier: {} examples, {} trees, max depth {}",
            training.len(),
            forest.n_trees(),
            forest.max_depth()
        );

        Ok(Self { scaler, forest })
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    pub fn predict(&self, features: &FeatureVector) -> Label {
        self.forest.predict(&self.scaler.transform(&features.to_array()))
    }

    /// Share of trees voting Highway.
    pub fn highway_probability(&self, features: &FeatureVector) -> f64 {
        self.forest
            .highway_fraction(&self.scaler.transform(&features.to_array()))
    }
}

/// Classifier backed by a shared fitted model.
#[derive(Debug, Clone)]
pub struct LearnedStrategy {
    model: Arc<ClassifierModel>,
}

impl LearnedStrategy {
    pub fn new(model: Arc<ClassifierModel>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &ClassifierModel {
        &self.model
    }

    pub fn classify(&self, features: &FeatureVector) -> Label {
        self.model.predict(features)
    }
}

/// A classification strategy.
#[derive(Debug, Clone)]
pub enum SegmentClassifier {
    Threshold(ThresholdStrategy),
    Learned(LearnedStrategy),
}

impl SegmentClassifier {
    pub fn threshold(speed_kmh: f64) -> Self {
        Self::Threshold(ThresholdStrategy { speed_kmh })
    }

    pub fn learned(model: Arc<ClassifierModel>) -> Self {
        Self::Learned(LearnedStrategy::new(model))
    }

    /// Build the configured strategy, fitting the embedded training set if
    /// the learned strategy is requested.
    pub fn from_config(config: &ClassifierConfig) -> Result<Self> {
        match config.strategy {
            StrategyKind::Threshold => Ok(Self::threshold(config.threshold_kmh)),
            StrategyKind::Learned => Self::learned_embedded(config),
        }
    }

    /// Fit the learned strategy from the embedded training set, honouring
    /// `config.fit_failure`.
    pub fn learned_embedded(config: &ClassifierConfig) -> Result<Self> {
        let fitted = TrainingSet::embedded()
            .and_then(|set| ClassifierModel::fit(&set, &config.forest));
        Self::apply_fit_policy(fitted, config)
    }

    /// Fit the learned strategy from `training`, honouring `config.fit_failure`.
    pub fn learned_from(training: &TrainingSet, config: &ClassifierConfig) -> Result<Self> {
        Self::apply_fit_policy(ClassifierModel::fit(training, &config.forest), config)
    }

    fn apply_fit_policy(
        fitted: Result<ClassifierModel>,
        config: &ClassifierConfig,
    ) -> Result<Self> {
        match (fitted, config.fit_failure) {
            (Ok(model), _) => Ok(Self::learned(Arc::new(model))),
            (Err(e), FitFailurePolicy::FallBackToThreshold) => {
                log::warn!(
                    "{e}; falling back to threshold strategy at {} km/h",
                    config.threshold_kmh
                );
                Ok(Self::threshold(config.threshold_kmh))
            }
            (Err(e), FitFailurePolicy::Abort) => Err(e),
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::Threshold(_) => StrategyKind::Threshold,
            Self::Learned(_) => StrategyKind::Learned,
        }
    }

    /// Label one feature vector. Fails only on features no valid
    /// trajectory produces.
    pub fn classify(&self, features: &FeatureVector) -> Result<Label> {
        self.classify_checked(features, None)
    }

    /// Like [`classify`](Self::classify), with the segment index in errors.
    pub fn classify_segment(&self, segment: &Segment) -> Result<Label> {
        self.classify_checked(&segment.features(), Some(segment.index))
    }

    fn classify_checked(
        &self,
        features: &FeatureVector,
        segment: Option<usize>,
    ) -> Result<Label> {
        if let Some(reason) = features.invalid_reason() {
            return Err(Error::InvalidFeature { segment, reason });
        }
        Ok(match self {
            Self::Threshold(strategy) => strategy.classify(features),
            Self::Learned(strategy) => strategy.classify(features),
        })
    }
}
