//! Embedded labelled training sample.

use serde::{Deserialize, Serialize};

use super::{FeatureVector, Label, N_FEATURES};
use crate::error::{Error, Result};

const EMBEDDED_JSON: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/data/training_set.json"
));

/// One hand-labelled segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub speed: f64,
    pub distance: f64,
    pub turning_angle: f64,
    pub label: Label,
}

impl TrainingExample {
    pub fn features(&self) -> FeatureVector {
        FeatureVector {
            speed: self.speed,
            distance: self.distance,
            turning_angle: self.turning_angle,
        }
    }
}

/// Labelled examples used to fit the learned strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrainingSet {
    pub examples: Vec<TrainingExample>,
}

impl TrainingSet {
    /// The sample compiled into the crate (`data/training_set.json`).
    pub fn embedded() -> Result<Self> {
        Self::from_json(EMBEDDED_JSON)
    }

    /// Parse and validate a training set.
    pub fn from_json(json: &str) -> Result<Self> {
        let set: TrainingSet = serde_json::from_str(json)
            .map_err(|e| Error::ModelFitFailure(format!("malformed training set: {e}")))?;
        set.validate()?;
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Check the set can be fit: non-empty, finite non-negative features,
    /// turning angles within [0, 180], and both labels present.
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::ModelFitFailure("training set is empty".into()));
        }

        for (i, ex) in self.examples.iter().enumerate() {
            let valid = [ex.speed, ex.distance, ex.turning_angle]
                .iter()
                .all(|v| v.is_finite() && *v >= 0.0)
                && ex.turning_angle <= 180.0;
            if !valid {
                return Err(Error::ModelFitFailure(format!(
                    "training example {i} has invalid features: {ex:?}"
                )));
            }
        }

        let highway = self
            .examples
            .iter()
            .filter(|ex| ex.label == Label::Highway)
            .count();
        if highway == 0 || highway == self.examples.len() {
            return Err(Error::ModelFitFailure(
                "training set must contain both labels".into(),
            ));
        }

        Ok(())
    }

    pub fn feature_rows(&self) -> Vec<[f64; N_FEATURES]> {
        self.examples.iter().map(|ex| ex.features().to_array()).collect()
    }

    pub fn labels(&self) -> Vec<Label> {
        self.examples.iter().map(|ex| ex.label).collect()
    }
}
