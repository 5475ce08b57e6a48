//! Per-feature standardization.

use serde::Serialize;

use super::N_FEATURES;
use crate::error::{Error, Result};

/// Zero-mean, unit-variance scaling fitted once and then frozen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandardScaler {
    mean: [f64; N_FEATURES],
    scale: [f64; N_FEATURES],
}

impl StandardScaler {
    /// Fit mean and population standard deviation per feature.
    ///
    /// A constant feature gets scale 1 so it maps to 0 instead of NaN.
    pub fn fit(rows: &[[f64; N_FEATURES]]) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::ModelFitFailure("cannot fit scaler on no rows".into()));
        }
        let n = rows.len() as f64;

        let mut mean = [0.0; N_FEATURES];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v / n;
            }
        }

        let mut scale = [0.0; N_FEATURES];
        for row in rows {
            for (j, v) in row.iter().enumerate() {
                scale[j] += (v - mean[j]).powi(2) / n;
            }
        }
        for s in scale.iter_mut() {
            *s = s.sqrt();
            if *s < f64::EPSILON {
                *s = 1.0;
            }
        }

        Ok(Self { mean, scale })
    }

    pub fn transform(&self, row: &[f64; N_FEATURES]) -> [f64; N_FEATURES] {
        let mut out = [0.0; N_FEATURES];
        for j in 0..N_FEATURES {
            out[j] = (row[j] - self.mean[j]) / self.scale[j];
        }
        out
    }

    pub fn mean(&self) -> &[f64; N_FEATURES] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64; N_FEATURES] {
        &self.scale
    }
}
