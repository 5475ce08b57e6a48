//! Trajectory feature extraction.
//!
//! Turns an ordered sequence of fixes into one [`Segment`] per adjacent
//! pair, carrying the distance, speed, heading and turning angle that the
//! segment classifier consumes. Noisy input is absorbed here: impossible
//! speeds and out-of-order timestamps are replaced by a speed of 0 and
//! reported as [`Warning`]s rather than failing the request.

use serde::Serialize;

use crate::classifier::FeatureVector;
use crate::config::ProcessingConfig;
use crate::error::{Error, Result};
use crate::geo;
use crate::gpx::Fix;

/// Motion features of the interval between two consecutive fixes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    /// Index of the segment; it spans fixes `index` and `index + 1`.
    pub index: usize,
    pub distance_m: f64,
    /// 0 when the raw value was out of range or the interval non-positive.
    pub speed_kmh: f64,
    pub heading_deg: f64,
    /// 0 for the first segment.
    pub turning_angle_deg: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_heading: Option<f64>,
}

impl Segment {
    pub fn distance_km(&self) -> f64 {
        self.distance_m / 1000.0
    }

    pub fn features(&self) -> FeatureVector {
        FeatureVector::from(self)
    }
}

/// Recoverable input problems. Processing continues with a substitute value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Fix `index + 1` is not later than fix `index`; speed set to 0.
    TimestampOrder { segment: usize },
    /// Raw speed outside `[0, max_speed_kmh]`; speed set to 0.
    SpeedOutOfRange { segment: usize, raw_speed_kmh: f64 },
}

/// Per-segment features of a trajectory.
#[derive(Debug, Clone, Serialize)]
pub struct Trajectory {
    pub segments: Vec<Segment>,
    pub warnings: Vec<Warning>,
    /// Seconds from the first fix to the last; negative if the last fix
    /// is timestamped before the first.
    duration_s: f64,
}

impl Trajectory {
    pub fn speeds(&self) -> Vec<f64> {
        self.segments.iter().map(|s| s.speed_kmh).collect()
    }

    pub fn distances(&self) -> Vec<f64> {
        self.segments.iter().map(|s| s.distance_m).collect()
    }

    pub fn headings(&self) -> Vec<f64> {
        self.segments.iter().map(|s| s.heading_deg).collect()
    }

    pub fn turning_angles(&self) -> Vec<f64> {
        self.segments.iter().map(|s| s.turning_angle_deg).collect()
    }

    pub fn feature_vectors(&self) -> Vec<FeatureVector> {
        self.segments.iter().map(FeatureVector::from).collect()
    }

    pub fn total_distance_m(&self) -> f64 {
        self.segments.iter().map(|s| s.distance_m).sum()
    }

    pub fn duration_s(&self) -> f64 {
        self.duration_s
    }
}

/// Extract segment features from an ordered sequence of fixes.
///
/// Produces exactly `fixes.len() - 1` segments. A segment between two
/// coincident fixes has no direction of its own; it keeps the last real
/// heading (0 before any movement), so its turning angle is 0. Turning
/// angles are only measured against headings of segments that moved.
pub fn process(fixes: &[Fix], config: &ProcessingConfig) -> Result<Trajectory> {
    if fixes.len() < 2 {
        return Err(Error::InsufficientData { count: fixes.len() });
    }
    if fixes.len() > config.max_fixes {
        return Err(Error::TooManyFixes {
            count: fixes.len(),
            max: config.max_fixes,
        });
    }

    let mut segments = Vec::with_capacity(fixes.len() - 1);
    let mut warnings = Vec::new();
    let mut previous_heading: Option<f64> = None;

    for (i, pair) in fixes.windows(2).enumerate() {
        let a = pair[0].point();
        let b = pair[1].point();

        let distance_m = geo::distance(&a, &b);

        let speed_kmh = if pair[1].time <= pair[0].time {
            log::warn!("segment {i}: non-increasing timestamps, speed set to 0");
            warnings.push(Warning::TimestampOrder { segment: i });
            0.0
        } else {
            let raw = geo::speed(&a, &b, pair[0].time, pair[1].time);
            if !(0.0..=config.max_speed_kmh).contains(&raw) {
                log::warn!("segment {i}: speed {raw:.1} km/h out of range, set to 0");
                warnings.push(Warning::SpeedOutOfRange {
                    segment: i,
                    raw_speed_kmh: raw,
                });
                0.0
            } else {
                raw
            }
        };

        let heading_deg = if distance_m > 0.0 {
            geo::heading(&a, &b)
        } else {
            previous_heading.unwrap_or(0.0)
        };

        let turning_angle_deg = match previous_heading {
            Some(prev) => geo::turning_angle(prev, heading_deg),
            None => 0.0,
        };

        segments.push(Segment {
            index: i,
            distance_m,
            speed_kmh,
            heading_deg,
            turning_angle_deg,
            previous_heading,
        });
        if distance_m > 0.0 {
            previous_heading = Some(heading_deg);
        }
    }

    log::debug!(
        "processed {} fixes into {} segments ({} warnings)",
        fixes.len(),
        segments.len(),
        warnings.len()
    );

    let duration_s = (fixes[fixes.len() - 1].time - fixes[0].time).as_seconds_f64();

    Ok(Trajectory {
        segments,
        warnings,
        duration_s,
    })
}
