//! End-to-end classification of a fix sequence.
//!
//! Runs feature extraction and labels every segment, producing the records a
//! map renderer needs (endpoints, label placement point, speed, distance and
//! road type). Also exposes a JSON request/response surface for hosts that
//! cross a language boundary.

use serde::{Deserialize, Serialize};

use crate::classifier::{Label, SegmentClassifier};
use crate::config::{Config, ProcessingConfig, StrategyKind};
use crate::error::Result;
use crate::geo;
use crate::gpx::{self, Fix, Point};
use crate::trajectory::{self, Segment, Warning};

/// A segment with its predicted road type.
#[derive(Debug, Clone, Serialize)]
pub struct LabeledSegment {
    #[serde(flatten)]
    pub segment: Segment,
    /// `None` if the segment could not be classified; see `failures`.
    pub label: Option<Label>,
    pub start: Point,
    pub end: Point,
    pub midpoint: Point,
}

/// A segment whose classification was rejected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentFailure {
    pub segment: usize,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedTrajectory {
    pub strategy: StrategyKind,
    pub segments: Vec<LabeledSegment>,
    pub warnings: Vec<Warning>,
    pub failures: Vec<SegmentFailure>,
}

impl ClassifiedTrajectory {
    pub fn labels(&self) -> Vec<Option<Label>> {
        self.segments.iter().map(|s| s.label).collect()
    }

    /// The fix positions in order, for drawing the route.
    pub fn path(&self) -> Vec<Point> {
        let mut points: Vec<Point> = self.segments.iter().map(|s| s.start).collect();
        points.extend(self.segments.last().map(|s| s.end));
        points
    }

    /// Length of the whole route in meters.
    pub fn total_distance_m(&self) -> f64 {
        geo::track_length(&self.path())
    }
}

/// Validate, extract features and classify every segment.
///
/// Hard input errors abort the request. A segment that fails classification
/// is recorded in `failures` and does not affect the others.
pub fn classify_fixes(
    fixes: &[Fix],
    classifier: &SegmentClassifier,
    config: &ProcessingConfig,
) -> Result<ClassifiedTrajectory> {
    gpx::validate_coordinates(fixes)?;
    let trajectory = trajectory::process(fixes, config)?;

    let mut failures = Vec::new();
    let segments = trajectory
        .segments
        .into_iter()
        .map(|segment| {
            let start = fixes[segment.index].point();
            let end = fixes[segment.index + 1].point();
            let label = match classifier.classify_segment(&segment) {
                Ok(label) => Some(label),
                Err(e) => {
                    log::warn!("{e}");
                    failures.push(SegmentFailure {
                        segment: segment.index,
                        message: e.to_string(),
                    });
                    None
                }
            };
            LabeledSegment {
                segment,
                label,
                start,
                end,
                midpoint: start.midpoint(&end),
            }
        })
        .collect();

    Ok(ClassifiedTrajectory {
        strategy: classifier.kind(),
        segments,
        warnings: trajectory.warnings,
        failures,
    })
}

/// One fix as entered by a user or sent by a host app.
#[derive(Debug, Clone, Deserialize)]
pub struct FixInput {
    pub lat: f64,
    pub lon: f64,
    /// `YYYY-MM-DD HH:MM:SS`, UTC.
    pub timestamp: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifyRequest {
    pub fixes: Vec<FixInput>,
    /// Overrides the configured strategy.
    #[serde(default)]
    pub strategy: Option<StrategyKind>,
}

/// Holds both strategies, fitted once, for repeated requests.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: Config,
    threshold: SegmentClassifier,
    learned: SegmentClassifier,
}

impl Pipeline {
    /// Fit the learned strategy from the embedded training set.
    ///
    /// Fails with `ModelFitFailure` unless the configured fit policy allows
    /// falling back to the threshold rule.
    pub fn new(config: Config) -> Result<Self> {
        let learned = SegmentClassifier::learned_embedded(&config.classifier)?;
        let threshold = SegmentClassifier::threshold(config.classifier.threshold_kmh);

        Ok(Self {
            config,
            threshold,
            learned,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn classifier(&self, kind: StrategyKind) -> &SegmentClassifier {
        match kind {
            StrategyKind::Threshold => &self.threshold,
            StrategyKind::Learned => &self.learned,
        }
    }

    pub fn classify(&self, fixes: &[Fix], kind: StrategyKind) -> Result<ClassifiedTrajectory> {
        classify_fixes(fixes, self.classifier(kind), &self.config.processing)
    }

    pub fn classify_request(&self, request: &ClassifyRequest) -> Result<ClassifiedTrajectory> {
        let fixes = request
            .fixes
            .iter()
            .map(|f| Fix::parse(f.lat, f.lon, &f.timestamp))
            .collect::<Result<Vec<_>>>()?;
        let kind = request.strategy.unwrap_or(self.config.classifier.strategy);
        self.classify(&fixes, kind)
    }

    /// Parse a [`ClassifyRequest`] and return the [`ClassifiedTrajectory`] as JSON.
    pub fn classify_json(&self, request_json: &str) -> Result<String> {
        let request: ClassifyRequest = serde_json::from_str(request_json)?;
        let result = self.classify_request(&request)?;
        Ok(serde_json::to_string(&result)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use time::OffsetDateTime;

    fn fix(lat: f64, lon: f64, seconds: i64) -> Fix {
        Fix::new(
            lat,
            lon,
            OffsetDateTime::from_unix_timestamp(1_728_554_400 + seconds).unwrap(),
        )
    }

    fn pipeline() -> Pipeline {
        Pipeline::new(Config::default()).unwrap()
    }

    /// Three fixes due north, ~1.5 km apart, 60 s apart: ~90 km/h.
    fn fast_straight() -> Vec<Fix> {
        vec![
            fix(18.4879, 74.0234, 0),
            fix(18.5014, 74.0234, 60),
            fix(18.5149, 74.0234, 120),
        ]
    }

    #[test]
    fn slow_pair_is_service_road() {
        let fixes = vec![
            Fix::parse(18.4879, 74.0234, "2024-10-10 10:00:00").unwrap(),
            Fix::parse(18.4885, 74.0240, "2024-10-10 10:10:00").unwrap(),
        ];
        let result = pipeline().classify(&fixes, StrategyKind::Threshold).unwrap();

        assert_eq!(result.segments.len(), 1);
        let seg = &result.segments[0];
        assert!(seg.segment.speed_kmh < 1.0);
        assert_eq!(seg.label, Some(Label::ServiceRoad));
        assert!((seg.midpoint.lat - 18.4882).abs() < 1e-9);
        assert!((seg.midpoint.lon - 74.0237).abs() < 1e-9);
    }

    #[test]
    fn fast_straight_is_highway_for_both_strategies() {
        let fixes = fast_straight();
        let p = pipeline();

        for kind in [StrategyKind::Threshold, StrategyKind::Learned] {
            let result = p.classify(&fixes, kind).unwrap();
            assert_eq!(result.strategy, kind);
            assert_eq!(result.segments.len(), 2);
            for seg in &result.segments {
                assert!((seg.segment.speed_kmh - 90.0).abs() < 1.0,
                    "Expected ~90 km/h, got {}", seg.segment.speed_kmh);
            }
            assert!(result.segments[1].segment.turning_angle_deg < 0.01);
            assert_eq!(
                result.labels(),
                vec![Some(Label::Highway), Some(Label::Highway)],
                "{kind:?}"
            );
        }
    }

    #[test]
    fn route_length_matches_segments() {
        let result = pipeline()
            .classify(&fast_straight(), StrategyKind::Threshold)
            .unwrap();
        let path = result.path();

        assert_eq!(path.len(), 3);
        assert_eq!(path[0], Point::new(18.4879, 74.0234));
        assert_eq!(path[2], Point::new(18.5149, 74.0234));
        let summed: f64 = result.segments.iter().map(|s| s.segment.distance_m).sum();
        assert!((result.total_distance_m() - summed).abs() < 1e-6);
        assert!((result.total_distance_m() - 3002.3).abs() < 1.0,
            "Expected ~3 km, got {:.1} m", result.total_distance_m());
    }

    #[test]
    fn start_from_rest_is_not_a_turn() {
        // Parked for 30 s, then east at ~90 km/h twice
        let fixes = vec![
            fix(18.4879, 74.0234, 0),
            fix(18.4879, 74.0234, 30),
            fix(18.4879, 74.0376, 90),
            fix(18.4879, 74.0518, 150),
        ];
        let result = pipeline().classify(&fixes, StrategyKind::Learned).unwrap();

        let moving = &result.segments[1].segment;
        assert!(moving.speed_kmh > 80.0);
        assert!((moving.heading_deg - 90.0).abs() < 0.1);
        assert_eq!(moving.turning_angle_deg, 0.0);
        assert_eq!(result.segments[1].label, Some(Label::Highway));
        assert_eq!(result.segments[2].label, Some(Label::Highway));
    }

    #[test]
    fn equal_timestamps_do_not_fail() {
        let fixes = vec![fix(18.4879, 74.0234, 0), fix(18.4885, 74.0240, 0)];
        let result = pipeline().classify(&fixes, StrategyKind::Threshold).unwrap();

        assert_eq!(result.segments[0].segment.speed_kmh, 0.0);
        assert_eq!(result.warnings, vec![Warning::TimestampOrder { segment: 0 }]);
        assert_eq!(result.segments[0].label, Some(Label::ServiceRoad));
        assert!(result.failures.is_empty());
    }

    #[test]
    fn single_fix_is_insufficient() {
        let err = pipeline()
            .classify(&[fix(18.0, 74.0, 0)], StrategyKind::Threshold)
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientData { count: 1 }));
    }

    #[test]
    fn out_of_range_coordinate_rejected() {
        let fixes = vec![fix(18.0, 74.0, 0), fix(18.0, 190.0, 60)];
        let err = pipeline().classify(&fixes, StrategyKind::Threshold).unwrap_err();
        assert!(matches!(err, Error::InvalidCoordinate { index: 1, .. }));
    }

    #[test]
    fn json_round_trip() {
        let request = r#"{
            "fixes": [
                { "lat": 18.4879, "lon": 74.0234, "timestamp": "2024-10-10 10:00:00" },
                { "lat": 18.5014, "lon": 74.0234, "timestamp": "2024-10-10 10:01:00" }
            ],
            "strategy": "learned"
        }"#;
        let json = pipeline().classify_json(request).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["strategy"], "learned");
        assert!(parsed["segments"].is_array());
        assert_eq!(parsed["segments"][0]["label"], "Highway");
        assert!(parsed["segments"][0]["speed_kmh"].as_f64().unwrap() > 80.0);
        assert!(parsed["warnings"].as_array().unwrap().is_empty());
    }

    #[test]
    fn json_bad_timestamp() {
        let request = r#"{
            "fixes": [
                { "lat": 18.4879, "lon": 74.0234, "timestamp": "yesterday" },
                { "lat": 18.4885, "lon": 74.0240, "timestamp": "2024-10-10 10:10:00" }
            ]
        }"#;
        let err = pipeline().classify_json(request).unwrap_err();
        assert!(matches!(err, Error::InvalidTimestamp { .. }));
    }

    #[test]
    fn gpx_track_classifies() {
        let gpx = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test"
     xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <trkseg>
      <trkpt lat="18.4879" lon="74.0234"><time>2024-10-10T10:00:00Z</time></trkpt>
      <trkpt lat="18.5014" lon="74.0234"><time>2024-10-10T10:01:00Z</time></trkpt>
      <trkpt lat="18.5020" lon="74.0240"><time>2024-10-10T10:03:00Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;
        let tracks = gpx::parse_bytes(gpx.as_bytes()).unwrap();
        let result = pipeline()
            .classify(&tracks[0].fixes, StrategyKind::Threshold)
            .unwrap();
        assert_eq!(
            result.labels(),
            vec![Some(Label::Highway), Some(Label::ServiceRoad)]
        );
    }
}
