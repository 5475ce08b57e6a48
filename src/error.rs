//! Error types for roadclass

use thiserror::Error;

/// Hard failures. Soft conditions (clamped speeds, out-of-order timestamps)
/// are reported as [`crate::trajectory::Warning`] instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("insufficient data: {count} fixes supplied, at least 2 required")]
    InsufficientData { count: usize },

    #[error("too many fixes: {count} supplied, limit is {max}")]
    TooManyFixes { count: usize, max: usize },

    #[error("invalid coordinate at fix {index}: lat={lat}, lon={lon}")]
    InvalidCoordinate { index: usize, lat: f64, lon: f64 },

    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("track {track}: point {index} has no timestamp")]
    MissingTimestamp { track: usize, index: usize },

    /// `segment` is `None` when a bare feature vector was classified.
    #[error("invalid feature{}: {reason}", segment_context(.segment))]
    InvalidFeature {
        segment: Option<usize>,
        reason: String,
    },

    #[error("model fit failed: {0}")]
    ModelFitFailure(String),

    #[error("GPX parse error: {0}")]
    Gpx(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<gpx::errors::GpxError> for Error {
    fn from(e: gpx::errors::GpxError) -> Self {
        Error::Gpx(e.to_string())
    }
}

fn segment_context(segment: &Option<usize>) -> String {
    segment.map(|s| format!(" for segment {s}")).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_mentions_count() {
        let err = Error::InsufficientData { count: 1 };
        assert!(err.to_string().contains("1 fixes"));
    }

    #[test]
    fn invalid_feature_mentions_reason() {
        let err = Error::InvalidFeature {
            segment: None,
            reason: "speed -3".into(),
        };
        assert_eq!(err.to_string(), "invalid feature: speed -3");
    }

    #[test]
    fn invalid_feature_mentions_segment() {
        let err = Error::InvalidFeature {
            segment: Some(4),
            reason: "distance -1".into(),
        };
        assert_eq!(err.to_string(), "invalid feature for segment 4: distance -1");
    }

    #[test]
    fn json_error_converts() {
        let err: Error = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, Error::Json(_)));
    }
}
