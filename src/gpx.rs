//! GNSS fixes and their sources.
//!
//! Defines the position/fix types consumed by the rest of the crate,
//! parses the `YYYY-MM-DD HH:MM:SS` timestamps used by form-style input,
//! and reads timestamped tracks from GPX 1.1 files via the `gpx` crate.

use serde::{Deserialize, Serialize};
use std::io::Read;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::error::{Error, Result};

/// Timestamp layout accepted by [`parse_timestamp`].
const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// A geographic coordinate (WGS84 degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

impl Point {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Midpoint in coordinate space. Used for label placement, not navigation.
    pub fn midpoint(&self, other: &Point) -> Point {
        Point {
            lat: (self.lat + other.lat) / 2.0,
            lon: (self.lon + other.lon) / 2.0,
        }
    }
}

/// A single GNSS reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    pub lat: f64,
    pub lon: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub time: OffsetDateTime,
}

impl Fix {
    pub fn new(lat: f64, lon: f64, time: OffsetDateTime) -> Self {
        Self { lat, lon, time }
    }

    /// Build a fix from a `YYYY-MM-DD HH:MM:SS` timestamp (interpreted as UTC).
    pub fn parse(lat: f64, lon: f64, timestamp: &str) -> Result<Self> {
        Ok(Self::new(lat, lon, parse_timestamp(timestamp)?))
    }

    pub fn point(&self) -> Point {
        Point::new(self.lat, self.lon)
    }
}

/// A named sequence of timestamped fixes read from a GPX track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixTrack {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub fixes: Vec<Fix>,
}

/// Parse a `YYYY-MM-DD HH:MM:SS` timestamp as UTC.
pub fn parse_timestamp(value: &str) -> Result<OffsetDateTime> {
    PrimitiveDateTime::parse(value.trim(), TIMESTAMP_FORMAT)
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|e| Error::InvalidTimestamp {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// Reject coordinates outside the WGS84 ranges.
///
/// Signs are kept as given: southern and western positions are negative.
pub fn validate_coordinates(fixes: &[Fix]) -> Result<()> {
    for (index, fix) in fixes.iter().enumerate() {
        let lat_ok = fix.lat.is_finite() && (-90.0..=90.0).contains(&fix.lat);
        let lon_ok = fix.lon.is_finite() && (-180.0..=180.0).contains(&fix.lon);
        if !lat_ok || !lon_ok {
            return Err(Error::InvalidCoordinate {
                index,
                lat: fix.lat,
                lon: fix.lon,
            });
        }
    }
    Ok(())
}

/// Read all tracks of a GPX file as fix sequences.
///
/// Track segments are flattened into one sequence per track. Every track
/// point must carry a `<time>` element.
pub fn parse_tracks<R: Read>(reader: R) -> Result<Vec<FixTrack>> {
    let gpx = gpx::read(reader)?;

    gpx.tracks
        .iter()
        .enumerate()
        .map(|(track_idx, t)| {
            let fixes = t
                .segments
                .iter()
                .flat_map(|seg| seg.points.iter())
                .enumerate()
                .map(|(i, wp)| {
                    let time = wp.time.as_ref().ok_or_else(|| Error::MissingTimestamp {
                        track: track_idx,
                        index: i,
                    })?;
                    Ok(Fix {
                        lat: wp.point().y(),
                        lon: wp.point().x(),
                        time: OffsetDateTime::from(time.clone()),
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(FixTrack {
                name: t.name.clone(),
                fixes,
            })
        })
        .collect()
}

/// Parse GPX tracks from a byte slice.
pub fn parse_bytes(data: &[u8]) -> Result<Vec<FixTrack>> {
    parse_tracks(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMED_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test"
     xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>Commute</name>
    <trkseg>
      <trkpt lat="18.4879" lon="74.0234"><time>2024-10-10T10:00:00Z</time></trkpt>
      <trkpt lat="18.4885" lon="74.0240"><time>2024-10-10T10:10:00Z</time></trkpt>
    </trkseg>
    <trkseg>
      <trkpt lat="18.4900" lon="74.0250"><time>2024-10-10T10:15:00Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

    #[test]
    fn parse_timestamp_form_format() {
        let t = parse_timestamp("2024-10-10 10:10:00").unwrap();
        let t0 = parse_timestamp("2024-10-10 10:00:00").unwrap();
        assert_eq!((t - t0).whole_seconds(), 600);
        assert_eq!(t.offset(), time::UtcOffset::UTC);
    }

    #[test]
    fn parse_timestamp_rejects_garbage() {
        let err = parse_timestamp("10/10/2024 10:00").unwrap_err();
        assert!(matches!(err, Error::InvalidTimestamp { .. }));
    }

    #[test]
    fn fix_parse_keeps_signs() {
        let fix = Fix::parse(-33.8688, -151.2093, "2024-10-10 10:00:00").unwrap();
        assert_eq!(fix.lat, -33.8688);
        assert_eq!(fix.lon, -151.2093);
    }

    #[test]
    fn validate_rejects_out_of_range() {
        let t = parse_timestamp("2024-10-10 10:00:00").unwrap();
        let fixes = vec![Fix::new(18.0, 74.0, t), Fix::new(95.0, 74.0, t)];
        match validate_coordinates(&fixes) {
            Err(Error::InvalidCoordinate { index, .. }) => assert_eq!(index, 1),
            other => panic!("Expected InvalidCoordinate, got {other:?}"),
        }
    }

    #[test]
    fn validate_accepts_southern_western() {
        let t = parse_timestamp("2024-10-10 10:00:00").unwrap();
        let fixes = vec![Fix::new(-45.0, -70.0, t), Fix::new(-45.1, -70.1, t)];
        assert!(validate_coordinates(&fixes).is_ok());
    }

    #[test]
    fn parse_timed_track() {
        let tracks = parse_bytes(TIMED_GPX.as_bytes()).unwrap();

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].name.as_deref(), Some("Commute"));
        // Segments are flattened
        assert_eq!(tracks[0].fixes.len(), 3);

        let f = &tracks[0].fixes[1];
        assert!((f.lat - 18.4885).abs() < 1e-6);
        assert!((f.lon - 74.0240).abs() < 1e-6);
        let dt = f.time - tracks[0].fixes[0].time;
        assert_eq!(dt.whole_seconds(), 600);
    }

    #[test]
    fn parse_track_without_time_fails() {
        let gpx = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test"
     xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <trkseg>
      <trkpt lat="48.0" lon="16.0"><time>2024-10-10T10:00:00Z</time></trkpt>
      <trkpt lat="48.1" lon="16.1"></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

        match parse_bytes(gpx.as_bytes()) {
            Err(Error::MissingTimestamp { track, index }) => {
                assert_eq!(track, 0);
                assert_eq!(index, 1);
            }
            other => panic!("Expected MissingTimestamp, got {other:?}"),
        }
    }

    #[test]
    fn parse_invalid_xml_returns_error() {
        let result = parse_bytes(b"not xml at all");
        assert!(matches!(result, Err(Error::Gpx(_))));
    }

    #[test]
    fn fix_serializes_rfc3339() {
        let fix = Fix::parse(18.4879, 74.0234, "2024-10-10 10:00:00").unwrap();
        let json = serde_json::to_string(&fix).unwrap();
        assert!(json.contains("2024-10-10T10:00:00Z"), "{json}");
    }
}
