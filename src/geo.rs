//! Geodesic computations.
//!
//! Stateless functions for distance, speed, heading and turning angle
//! between WGS84 positions (lat/lon in degrees).

use time::OffsetDateTime;

use crate::gpx::Point;

/// Earth radius in meters (WGS84 mean).
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// m/s to km/h.
const MS_TO_KMH: f64 = 3.6;

/// Haversine great-circle distance between two points in meters.
pub fn distance(a: &Point, b: &Point) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    // Rounding can push h marginally above 1 for antipodal points
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Average speed between two timestamped positions in km/h.
///
/// Returns 0 when `t2 <= t1` instead of dividing by a non-positive interval.
pub fn speed(a: &Point, b: &Point, t1: OffsetDateTime, t2: OffsetDateTime) -> f64 {
    let seconds = (t2 - t1).as_seconds_f64();
    if seconds <= 0.0 {
        return 0.0;
    }
    distance(a, b) / seconds * MS_TO_KMH
}

/// Initial bearing from A to B in degrees [0, 360), 0 = north.
pub fn heading(a: &Point, b: &Point) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    let bearing = (y.atan2(x).to_degrees() + 360.0) % 360.0;
    // -0.0 + 360 can round to exactly 360
    if bearing >= 360.0 {
        0.0
    } else {
        bearing
    }
}

/// Minimal angular difference between two headings in degrees [0, 180].
///
/// Wraparound at 0/360 is handled, so 350 -> 10 is a 20 degree turn.
pub fn turning_angle(previous: f64, current: f64) -> f64 {
    ((current - previous + 180.0).rem_euclid(360.0) - 180.0).abs()
}

/// Total length of a polyline in meters.
pub fn track_length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| distance(&w[0], &w[1])).sum()
}
