//! Great-circle distance

use geo::geometry::Point;

/// Mean Earth radius used by the haversine formula, in km
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in km between two points in degrees (`x` = lon, `y` = lat).
///
/// Out of domain input (NaN coordinates) yields NaN.
pub fn haversine_km(a: &Point, b: &Point) -> f64 {
    let lat1 = a.y().to_radians();
    let lat2 = b.y().to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.x() - a.x()).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    // rounding can push h slightly over 1 near the antipode
    let h = if h > 1.0 { 1.0 } else { h };

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}
