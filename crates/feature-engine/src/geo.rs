//! Great-circle Distance and Bearing
//!
//! All functions take `(lat1, lng1, lat2, lng2)` in decimal degrees. The
//! formulas and the Earth radius are part of the training contract, so they
//! are written out here rather than delegated to a geodesy crate whose radius
//! or method may differ.

/// Mean Earth radius used when the estimator was fit (km)
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine great-circle distance in kilometres
pub fn haversine_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let (lat1, lng1, lat2, lng2) = (
        lat1.to_radians(),
        lng1.to_radians(),
        lat2.to_radians(),
        lng2.to_radians(),
    );
    let dlat = lat2 - lat1;
    let dlng = lng2 - lng1;

    let d = (dlat * 0.5).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng * 0.5).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * d.sqrt().asin()
}

/// Grid-like distance proxy in kilometres.
///
/// Sum of a pure-longitude leg and a pure-latitude leg, both measured with
/// [`haversine_distance`] from the pickup point. This is not a planar
/// Manhattan metric: each leg follows the sphere, and the longitude leg is
/// taken at the pickup latitude.
pub fn manhattan_proxy_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let a = haversine_distance(lat1, lng1, lat1, lng2);
    let b = haversine_distance(lat1, lng1, lat2, lng1);
    a + b
}

/// Initial compass bearing from point 1 to point 2 in degrees, in (-180, 180].
///
/// Coincident points give `atan2(0, 0) = 0`.
pub fn bearing_degrees(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let dlng = (lng2 - lng1).to_radians();
    let (lat1, lat2) = (lat1.to_radians(), lat2.to_radians());

    let y = dlng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlng.cos();
    y.atan2(x).to_degrees()
}
