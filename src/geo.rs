//! Spherical earth geometry

/// Mean earth radius in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres between two points, haversine formula.
pub fn distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Destination point after travelling `speed_kmh * duration_hours` along
/// `bearing_deg` (0 = north, clockwise) from (`lat`, `lng`).
///
/// Longitude of the result is normalized into (-180, 180]. NaN inputs
/// propagate to the output.
pub fn displace(
    lat: f64,
    lng: f64,
    speed_kmh: f64,
    bearing_deg: f64,
    duration_hours: f64,
) -> (f64, f64) {
    let dist_rad = speed_kmh * duration_hours / EARTH_RADIUS_KM;
    let bearing = bearing_deg.to_radians();
    let lat_rad = lat.to_radians();
    let lng_rad = lng.to_radians();

    let new_lat_rad = (lat_rad.sin() * dist_rad.cos()
        + lat_rad.cos() * dist_rad.sin() * bearing.cos())
    .asin();

    let new_lng_rad = lng_rad
        + (bearing.sin() * dist_rad.sin() * lat_rad.cos())
            .atan2(dist_rad.cos() - lat_rad.sin() * new_lat_rad.sin());

    (
        new_lat_rad.to_degrees(),
        normalize_longitude(new_lng_rad.to_degrees()),
    )
}

/// Wrap a longitude into (-180, 180]
pub fn normalize_longitude(lng: f64) -> f64 {
    let wrapped = (lng + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped <= -180.0 {
        180.0
    } else {
        wrapped
    }
}
