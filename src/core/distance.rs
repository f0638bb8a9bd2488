use crate::models::{BoundingBox, GeoPoint, TravelEstimate};

/// Earth's radius in miles
const EARTH_RADIUS_MILES: f64 = 3959.0;

/// Roads are never straight; air distance is stretched by this factor
const ROAD_FACTOR: f64 = 1.3;

/// Average city driving pace, minutes per road mile
const MINUTES_PER_ROAD_MILE: f64 = 2.2;

/// Approximate miles per degree of latitude
const MILES_PER_DEGREE: f64 = 69.0;

/// Distance reported when either side has no coordinates.
/// Far enough that no service radius will ever include it.
pub const MISSING_LOCATION_MILES: f64 = 999.0;

/// Calculate the Haversine distance between two points in miles
///
/// # Arguments
/// * `lat1` - Latitude of first point in degrees
/// * `lon1` - Longitude of first point in degrees
/// * `lat2` - Latitude of second point in degrees
/// * `lon2` - Longitude of second point in degrees
///
/// # Returns
/// Distance in miles
#[inline]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_MILES * c
}

/// Distance in miles between two optional points.
///
/// A missing side yields [`MISSING_LOCATION_MILES`] rather than an error.
#[inline]
pub fn distance_between(a: Option<GeoPoint>, b: Option<GeoPoint>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => haversine_distance(a.lat, a.lng, b.lat, b.lng),
        _ => MISSING_LOCATION_MILES,
    }
}

/// Estimate the drive between two points from their straight-line distance
pub fn estimate_travel(a: GeoPoint, b: GeoPoint) -> TravelEstimate {
    travel_from_air_miles(haversine_distance(a.lat, a.lng, b.lat, b.lng))
}

#[inline]
pub fn travel_from_air_miles(air_miles: f64) -> TravelEstimate {
    let road_miles = air_miles * ROAD_FACTOR;
    TravelEstimate {
        air_miles,
        road_miles,
        travel_minutes: road_miles * MINUTES_PER_ROAD_MILE,
    }
}

/// Calculate a bounding box around a center point
///
/// Cheaper than Haversine for pre-filtering a large cleaner pool.
/// 1° latitude ≈ 69 mi, 1° longitude ≈ 69 mi * cos(latitude)
pub fn calculate_bounding_box(center: GeoPoint, radius_miles: f64) -> BoundingBox {
    let lat_delta = radius_miles / MILES_PER_DEGREE;

    // Clamp so the poles don't blow the longitude span up to infinity
    let cos_lat = center.lat.to_radians().cos().abs().max(0.01);
    let lon_delta = radius_miles / (MILES_PER_DEGREE * cos_lat);

    BoundingBox {
        min_lat: center.lat - lat_delta,
        max_lat: center.lat + lat_delta,
        min_lon: center.lng - lon_delta,
        max_lon: center.lng + lon_delta,
    }
}

/// Check if a point is within a bounding box
#[inline]
pub fn is_within_bounding_box(point: GeoPoint, bbox: &BoundingBox) -> bool {
    point.lat >= bbox.min_lat
        && point.lat <= bbox.max_lat
        && point.lng >= bbox.min_lon
        && point.lng <= bbox.max_lon
}
