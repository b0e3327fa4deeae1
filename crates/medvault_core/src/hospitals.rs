//! crates/medvault_core/src/hospitals.rs
//!
//! Nearest-hospital ranking by great-circle distance.

use crate::domain::{Coordinates, Hospital, RankedHospital};
use crate::ports::{PortError, PortResult};

pub const EARTH_RADIUS_KM: f64 = 6371.0;
/// Hospitals further away than this are never suggested.
pub const SEARCH_RADIUS_KM: f64 = 10.0;
pub const MAX_SUGGESTIONS: usize = 5;

/// Haversine distance between two points, in kilometres.
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Rejects coordinates outside the valid latitude/longitude ranges.
pub fn validate_coordinates(point: Coordinates) -> PortResult<()> {
    let lat_ok = point.latitude.is_finite() && (-90.0..=90.0).contains(&point.latitude);
    let lon_ok = point.longitude.is_finite() && (-180.0..=180.0).contains(&point.longitude);
    if lat_ok && lon_ok {
        Ok(())
    } else {
        Err(PortError::Validation(format!(
            "Invalid coordinates: latitude {}, longitude {}",
            point.latitude, point.longitude
        )))
    }
}

/// Verified hospitals with known coordinates within `SEARCH_RADIUS_KM` of
/// `origin`, closest first, at most `MAX_SUGGESTIONS`.
pub fn rank_nearest(hospitals: Vec<Hospital>, origin: Coordinates) -> Vec<RankedHospital> {
    let mut in_range: Vec<(f64, Hospital)> = hospitals
        .into_iter()
        .filter(|h| h.is_verified)
        .filter_map(|h| {
            let location = Coordinates {
                latitude: h.latitude?,
                longitude: h.longitude?,
            };
            Some((haversine_km(origin, location), h))
        })
        .filter(|(distance, _)| *distance <= SEARCH_RADIUS_KM)
        .collect();

    in_range.sort_by(|a, b| a.0.total_cmp(&b.0));

    in_range
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(distance, hospital)| RankedHospital {
            hospital,
            distance_km: round2(distance),
        })
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
