//! Per-trip metric derivation: distance, duration, and categorical flags.

use chrono::NaiveDateTime;

use crate::config::DistanceUnit;
use crate::constants::metrics::{
    DISTANCE_DECIMALS, EARTH_RADIUS_KM, EARTH_RADIUS_MI, ELECTRIC_VALUES, MEMBERSHIP_VALUES,
};
use crate::utils::normalize_column;

impl DistanceUnit {
    /// Mean earth radius expressed in this unit.
    pub fn earth_radius(self) -> f64 {
        match self {
            DistanceUnit::Km => EARTH_RADIUS_KM,
            DistanceUnit::Mi => EARTH_RADIUS_MI,
        }
    }
}

/// Great-circle distance between two points given in decimal degrees.
///
/// Uses the haversine formula and rounds to four decimal places.
pub fn haversine(lat1: f64, lng1: f64, lat2: f64, lng2: f64, unit: DistanceUnit) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();
    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    round_to(unit.earth_radius() * c, DISTANCE_DECIMALS)
}

/// Trip duration in seconds; negative when the timestamps are inverted.
pub fn duration_seconds(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    let delta = end - start;
    match delta.num_microseconds() {
        Some(micros) => micros as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1_000.0,
    }
}

/// Map a raw membership value to the `membership` flag.
pub fn remap_membership(raw: &str) -> Option<bool> {
    remap(raw, &MEMBERSHIP_VALUES)
}

/// Map a raw vehicle-type value to the `electric` flag.
pub fn remap_electric(raw: &str) -> Option<bool> {
    remap(raw, &ELECTRIC_VALUES)
}

fn remap(raw: &str, lookup: &[(&str, bool)]) -> Option<bool> {
    let value = raw.trim().to_lowercase();
    lookup
        .iter()
        .find(|(key, _)| normalize_column(key) == value)
        .map(|(_, flag)| *flag)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn haversine_matches_reference_distance() {
        let miles = haversine(40.7128, -74.0060, 40.7306, -73.9352, DistanceUnit::Mi);
        assert!((miles - 3.9063).abs() < 1e-9, "got {miles}");
        let km = haversine(40.7128, -74.0060, 40.7306, -73.9352, DistanceUnit::Km);
        assert!((km - 6.2863).abs() < 1e-9, "got {km}");
    }

    #[test]
    fn haversine_is_symmetric_and_zero_on_identity() {
        let there = haversine(40.7411, -73.9897, 40.6892, -74.0445, DistanceUnit::Km);
        let back = haversine(40.6892, -74.0445, 40.7411, -73.9897, DistanceUnit::Km);
        assert_eq!(there, back);
        assert_eq!(haversine(40.7411, -73.9897, 40.7411, -73.9897, DistanceUnit::Mi), 0.0);
    }

    #[test]
    fn haversine_rounds_to_four_decimals() {
        let value = haversine(40.0, -74.0, 40.001, -74.001, DistanceUnit::Km);
        assert_eq!((value * 10_000.0).round() / 10_000.0, value);
    }

    #[test]
    fn duration_is_difference_in_seconds() {
        assert_eq!(duration_seconds(at(10, 0, 0), at(10, 15, 30)), 930.0);
        assert_eq!(duration_seconds(at(10, 15, 30), at(10, 0, 0)), -930.0);
    }

    #[test]
    fn categorical_values_map_case_insensitively() {
        assert_eq!(remap_membership(" Subscriber "), Some(true));
        assert_eq!(remap_membership("Customer"), Some(false));
        assert_eq!(remap_membership("member"), Some(true));
        assert_eq!(remap_membership("casual"), Some(false));
        assert_eq!(remap_membership("Dependent"), None);
        assert_eq!(remap_membership(""), None);
        assert_eq!(remap_electric("electric_bike"), Some(true));
        assert_eq!(remap_electric("CLASSIC_BIKE"), Some(false));
        assert_eq!(remap_electric("docked_bike"), None);
    }
}
