/// Canonical field names shared by every normalized trip record.
pub mod fields {
    /// Membership flag (`true` for members/subscribers).
    pub const MEMBERSHIP: &str = "membership";
    /// Vehicle flag (`true` for electric bikes).
    pub const ELECTRIC: &str = "electric";
    /// Trip start timestamp.
    pub const START_DT: &str = "start_dt";
    /// Trip end timestamp.
    pub const END_DT: &str = "end_dt";
    /// Start station identifier.
    pub const START_STATION: &str = "start_station";
    /// End station identifier.
    pub const END_STATION: &str = "end_station";
    /// Start latitude in decimal degrees.
    pub const LAT1: &str = "lat1";
    /// Start longitude in decimal degrees.
    pub const LNG1: &str = "lng1";
    /// End latitude in decimal degrees.
    pub const LAT2: &str = "lat2";
    /// End longitude in decimal degrees.
    pub const LNG2: &str = "lng2";
    /// Derived trip duration in seconds.
    pub const DURATION_SEC: &str = "duration_sec";
    /// Prefix of the derived distance column (`dist_mi`, `dist_km`).
    pub const DIST_PREFIX: &str = "dist_";
    /// Key column of the per-station view.
    pub const STATION: &str = "station";

    /// Canonical source fields in stable output order.
    pub const CANONICAL_FIELDS: [&str; 10] = [
        MEMBERSHIP,
        ELECTRIC,
        START_DT,
        END_DT,
        START_STATION,
        END_STATION,
        LAT1,
        LNG1,
        LAT2,
        LNG2,
    ];

    /// Fields that must resolve to a column in every input file.
    pub const REQUIRED_COLUMNS: [&str; 8] = [
        START_DT,
        END_DT,
        START_STATION,
        END_STATION,
        LAT1,
        LNG1,
        LAT2,
        LNG2,
    ];

    /// Flag fields that default to `false` when their column is absent.
    pub const FLAG_FIELDS: [&str; 2] = [MEMBERSHIP, ELECTRIC];
}

/// Historical column names accepted for each canonical field.
pub mod aliases {
    use super::fields;

    /// Default alias table covering the 2013-2025 schema revisions.
    pub const DEFAULT_ALIASES: [(&str, &[&str]); 10] = [
        (fields::MEMBERSHIP, &["member_casual", "usertype", "user_type"]),
        (fields::ELECTRIC, &["rideable_type"]),
        (fields::START_DT, &["started_at", "starttime", "start_time"]),
        (fields::END_DT, &["ended_at", "stoptime", "stop_time"]),
        (fields::START_STATION, &["start_station_name"]),
        (fields::END_STATION, &["end_station_name"]),
        (
            fields::LAT1,
            &["start_station_latitude", "start_station_lat", "start_lat"],
        ),
        (
            fields::LNG1,
            &["start_station_longitude", "start_station_lng", "start_lng"],
        ),
        (
            fields::LAT2,
            &["end_station_latitude", "end_station_lat", "end_lat"],
        ),
        (
            fields::LNG2,
            &["end_station_longitude", "end_station_lng", "end_lng"],
        ),
    ];
}

/// Categorical lookups and physical constants used by metric derivation.
pub mod metrics {
    /// Membership values mapped to the `membership` flag.
    pub const MEMBERSHIP_VALUES: [(&str, bool); 4] = [
        ("casual", false),
        ("member", true),
        ("customer", false),
        ("subscriber", true),
    ];
    /// Vehicle-type values mapped to the `electric` flag.
    pub const ELECTRIC_VALUES: [(&str, bool); 2] =
        [("classic_bike", false), ("electric_bike", true)];

    /// Mean earth radius in kilometres.
    pub const EARTH_RADIUS_KM: f64 = 6371.0;
    /// Mean earth radius in miles.
    pub const EARTH_RADIUS_MI: f64 = 3959.0;
    /// Decimal places kept on derived distances.
    pub const DISTANCE_DECIMALS: i32 = 4;

    /// Timestamp layouts seen across schema revisions, tried in order.
    pub const TIMESTAMP_FORMATS: [&str; 8] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
        "%m/%d/%Y %H:%M:%S%.f",
        "%m/%d/%Y %H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%Y/%m/%d %H:%M",
    ];
}

/// Constants used by file discovery and persistence.
pub mod transport {
    /// First year of published trip data.
    pub const FIRST_YEAR: i32 = 2013;
    /// Last year of published trip data.
    pub const LAST_YEAR: i32 = 2025;
    /// Extension of trip data files.
    pub const TRIP_FILE_EXTENSION: &str = "csv";
    /// Layout used when writing timestamps to output tables.
    pub const OUTPUT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
    /// Binary-prefixed size units used in footprint reports.
    pub const SIZE_UNITS: [&str; 9] = ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];
}

/// Log messages shared by the orchestrator and CLI.
pub mod orchestrator {
    /// Logged when a file task fails and is skipped.
    pub const SKIP_FAILED_FILE_MSG: &str = "skipping file that failed normalization";
    /// Logged after the unified table is persisted.
    pub const PERSISTED_MSG: &str = "unified aggregate persisted";
}
