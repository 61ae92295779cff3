//! Per-file normalization: load, canonicalize, derive, filter.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::config::DistanceUnit;
use crate::constants::fields;
use crate::data::{RawTable, RecordSet, TripRecord};
use crate::date_helpers::parse_timestamp;
use crate::errors::PipelineError;
use crate::metrics::{duration_seconds, haversine, remap_electric, remap_membership};
use crate::schema::Canonicalizer;
use crate::transport::tabular::load_table;
use crate::types::{FieldName, RawCell};

/// Turns one raw trip file into a canonical record set.
#[derive(Clone, Debug)]
pub struct FileNormalizer {
    canonicalizer: Arc<Canonicalizer>,
    unit: DistanceUnit,
}

/// Column positions of the canonical fields within one raw table.
struct ColumnPositions {
    start_dt: usize,
    end_dt: usize,
    start_station: usize,
    end_station: usize,
    lat1: usize,
    lng1: usize,
    lat2: usize,
    lng2: usize,
    membership: Option<usize>,
    electric: Option<usize>,
}

impl FileNormalizer {
    /// Create a normalizer sharing `canonicalizer` and deriving distances in `unit`.
    pub fn new(canonicalizer: Arc<Canonicalizer>, unit: DistanceUnit) -> Self {
        Self {
            canonicalizer,
            unit,
        }
    }

    /// Load and normalize the trip file at `path`.
    pub fn normalize(&self, path: &Path) -> Result<RecordSet, PipelineError> {
        let raw = load_table(path)?;
        self.normalize_table(&raw, path)
    }

    /// Normalize an already-loaded table; `path` is used for tagging and errors.
    pub fn normalize_table(&self, raw: &RawTable, path: &Path) -> Result<RecordSet, PipelineError> {
        let canonical = self
            .canonicalizer
            .canonicalize_headers(raw.headers.iter().map(String::as_str));
        let positions = self.resolve_positions(&canonical, path)?;

        let mut set = RecordSet::new(path, self.unit);
        set.records.reserve(raw.rows.len());
        for row in &raw.rows {
            match self.build_record(row, &positions) {
                Some(record) => set.records.push(record),
                None => set.dropped += 1,
            }
        }
        debug!(
            path = %path.display(),
            kept = set.records.len(),
            dropped = set.dropped,
            "normalized trip file"
        );
        Ok(set)
    }

    fn resolve_positions(
        &self,
        canonical: &[FieldName],
        path: &Path,
    ) -> Result<ColumnPositions, PipelineError> {
        let mut first_seen: HashMap<&str, usize> = HashMap::new();
        for (idx, name) in canonical.iter().enumerate() {
            if first_seen.contains_key(name.as_str()) {
                debug!(
                    path = %path.display(),
                    column = %name,
                    position = idx,
                    "duplicate canonical column; keeping first occurrence"
                );
                continue;
            }
            first_seen.insert(name.as_str(), idx);
        }
        let required = |field: &str| {
            first_seen
                .get(field)
                .copied()
                .ok_or_else(|| PipelineError::Schema {
                    path: path.to_path_buf(),
                    field: field.to_string(),
                })
        };
        Ok(ColumnPositions {
            start_dt: required(fields::START_DT)?,
            end_dt: required(fields::END_DT)?,
            start_station: required(fields::START_STATION)?,
            end_station: required(fields::END_STATION)?,
            lat1: required(fields::LAT1)?,
            lng1: required(fields::LNG1)?,
            lat2: required(fields::LAT2)?,
            lng2: required(fields::LNG2)?,
            membership: first_seen.get(fields::MEMBERSHIP).copied(),
            electric: first_seen.get(fields::ELECTRIC).copied(),
        })
    }

    /// Build one record; `None` when any required value is missing or unparsable.
    fn build_record(&self, row: &[RawCell], at: &ColumnPositions) -> Option<TripRecord> {
        let start_dt = parse_timestamp(cell(row, at.start_dt)?)?;
        let end_dt = parse_timestamp(cell(row, at.end_dt)?)?;
        let lat1 = parse_coordinate(cell(row, at.lat1)?)?;
        let lng1 = parse_coordinate(cell(row, at.lng1)?)?;
        let lat2 = parse_coordinate(cell(row, at.lat2)?)?;
        let lng2 = parse_coordinate(cell(row, at.lng2)?)?;
        let start_station = cell(row, at.start_station)?.to_string();
        let end_station = cell(row, at.end_station)?.to_string();
        let membership = remap_flag(row, at.membership, remap_membership)?;
        let electric = remap_flag(row, at.electric, remap_electric)?;

        Some(TripRecord {
            membership,
            electric,
            start_dt,
            end_dt,
            start_station,
            end_station,
            lat1,
            lng1,
            lat2,
            lng2,
            dist: haversine(lat1, lng1, lat2, lng2, self.unit),
            duration_sec: duration_seconds(start_dt, end_dt),
        })
    }
}

fn cell(row: &[RawCell], idx: usize) -> Option<&str> {
    row.get(idx).and_then(|value| value.as_deref())
}

fn parse_coordinate(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// An absent column defaults to `false`; a present but unknown value is `None`.
fn remap_flag(
    row: &[RawCell],
    position: Option<usize>,
    remap: fn(&str) -> Option<bool>,
) -> Option<bool> {
    match position {
        None => Some(false),
        Some(idx) => remap(cell(row, idx)?),
    }
}
