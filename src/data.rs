use std::mem;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::config::DistanceUnit;
use crate::constants::fields::{self, CANONICAL_FIELDS};
use crate::constants::transport::OUTPUT_TIMESTAMP_FORMAT;
use crate::types::{FieldName, RawCell, RawColumnName, StationId};

/// Untyped table as loaded from one source file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawTable {
    /// Header row exactly as read.
    pub headers: Vec<RawColumnName>,
    /// Data rows; each row has one cell per header.
    pub rows: Vec<Vec<RawCell>>,
}

/// One normalized trip with every canonical field populated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    /// Rider is a member/subscriber.
    pub membership: bool,
    /// Vehicle is an electric bike.
    pub electric: bool,
    /// Trip start.
    pub start_dt: NaiveDateTime,
    /// Trip end.
    pub end_dt: NaiveDateTime,
    /// Start station identifier.
    pub start_station: StationId,
    /// End station identifier.
    pub end_station: StationId,
    /// Start latitude.
    pub lat1: f64,
    /// Start longitude.
    pub lng1: f64,
    /// End latitude.
    pub lat2: f64,
    /// End longitude.
    pub lng2: f64,
    /// Great-circle distance in the record set's unit.
    pub dist: f64,
    /// `end_dt - start_dt` in seconds (not clamped).
    pub duration_sec: f64,
}

impl TripRecord {
    /// Value of a derived metric column.
    pub fn metric(&self, metric: MetricColumn) -> f64 {
        match metric {
            MetricColumn::Distance => self.dist,
            MetricColumn::Duration => self.duration_sec,
        }
    }
}

/// Derived numeric columns available to the aggregators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetricColumn {
    /// `dist_<unit>`.
    Distance,
    /// `duration_sec`.
    Duration,
}

impl MetricColumn {
    /// Metric columns in canonical output order.
    pub const ALL: [MetricColumn; 2] = [MetricColumn::Distance, MetricColumn::Duration];

    /// Column name of this metric under `unit`.
    pub fn column_name(self, unit: DistanceUnit) -> FieldName {
        match self {
            MetricColumn::Distance => unit.column_name(),
            MetricColumn::Duration => fields::DURATION_SEC.to_string(),
        }
    }
}

/// Canonical records of one source file.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordSet {
    /// File the records were read from.
    pub source: PathBuf,
    /// Unit of `TripRecord::dist`.
    pub unit: DistanceUnit,
    /// Rows that survived the required-field filter.
    pub records: Vec<TripRecord>,
    /// Rows excluded because a required value was missing or unparsable.
    pub dropped: usize,
}

impl RecordSet {
    /// Empty set tagged with `source` and `unit`.
    pub fn new(source: impl Into<PathBuf>, unit: DistanceUnit) -> Self {
        Self {
            source: source.into(),
            unit,
            records: Vec::new(),
            dropped: 0,
        }
    }

    /// Canonical columns followed by the derived metric columns.
    pub fn columns(&self) -> Vec<FieldName> {
        CANONICAL_FIELDS
            .iter()
            .map(|field| field.to_string())
            .chain(MetricColumn::ALL.iter().map(|metric| metric.column_name(self.unit)))
            .collect()
    }

    /// Number of kept records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no record survived normalization.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append every record of `other`; used to build one-pass references.
    pub fn extend(&mut self, other: RecordSet) {
        self.records.extend(other.records);
        self.dropped += other.dropped;
    }
}

/// One output cell.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    /// Bucket label.
    Timestamp(NaiveDateTime),
    /// Station identifier.
    Text(String),
    /// Aggregated value.
    Number(f64),
}

impl Cell {
    /// Numeric payload, if any.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Text rendering used for CSV output.
    pub fn render(&self) -> String {
        match self {
            Cell::Timestamp(ts) => ts.format(OUTPUT_TIMESTAMP_FORMAT).to_string(),
            Cell::Text(text) => text.clone(),
            Cell::Number(value) => value.to_string(),
        }
    }

    fn heap_bytes(&self) -> usize {
        match self {
            Cell::Text(text) => text.capacity(),
            _ => 0,
        }
    }
}

/// Finished aggregate table: ordered columns, one row per group key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    /// Column names; the first column is the group key.
    pub columns: Vec<FieldName>,
    /// Rows in key order.
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Index of `column`, if present.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|name| name == column)
    }

    /// Values of a numeric column in row order.
    pub fn numeric_column(&self, column: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(column)?;
        self.rows
            .iter()
            .map(|row| row.get(idx).and_then(Cell::as_number))
            .collect()
    }

    /// Approximate in-memory footprint in bytes.
    pub fn estimated_size_bytes(&self) -> u64 {
        let header: usize = self
            .columns
            .iter()
            .map(|name| mem::size_of::<FieldName>() + name.capacity())
            .sum();
        let cells: usize = self
            .rows
            .iter()
            .map(|row| {
                mem::size_of::<Vec<Cell>>()
                    + row.capacity() * mem::size_of::<Cell>()
                    + row.iter().map(Cell::heap_bytes).sum::<usize>()
            })
            .sum();
        (mem::size_of::<Self>() + header + cells) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn record_set_columns_append_metrics_in_order() {
        let set = RecordSet::new("trips.csv", DistanceUnit::Km);
        let columns = set.columns();
        assert_eq!(columns.len(), 12);
        assert_eq!(columns[0], "membership");
        assert_eq!(columns[9], "lng2");
        assert_eq!(columns[10], "dist_km");
        assert_eq!(columns[11], "duration_sec");
    }

    #[test]
    fn cells_render_for_csv() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        assert_eq!(Cell::Timestamp(ts).render(), "2024-03-01 08:00:00");
        assert_eq!(Cell::Number(930.0).render(), "930");
        assert_eq!(Cell::Number(1.25).render(), "1.25");
        assert_eq!(Cell::Text("W 21 St & 6 Ave".into()).render(), "W 21 St & 6 Ave");
    }

    #[test]
    fn table_footprint_grows_with_rows() {
        let mut table = Table {
            columns: vec!["station".into(), "dist_mi_sum".into()],
            rows: Vec::new(),
        };
        let empty = table.estimated_size_bytes();
        table
            .rows
            .push(vec![Cell::Text("A".into()), Cell::Number(1.0)]);
        assert!(table.estimated_size_bytes() > empty);
        assert_eq!(table.numeric_column("dist_mi_sum"), Some(vec![1.0]));
        assert_eq!(table.numeric_column("station"), None);
    }
}
