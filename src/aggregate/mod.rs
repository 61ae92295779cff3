//! Aggregate views over canonical record sets.
//!
//! Each view produces a `PartialAggregate` per record set. Partials carry
//! mergeable accumulator state keyed by time bucket or station, so unifying
//! them is a keyed merge that is independent of order and grouping.

/// Mergeable per-cell reduction state.
pub mod accumulator;
/// Per-station load view.
pub mod station;
/// Time-bucketed summary view.
pub mod temporal;

use std::fmt;
use std::str::FromStr;

use crate::config::{DistanceUnit, StationParams, TemporalParams};
use crate::data::{RecordSet, Table};
use crate::errors::PipelineError;

pub use accumulator::Accumulator;
pub use station::StationPartial;
pub use temporal::TemporalPartial;

/// Name of an aggregate view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewName {
    /// `temporal_summary`.
    TemporalSummary,
    /// `view_per_station`.
    ViewPerStation,
}

impl ViewName {
    /// Stable view name.
    pub fn as_str(self) -> &'static str {
        match self {
            ViewName::TemporalSummary => "temporal_summary",
            ViewName::ViewPerStation => "view_per_station",
        }
    }
}

impl fmt::Display for ViewName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewName {
    type Err = PipelineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "temporal_summary" => Ok(ViewName::TemporalSummary),
            "view_per_station" => Ok(ViewName::ViewPerStation),
            other => Err(PipelineError::Configuration(format!(
                "unknown view '{other}': expected temporal_summary or view_per_station"
            ))),
        }
    }
}

/// A view together with its parameters.
#[derive(Clone, Debug, PartialEq)]
pub enum ViewRequest {
    /// Time-bucketed summary.
    Temporal(TemporalParams),
    /// Per-station load.
    Station(StationParams),
}

impl ViewRequest {
    /// Default parameters for `name`.
    pub fn with_defaults(name: ViewName) -> Self {
        match name {
            ViewName::TemporalSummary => ViewRequest::Temporal(TemporalParams::default()),
            ViewName::ViewPerStation => ViewRequest::Station(StationParams::default()),
        }
    }

    /// Name of the requested view.
    pub fn name(&self) -> ViewName {
        match self {
            ViewRequest::Temporal(_) => ViewName::TemporalSummary,
            ViewRequest::Station(_) => ViewName::ViewPerStation,
        }
    }

    /// Check parameters without touching any data.
    pub fn validate(&self, unit: DistanceUnit) -> Result<(), PipelineError> {
        PartialAggregate::empty(self, unit).map(|_| ())
    }
}

/// One record set's contribution to a view.
#[derive(Clone, Debug, PartialEq)]
pub enum PartialAggregate {
    /// Temporal buckets.
    Temporal(TemporalPartial),
    /// Station sides.
    Station(StationPartial),
}

impl PartialAggregate {
    /// Identity element of the reduce for `view`.
    pub fn empty(view: &ViewRequest, unit: DistanceUnit) -> Result<Self, PipelineError> {
        Ok(match view {
            ViewRequest::Temporal(params) => {
                PartialAggregate::Temporal(TemporalPartial::empty(params, unit)?)
            }
            ViewRequest::Station(params) => {
                PartialAggregate::Station(StationPartial::empty(params, unit))
            }
        })
    }

    /// Merge `other` into `self`; both must come from the same view request.
    pub fn merge(&mut self, other: PartialAggregate) -> Result<(), PipelineError> {
        match (self, other) {
            (PartialAggregate::Temporal(left), PartialAggregate::Temporal(right)) => {
                left.merge(right)
            }
            (PartialAggregate::Station(left), PartialAggregate::Station(right)) => {
                left.merge(right)
            }
            _ => Err(PipelineError::Configuration(
                "cannot merge partials of different views".to_string(),
            )),
        }
    }

    /// Number of group keys held.
    pub fn key_count(&self) -> usize {
        match self {
            PartialAggregate::Temporal(partial) => partial.bucket_count(),
            PartialAggregate::Station(partial) => partial.station_count(),
        }
    }

    /// Finish into the output table.
    pub fn finish(&self) -> Table {
        match self {
            PartialAggregate::Temporal(partial) => partial.finish(),
            PartialAggregate::Station(partial) => partial.finish(),
        }
    }
}

/// Aggregate one record set under `view`.
pub fn aggregate(set: &RecordSet, view: &ViewRequest) -> Result<PartialAggregate, PipelineError> {
    Ok(match view {
        ViewRequest::Temporal(params) => {
            PartialAggregate::Temporal(TemporalPartial::from_records(set, params)?)
        }
        ViewRequest::Station(params) => {
            PartialAggregate::Station(StationPartial::from_records(set, params))
        }
    })
}

/// Merge partials by key and finish them into one unified table.
pub fn unify<I>(view: &ViewRequest, unit: DistanceUnit, partials: I) -> Result<Table, PipelineError>
where
    I: IntoIterator<Item = PartialAggregate>,
{
    let mut unified = PartialAggregate::empty(view, unit)?;
    for partial in partials {
        unified.merge(partial)?;
    }
    Ok(unified.finish())
}

/// Aggregate a whole record set in one pass, without partitioning.
pub fn aggregate_record_set(set: &RecordSet, view: &ViewRequest) -> Result<Table, PipelineError> {
    Ok(aggregate(set, view)?.finish())
}
