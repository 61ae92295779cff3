use std::collections::BTreeMap;

use crate::aggregate::accumulator::Accumulator;
use crate::config::{AggFunc, DistanceUnit, StationMetric, StationParams};
use crate::constants::fields;
use crate::data::{Cell, MetricColumn, RecordSet, Table};
use crate::errors::PipelineError;
use crate::types::{FieldName, StationId};

/// Start-side and end-side state of one station.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct StationSides {
    start: Accumulator,
    end: Accumulator,
}

/// One file's per-station contribution.
///
/// Stations seen on only one side keep an empty accumulator on the other,
/// which finishes to `0`, so the final value is a full outer combine.
#[derive(Clone, Debug, PartialEq)]
pub struct StationPartial {
    metric: MetricColumn,
    metric_name: FieldName,
    func: AggFunc,
    stations: BTreeMap<StationId, StationSides>,
}

impl StationPartial {
    /// Partial with no stations, used as the reduce identity.
    pub fn empty(params: &StationParams, unit: DistanceUnit) -> Self {
        let metric = match params.metric {
            StationMetric::Distance => MetricColumn::Distance,
            StationMetric::Duration => MetricColumn::Duration,
        };
        Self {
            metric,
            metric_name: params.metric.column_name(unit),
            func: params.agg_func,
            stations: BTreeMap::new(),
        }
    }

    /// Aggregate `set` by start station and by end station.
    pub fn from_records(set: &RecordSet, params: &StationParams) -> Self {
        let mut partial = Self::empty(params, set.unit);
        for record in &set.records {
            let value = record.metric(partial.metric);
            partial
                .stations
                .entry(record.start_station.clone())
                .or_default()
                .start
                .push(value);
            partial
                .stations
                .entry(record.end_station.clone())
                .or_default()
                .end
                .push(value);
        }
        partial
    }

    /// Number of distinct stations seen on either side.
    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    /// Fold `other` into `self` station by station.
    pub fn merge(&mut self, other: StationPartial) -> Result<(), PipelineError> {
        if self.metric_name != other.metric_name || self.func != other.func {
            return Err(PipelineError::Configuration(
                "cannot merge station partials built with different parameters".to_string(),
            ));
        }
        for (station, sides) in other.stations {
            let target = self.stations.entry(station).or_default();
            target.start.merge(&sides.start);
            target.end.merge(&sides.end);
        }
        Ok(())
    }

    /// Finish into a `station, <metric>_<func>` table sorted by station.
    pub fn finish(&self) -> Table {
        let columns = vec![
            fields::STATION.to_string(),
            format!("{}_{}", self.metric_name, self.func),
        ];
        let rows = self
            .stations
            .iter()
            .map(|(station, sides)| {
                let total = sides.start.finish(self.func) + sides.end.finish(self.func);
                vec![Cell::Text(station.clone()), Cell::Number(total)]
            })
            .collect();
        Table { columns, rows }
    }
}
