use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::aggregate::accumulator::Accumulator;
use crate::config::{AggFunc, DistanceUnit, DtField, Freq, TemporalParams};
use crate::constants::fields;
use crate::data::{Cell, MetricColumn, RecordSet, Table, TripRecord};
use crate::date_helpers::{bucket_label, next_bucket_label};
use crate::errors::PipelineError;
use crate::types::FieldName;

/// Input columns reduced by the temporal summary, in output order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum InputColumn {
    Membership,
    Electric,
    Metric(MetricColumn),
}

const INPUT_COLUMNS: [InputColumn; 4] = [
    InputColumn::Membership,
    InputColumn::Electric,
    InputColumn::Metric(MetricColumn::Distance),
    InputColumn::Metric(MetricColumn::Duration),
];

impl InputColumn {
    fn name(self, unit: DistanceUnit) -> FieldName {
        match self {
            InputColumn::Membership => fields::MEMBERSHIP.to_string(),
            InputColumn::Electric => fields::ELECTRIC.to_string(),
            InputColumn::Metric(metric) => metric.column_name(unit),
        }
    }

    fn value(self, record: &TripRecord) -> f64 {
        match self {
            InputColumn::Membership => f64::from(u8::from(record.membership)),
            InputColumn::Electric => f64::from(u8::from(record.electric)),
            InputColumn::Metric(metric) => record.metric(metric),
        }
    }
}

/// One output column: which input accumulator to finish, and how.
#[derive(Clone, Debug, PartialEq, Eq)]
struct OutputColumn {
    input: usize,
    func: AggFunc,
    name: FieldName,
}

/// Resolved output layout shared by every partial of one run.
#[derive(Clone, Debug, PartialEq, Eq)]
struct TemporalLayout {
    dt_field: DtField,
    freq: Freq,
    outputs: Vec<OutputColumn>,
}

impl TemporalLayout {
    fn new(params: &TemporalParams, unit: DistanceUnit) -> Result<Self, PipelineError> {
        let Some(first) = params.agg_funcs.first().copied() else {
            return Err(PipelineError::Configuration(
                "temporal summary needs at least one aggregation function".to_string(),
            ));
        };
        let names: Vec<FieldName> = INPUT_COLUMNS.iter().map(|col| col.name(unit)).collect();
        for (column, funcs) in &params.agg_map {
            if !names.contains(column) {
                return Err(PipelineError::Configuration(format!(
                    "agg_map column '{column}' is not one of {names:?}"
                )));
            }
            if funcs.is_empty() {
                return Err(PipelineError::Configuration(format!(
                    "agg_map column '{column}' has no aggregation functions"
                )));
            }
        }

        let mut outputs = Vec::new();
        for (input, (column, name)) in INPUT_COLUMNS.iter().zip(&names).enumerate() {
            let funcs: Vec<AggFunc> = match (params.agg_map.get(name), column) {
                (Some(funcs), _) => funcs.clone(),
                (None, InputColumn::Metric(_)) => params.agg_funcs.clone(),
                // Flags only take the first function.
                (None, _) => vec![first],
            };
            for func in funcs {
                outputs.push(OutputColumn {
                    input,
                    func,
                    name: format!("{name}_{func}"),
                });
            }
        }
        Ok(Self {
            dt_field: params.dt_field,
            freq: params.freq,
            outputs,
        })
    }
}

/// One file's temporal contribution: accumulator state per time bucket.
#[derive(Clone, Debug, PartialEq)]
pub struct TemporalPartial {
    layout: TemporalLayout,
    buckets: BTreeMap<NaiveDateTime, [Accumulator; 4]>,
}

impl TemporalPartial {
    /// Partial with no buckets, used as the reduce identity.
    pub fn empty(params: &TemporalParams, unit: DistanceUnit) -> Result<Self, PipelineError> {
        Ok(Self {
            layout: TemporalLayout::new(params, unit)?,
            buckets: BTreeMap::new(),
        })
    }

    /// Bucket `set` by the configured timestamp field.
    pub fn from_records(set: &RecordSet, params: &TemporalParams) -> Result<Self, PipelineError> {
        let mut partial = Self::empty(params, set.unit)?;
        for record in &set.records {
            let ts = match params.dt_field {
                DtField::StartDt => record.start_dt,
                DtField::EndDt => record.end_dt,
            };
            let cells = partial
                .buckets
                .entry(bucket_label(params.freq, ts))
                .or_default();
            for (acc, column) in cells.iter_mut().zip(INPUT_COLUMNS) {
                acc.push(column.value(record));
            }
        }
        Ok(partial)
    }

    /// Number of populated buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Fold `other` into `self` bucket by bucket.
    pub fn merge(&mut self, other: TemporalPartial) -> Result<(), PipelineError> {
        if self.layout != other.layout {
            return Err(PipelineError::Configuration(
                "cannot merge temporal partials built with different parameters".to_string(),
            ));
        }
        for (label, cells) in other.buckets {
            let target = self.buckets.entry(label).or_default();
            for (acc, incoming) in target.iter_mut().zip(cells.iter()) {
                acc.merge(incoming);
            }
        }
        Ok(())
    }

    /// Finish into a table sorted by bucket, zero-filling empty buckets.
    pub fn finish(&self) -> Table {
        let mut columns = vec![self.layout.dt_field.as_str().to_string()];
        columns.extend(self.layout.outputs.iter().map(|out| out.name.clone()));

        let mut rows = Vec::new();
        let (Some(first), Some(last)) = (
            self.buckets.keys().next().copied(),
            self.buckets.keys().next_back().copied(),
        ) else {
            return Table { columns, rows };
        };
        let empty = [Accumulator::default(); 4];
        let mut label = first;
        while label <= last {
            let cells = self.buckets.get(&label).unwrap_or(&empty);
            let mut row = Vec::with_capacity(columns.len());
            row.push(Cell::Timestamp(label));
            for out in &self.layout.outputs {
                row.push(Cell::Number(cells[out.input].finish(out.func)));
            }
            rows.push(row);
            label = next_bucket_label(self.layout.freq, label);
        }
        Table { columns, rows }
    }
}
