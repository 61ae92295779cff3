#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Aggregate views and the unification reduce.
pub mod aggregate;
/// The `ridership` command line.
pub mod cli;
/// Pipeline, discovery, and view parameter types.
pub mod config;
/// Centralized constants used across schema, metrics, and transport.
pub mod constants;
/// Raw tables, canonical records, and output tables.
pub mod data;
/// Timestamp parsing and time-bucket helpers.
pub mod date_helpers;
/// Derived trip metrics.
pub mod metrics;
/// Per-file normalization into canonical records.
pub mod normalizer;
/// Parallel fan-out/reduce over trip files.
pub mod orchestrator;
/// Alias table and column canonicalization.
pub mod schema;
/// Input discovery and tabular IO (filesystem CSV today).
pub mod transport;
/// Shared type aliases.
pub mod types;
/// Column-name normalization and size formatting helpers.
pub mod utils;

mod errors;

pub use aggregate::{
    PartialAggregate, ViewName, ViewRequest, aggregate, aggregate_record_set, unify,
};
pub use config::{
    AggFunc, DiscoveryConfig, DistanceUnit, DtField, FailurePolicy, Freq, PipelineConfig,
    StationMetric, StationParams, TemporalParams,
};
pub use data::{Cell, RawTable, RecordSet, Table, TripRecord};
pub use errors::PipelineError;
pub use normalizer::FileNormalizer;
pub use orchestrator::{Pipeline, RunOutcome, RunReport, TaskFailure};
pub use schema::{AliasTable, Canonicalizer};
pub use types::{ByteSize, FieldName, RawCell, RawColumnName, StationId};
