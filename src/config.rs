use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::fields;
use crate::constants::transport::{FIRST_YEAR, LAST_YEAR};
use crate::errors::PipelineError;
use crate::types::FieldName;

/// Unit used for derived great-circle distances.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    /// Kilometres.
    Km,
    /// Miles.
    #[default]
    Mi,
}

impl DistanceUnit {
    /// Short unit label (`km`, `mi`).
    pub fn as_str(self) -> &'static str {
        match self {
            DistanceUnit::Km => "km",
            DistanceUnit::Mi => "mi",
        }
    }

    /// Name of the derived distance column for this unit.
    pub fn column_name(self) -> FieldName {
        format!("{}{}", fields::DIST_PREFIX, self.as_str())
    }
}

impl FromStr for DistanceUnit {
    type Err = PipelineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "km" => Ok(DistanceUnit::Km),
            "mi" => Ok(DistanceUnit::Mi),
            other => Err(PipelineError::Configuration(format!(
                "unsupported distance unit '{other}': expected 'km' or 'mi'"
            ))),
        }
    }
}

/// Timestamp field used to bucket the temporal summary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DtField {
    /// Bucket by trip start.
    #[default]
    StartDt,
    /// Bucket by trip end.
    EndDt,
}

impl DtField {
    /// Canonical column name.
    pub fn as_str(self) -> &'static str {
        match self {
            DtField::StartDt => fields::START_DT,
            DtField::EndDt => fields::END_DT,
        }
    }
}

impl FromStr for DtField {
    type Err = PipelineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            fields::START_DT => Ok(DtField::StartDt),
            fields::END_DT => Ok(DtField::EndDt),
            other => Err(PipelineError::Configuration(format!(
                "unsupported dt_field '{other}': expected 'start_dt' or 'end_dt'"
            ))),
        }
    }
}

/// Bucket width for the temporal summary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Freq {
    /// One-minute buckets labelled by their start.
    Minute,
    /// One-hour buckets labelled by their start.
    Hour,
    /// Calendar-day buckets labelled by midnight.
    #[default]
    Day,
    /// Calendar-month buckets labelled by the last day of the month.
    MonthEnd,
    /// Calendar-year buckets labelled by December 31.
    YearEnd,
}

impl Freq {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Freq::Minute => "minute",
            Freq::Hour => "hour",
            Freq::Day => "day",
            Freq::MonthEnd => "month_end",
            Freq::YearEnd => "year_end",
        }
    }
}

impl FromStr for Freq {
    type Err = PipelineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        // Pandas offset aliases are case-sensitive (`M` month-end vs `min`).
        match raw.trim() {
            "minute" | "min" | "T" => Ok(Freq::Minute),
            "hour" | "h" | "H" => Ok(Freq::Hour),
            "day" | "D" => Ok(Freq::Day),
            "month_end" | "ME" | "M" => Ok(Freq::MonthEnd),
            "year_end" | "YE" | "Y" | "A" => Ok(Freq::YearEnd),
            other => Err(PipelineError::Configuration(format!(
                "unsupported freq '{other}': expected minute, hour, day, month_end or year_end"
            ))),
        }
    }
}

/// Reduction applied to a column within one group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggFunc {
    /// Sum of values.
    Sum,
    /// Arithmetic mean of values.
    Mean,
    /// Number of values.
    Count,
    /// Smallest value.
    Min,
    /// Largest value.
    Max,
}

impl AggFunc {
    /// Name used as the output column suffix.
    pub fn as_str(self) -> &'static str {
        match self {
            AggFunc::Sum => "sum",
            AggFunc::Mean => "mean",
            AggFunc::Count => "count",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
        }
    }
}

impl fmt::Display for AggFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggFunc {
    type Err = PipelineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(AggFunc::Sum),
            "mean" | "avg" => Ok(AggFunc::Mean),
            "count" => Ok(AggFunc::Count),
            "min" => Ok(AggFunc::Min),
            "max" => Ok(AggFunc::Max),
            other => Err(PipelineError::Configuration(format!(
                "unsupported aggregation function '{other}'"
            ))),
        }
    }
}

/// Parameters of the temporal summary view.
#[derive(Clone, Debug, PartialEq)]
pub struct TemporalParams {
    /// Timestamp column used for bucketing.
    pub dt_field: DtField,
    /// Bucket width.
    pub freq: Freq,
    /// Functions applied to metric columns; flags only get the first one.
    pub agg_funcs: Vec<AggFunc>,
    /// Per-column overrides of the function list.
    pub agg_map: BTreeMap<FieldName, Vec<AggFunc>>,
}

impl Default for TemporalParams {
    fn default() -> Self {
        Self {
            dt_field: DtField::StartDt,
            freq: Freq::Day,
            agg_funcs: vec![AggFunc::Sum, AggFunc::Mean],
            agg_map: BTreeMap::new(),
        }
    }
}

impl TemporalParams {
    /// Override the bucketing column.
    pub fn with_dt_field(mut self, dt_field: DtField) -> Self {
        self.dt_field = dt_field;
        self
    }

    /// Override the bucket width.
    pub fn with_freq(mut self, freq: Freq) -> Self {
        self.freq = freq;
        self
    }

    /// Override the default function list.
    pub fn with_agg_funcs(mut self, agg_funcs: Vec<AggFunc>) -> Self {
        self.agg_funcs = agg_funcs;
        self
    }

    /// Override the function list of a single input column.
    pub fn with_column_funcs(mut self, column: impl Into<FieldName>, funcs: Vec<AggFunc>) -> Self {
        self.agg_map.insert(column.into(), funcs);
        self
    }
}

/// Metric column selected for the per-station view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StationMetric {
    /// The `dist_<unit>` column.
    #[default]
    Distance,
    /// The `duration_sec` column.
    Duration,
}

impl StationMetric {
    /// Name of the selected column under `unit`.
    pub fn column_name(self, unit: DistanceUnit) -> FieldName {
        match self {
            StationMetric::Distance => unit.column_name(),
            StationMetric::Duration => fields::DURATION_SEC.to_string(),
        }
    }

    /// Resolve a metric name or a derived column name available under `unit`.
    ///
    /// `dist_<unit>` only resolves when it names the distance column actually
    /// derived for `unit`.
    pub fn from_column(raw: &str, unit: DistanceUnit) -> Result<Self, PipelineError> {
        let trimmed = raw.trim();
        let Some(suffix) = trimmed.strip_prefix(fields::DIST_PREFIX) else {
            return trimmed.parse();
        };
        let requested: DistanceUnit = suffix.parse()?;
        if requested != unit {
            return Err(PipelineError::Configuration(format!(
                "station metric '{trimmed}' is not available: distances are derived as '{}'",
                unit.column_name()
            )));
        }
        Ok(StationMetric::Distance)
    }
}

impl FromStr for StationMetric {
    type Err = PipelineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "distance" => Ok(StationMetric::Distance),
            "duration" | fields::DURATION_SEC => Ok(StationMetric::Duration),
            other => Err(PipelineError::Configuration(format!(
                "unsupported station metric '{other}': expected distance or duration"
            ))),
        }
    }
}

/// Parameters of the per-station view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StationParams {
    /// Metric aggregated per station.
    pub metric: StationMetric,
    /// Reduction applied on each side (start and end).
    pub agg_func: AggFunc,
}

impl Default for StationParams {
    fn default() -> Self {
        Self {
            metric: StationMetric::Distance,
            agg_func: AggFunc::Sum,
        }
    }
}

/// What the orchestrator does when a single file fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log and report the failure, aggregate the remaining files.
    #[default]
    SkipAndContinue,
    /// Return the first failure and discard all partial results.
    Abort,
}

/// Location and extent of the input file tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Root directory holding `<year>/<month>/*.csv`.
    pub root: PathBuf,
    /// Years scanned, in order.
    pub years: Vec<i32>,
    /// Whether symlinks are followed while walking.
    pub follow_links: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            years: (FIRST_YEAR..=LAST_YEAR).collect(),
            follow_links: false,
        }
    }
}

/// Top-level pipeline configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Input file discovery.
    #[serde(flatten)]
    pub discovery: DiscoveryConfig,
    /// Unit of the derived distance column.
    pub unit: DistanceUnit,
    /// Per-file failure handling.
    pub failure_policy: FailurePolicy,
}

impl PipelineConfig {
    /// Create a config rooted at `root` with default years and policy.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            discovery: DiscoveryConfig {
                root: root.into(),
                ..DiscoveryConfig::default()
            },
            ..Self::default()
        }
    }

    /// Load a JSON config file.
    pub fn from_json_file(path: &Path) -> Result<Self, PipelineError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Override the scanned years.
    pub fn with_years(mut self, years: impl IntoIterator<Item = i32>) -> Self {
        self.discovery.years = years.into_iter().collect();
        self
    }

    /// Override the distance unit.
    pub fn with_unit(mut self, unit: DistanceUnit) -> Self {
        self.unit = unit;
        self
    }

    /// Override the failure policy.
    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }
}
