use std::error::Error;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::{Args, Parser, Subcommand, error::ErrorKind};

use crate::aggregate::ViewRequest;
use crate::config::{
    AggFunc, DistanceUnit, DtField, FailurePolicy, Freq, PipelineConfig, StationMetric,
    StationParams, TemporalParams,
};
use crate::errors::PipelineError;
use crate::orchestrator::{Pipeline, RunOutcome};
use crate::types::FieldName;

#[derive(Debug, Parser)]
#[command(
    name = "ridership",
    disable_help_subcommand = true,
    about = "Aggregate bike-share trip files into ridership views",
    long_about = "Discover <root>/<year>/<month>/*.csv trip files, normalize every schema revision to one canonical layout, and reduce them in parallel into a single aggregate table.",
    after_help = "Flags override values loaded with --config. Set RUST_LOG to control log verbosity (logs go to stderr)."
)]
struct RidershipCli {
    #[command(subcommand)]
    command: ViewCommand,
}

#[derive(Debug, Subcommand)]
enum ViewCommand {
    /// Time-bucketed ridership summary.
    TemporalSummary {
        #[command(flatten)]
        run: RunArgs,
        #[command(flatten)]
        view: TemporalArgs,
    },
    /// Per-station load, start and end sides combined.
    ViewPerStation {
        #[command(flatten)]
        run: RunArgs,
        #[command(flatten)]
        view: StationArgs,
    },
}

#[derive(Debug, Args)]
struct RunArgs {
    #[arg(long, value_name = "DIR", help = "Root directory holding <year>/<month>/*.csv")]
    root: Option<PathBuf>,
    #[arg(long, value_name = "FILE", help = "Destination CSV for the unified aggregate")]
    output: PathBuf,
    #[arg(
        long = "max-workers",
        value_name = "N",
        help = "Worker threads, between 1 and the processor count"
    )]
    max_workers: Option<usize>,
    #[arg(
        long,
        value_name = "mi|km",
        value_parser = parse_arg::<DistanceUnit>,
        help = "Unit of the derived distance column"
    )]
    unit: Option<DistanceUnit>,
    #[arg(
        long = "year",
        value_name = "YYYY",
        help = "Year to scan, repeat as needed (defaults to every known year)"
    )]
    years: Vec<i32>,
    #[arg(long, help = "Abort the whole run when any file fails")]
    strict: bool,
    #[arg(long, value_name = "FILE.json", help = "JSON pipeline configuration")]
    config: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct TemporalArgs {
    #[arg(
        long = "dt-field",
        value_name = "start_dt|end_dt",
        value_parser = parse_arg::<DtField>,
        help = "Timestamp column used for bucketing"
    )]
    dt_field: Option<DtField>,
    #[arg(
        long,
        value_name = "FREQ",
        value_parser = parse_arg::<Freq>,
        help = "Bucket width: min, h, D, ME or YE"
    )]
    freq: Option<Freq>,
    #[arg(
        long = "agg-func",
        value_name = "FUNC",
        value_parser = parse_arg::<AggFunc>,
        help = "Aggregation applied to every column, repeat as needed"
    )]
    agg_funcs: Vec<AggFunc>,
    #[arg(
        long = "agg-map",
        value_name = "COLUMN=FUNC[,FUNC]",
        value_parser = parse_agg_map_arg,
        help = "Per-column aggregation override, repeat as needed"
    )]
    agg_map: Vec<(FieldName, Vec<AggFunc>)>,
}

#[derive(Debug, Args)]
struct StationArgs {
    #[arg(
        long,
        value_name = "distance|duration|dist_<unit>|duration_sec",
        help = "Metric combined per station; a dist_<unit> column must match --unit"
    )]
    metric: Option<String>,
    #[arg(
        long = "agg-func",
        value_name = "FUNC",
        value_parser = parse_arg::<AggFunc>,
        help = "Aggregation applied per station side"
    )]
    agg_func: Option<AggFunc>,
}

/// A fully resolved CLI invocation.
#[derive(Debug)]
struct Invocation {
    config: PipelineConfig,
    view: ViewRequest,
    output: PathBuf,
    max_workers: Option<usize>,
}

/// Run the `ridership` command line with `args_iter` (program name excluded).
pub fn run<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let Some(cli) =
        parse_cli::<RidershipCli, _>(std::iter::once("ridership".to_string()).chain(args_iter))?
    else {
        return Ok(());
    };

    let invocation = resolve(cli)?;
    let pipeline = Pipeline::new(invocation.config)?;
    let outcome = pipeline.run(
        &invocation.view,
        &invocation.output,
        invocation.max_workers,
    )?;
    print_summary(&invocation.view, &invocation.output, &outcome);
    Ok(())
}

fn resolve(cli: RidershipCli) -> Result<Invocation, PipelineError> {
    let (run, view) = match cli.command {
        ViewCommand::TemporalSummary { run, view } => (run, ViewArgs::Temporal(view)),
        ViewCommand::ViewPerStation { run, view } => (run, ViewArgs::Station(view)),
    };

    let mut config = match &run.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(root) = run.root {
        config.discovery.root = root;
    }
    if !run.years.is_empty() {
        config = config.with_years(run.years);
    }
    if let Some(unit) = run.unit {
        config = config.with_unit(unit);
    }
    if run.strict {
        config = config.with_failure_policy(FailurePolicy::Abort);
    }
    let view = match view {
        ViewArgs::Temporal(args) => ViewRequest::Temporal(args.into_params()),
        ViewArgs::Station(args) => ViewRequest::Station(args.into_params(config.unit)?),
    };
    Ok(Invocation {
        config,
        view,
        output: run.output,
        max_workers: run.max_workers,
    })
}

enum ViewArgs {
    Temporal(TemporalArgs),
    Station(StationArgs),
}

impl TemporalArgs {
    fn into_params(self) -> TemporalParams {
        let mut params = TemporalParams::default();
        if let Some(dt_field) = self.dt_field {
            params = params.with_dt_field(dt_field);
        }
        if let Some(freq) = self.freq {
            params = params.with_freq(freq);
        }
        if !self.agg_funcs.is_empty() {
            params = params.with_agg_funcs(self.agg_funcs);
        }
        for (column, funcs) in self.agg_map {
            params = params.with_column_funcs(column, funcs);
        }
        params
    }
}

impl StationArgs {
    fn into_params(self, unit: DistanceUnit) -> Result<StationParams, PipelineError> {
        let defaults = StationParams::default();
        let metric = match self.metric {
            Some(raw) => StationMetric::from_column(&raw, unit)?,
            None => defaults.metric,
        };
        Ok(StationParams {
            metric,
            agg_func: self.agg_func.unwrap_or(defaults.agg_func),
        })
    }
}

fn print_summary(view: &ViewRequest, output: &Path, outcome: &RunOutcome) {
    let report = &outcome.report;
    println!(
        "{}: {} rows written to {}",
        view.name(),
        outcome.table.rows.len(),
        output.display()
    );
    println!(
        "files: {} of {} aggregated with {} workers",
        report.files_succeeded, report.files_total, report.workers
    );
    println!(
        "records: {} kept, {} dropped",
        report.records, report.dropped
    );
    println!("footprint: {}", report.footprint);
    for failure in &report.failures {
        println!("skipped {}: {}", failure.path.display(), failure.error);
    }
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}

fn parse_arg<T>(raw: &str) -> Result<T, String>
where
    T: FromStr<Err = PipelineError>,
{
    raw.parse::<T>().map_err(|err| err.to_string())
}

fn parse_agg_map_arg(raw: &str) -> Result<(FieldName, Vec<AggFunc>), String> {
    let Some((column, funcs)) = raw.split_once('=') else {
        return Err(format!("--agg-map expects COLUMN=FUNC[,FUNC], got '{raw}'"));
    };
    let column = column.trim();
    if column.is_empty() {
        return Err("--agg-map column name must not be empty".to_string());
    }
    let funcs = funcs
        .split(',')
        .map(parse_arg::<AggFunc>)
        .collect::<Result<Vec<_>, _>>()?;
    Ok((column.to_string(), funcs))
}
