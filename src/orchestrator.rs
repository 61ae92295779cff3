//! Fan-out/reduce orchestration over a bounded worker pool.
//!
//! Each input file becomes one task: normalize, then aggregate into a
//! `PartialAggregate`. Tasks share only read-only state and report back over a
//! channel as explicit `TaskOutcome`s; the calling thread alone performs the
//! unification reduce and decides, per `FailurePolicy`, whether a failed file
//! aborts the run or is skipped.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::aggregate::{self, PartialAggregate, ViewRequest};
use crate::config::{FailurePolicy, PipelineConfig};
use crate::constants::orchestrator::{PERSISTED_MSG, SKIP_FAILED_FILE_MSG};
use crate::data::Table;
use crate::errors::PipelineError;
use crate::normalizer::FileNormalizer;
use crate::schema::{AliasTable, Canonicalizer};
use crate::transport::fs::discover_trip_files;
use crate::transport::tabular::write_table;
use crate::types::ByteSize;
use crate::utils::simplify_bytes;

/// Successful result of one file task.
#[derive(Clone, Debug)]
pub struct FileContribution {
    /// The file's partial aggregate.
    pub partial: PartialAggregate,
    /// Records that survived normalization.
    pub records: usize,
    /// Rows dropped by the required-field filter.
    pub dropped: usize,
}

/// Result of one file task, success or failure.
#[derive(Debug)]
pub struct TaskOutcome {
    /// File the task processed.
    pub path: PathBuf,
    /// Contribution or the reason the file failed.
    pub result: Result<FileContribution, PipelineError>,
}

/// A file skipped under `FailurePolicy::SkipAndContinue`.
#[derive(Debug)]
pub struct TaskFailure {
    /// File that failed.
    pub path: PathBuf,
    /// Why it failed.
    pub error: PipelineError,
}

/// Summary of one pipeline run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Files dispatched to workers.
    pub files_total: usize,
    /// Files whose partial made it into the unified aggregate.
    pub files_succeeded: usize,
    /// Files skipped, in path order.
    pub failures: Vec<TaskFailure>,
    /// Records aggregated across all succeeded files.
    pub records: usize,
    /// Rows dropped across all succeeded files.
    pub dropped: usize,
    /// Worker threads used.
    pub workers: usize,
    /// Estimated in-memory size of the unified table.
    pub footprint_bytes: u64,
    /// `footprint_bytes` with binary prefixes.
    pub footprint: ByteSize,
}

/// The unified aggregate and its run report.
#[derive(Debug)]
pub struct RunOutcome {
    /// Unified aggregate table.
    pub table: Table,
    /// Run statistics and skipped files.
    pub report: RunReport,
}

/// Configured pipeline: discovery, normalization, and the reduce.
#[derive(Clone, Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    normalizer: FileNormalizer,
}

impl Pipeline {
    /// Build a pipeline with the built-in alias table.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        Ok(Self::with_alias_table(config, AliasTable::builtin()?))
    }

    /// Build a pipeline with a caller-supplied alias table.
    pub fn with_alias_table(config: PipelineConfig, aliases: AliasTable) -> Self {
        let canonicalizer = Arc::new(Canonicalizer::new(aliases));
        let normalizer = FileNormalizer::new(canonicalizer, config.unit);
        Self { config, normalizer }
    }

    /// Active configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Shared file normalizer.
    pub fn normalizer(&self) -> &FileNormalizer {
        &self.normalizer
    }

    /// Discover the configured input files.
    pub fn discover(&self) -> Vec<PathBuf> {
        discover_trip_files(&self.config.discovery)
    }

    /// Run `view` over every discovered file and persist the result to `output_path`.
    pub fn run(
        &self,
        view: &ViewRequest,
        output_path: impl AsRef<Path>,
        max_workers: Option<usize>,
    ) -> Result<RunOutcome, PipelineError> {
        let workers = resolve_workers(max_workers)?;
        view.validate(self.config.unit)?;
        let files = self.discover();
        let outcome = self.reduce_files(view, &files, workers)?;

        let output_path = output_path.as_ref();
        write_table(&outcome.table, output_path)?;
        info!(
            path = %output_path.display(),
            rows = outcome.table.rows.len(),
            footprint = %outcome.report.footprint,
            PERSISTED_MSG
        );
        Ok(outcome)
    }

    /// Run `view` over an explicit file list without persisting.
    pub fn run_files(
        &self,
        view: &ViewRequest,
        files: &[PathBuf],
        max_workers: Option<usize>,
    ) -> Result<RunOutcome, PipelineError> {
        let workers = resolve_workers(max_workers)?;
        view.validate(self.config.unit)?;
        self.reduce_files(view, files, workers)
    }

    /// Normalize and aggregate a single file.
    pub fn process_file(
        &self,
        path: &Path,
        view: &ViewRequest,
    ) -> Result<FileContribution, PipelineError> {
        let set = self.normalizer.normalize(path)?;
        let partial = aggregate::aggregate(&set, view)?;
        Ok(FileContribution {
            partial,
            records: set.len(),
            dropped: set.dropped,
        })
    }

    fn reduce_files(
        &self,
        view: &ViewRequest,
        files: &[PathBuf],
        workers: usize,
    ) -> Result<RunOutcome, PipelineError> {
        let started = Instant::now();
        info!(
            view = %view.name(),
            files = files.len(),
            workers,
            "starting aggregation run"
        );
        let mut outcomes = self.fan_out(view, files, workers)?;
        // Completion order varies between runs; reduce in path order.
        outcomes.sort_by(|a, b| a.path.cmp(&b.path));

        let mut report = RunReport {
            files_total: files.len(),
            workers,
            ..RunReport::default()
        };
        let mut unified = PartialAggregate::empty(view, self.config.unit)?;
        for outcome in outcomes {
            match outcome.result {
                Ok(contribution) => {
                    report.files_succeeded += 1;
                    report.records += contribution.records;
                    report.dropped += contribution.dropped;
                    unified.merge(contribution.partial)?;
                }
                Err(error) => match self.config.failure_policy {
                    FailurePolicy::Abort => return Err(error),
                    FailurePolicy::SkipAndContinue => {
                        warn!(
                            path = %outcome.path.display(),
                            error = %error,
                            SKIP_FAILED_FILE_MSG
                        );
                        report.failures.push(TaskFailure {
                            path: outcome.path,
                            error,
                        });
                    }
                },
            }
        }

        let table = unified.finish();
        report.footprint_bytes = table.estimated_size_bytes();
        report.footprint = simplify_bytes(report.footprint_bytes);
        info!(
            view = %view.name(),
            files_succeeded = report.files_succeeded,
            files_failed = report.failures.len(),
            records = report.records,
            dropped = report.dropped,
            rows = table.rows.len(),
            footprint = %report.footprint,
            elapsed_ms = started.elapsed().as_millis(),
            "aggregation run finished"
        );
        Ok(RunOutcome { table, report })
    }

    fn fan_out(
        &self,
        view: &ViewRequest,
        files: &[PathBuf],
        workers: usize,
    ) -> Result<Vec<TaskOutcome>, PipelineError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|idx| format!("ridership-worker-{idx}"))
            .build()
            .map_err(|err| PipelineError::WorkerPool(err.to_string()))?;

        let (sender, receiver) = mpsc::channel();
        pool.scope(|scope| {
            for path in files {
                let sender = sender.clone();
                scope.spawn(move |_| {
                    let start = Instant::now();
                    let result = self.process_file(path, view);
                    debug!(
                        path = %path.display(),
                        ok = result.is_ok(),
                        keys = result.as_ref().map_or(0, |c| c.partial.key_count()),
                        elapsed_ms = start.elapsed().as_millis(),
                        "file task completed"
                    );
                    // The receiver outlives the scope, so sending cannot fail.
                    let _ = sender.send(TaskOutcome {
                        path: path.clone(),
                        result,
                    });
                });
            }
        });
        drop(sender);
        Ok(receiver.into_iter().collect())
    }
}

/// Resolve the worker count against this machine's processor count.
pub fn resolve_workers(max_workers: Option<usize>) -> Result<usize, PipelineError> {
    check_worker_count(max_workers, num_cpus::get())
}

/// Validate a requested worker count against `available` processors.
///
/// `None` means one worker per processor.
pub fn check_worker_count(
    max_workers: Option<usize>,
    available: usize,
) -> Result<usize, PipelineError> {
    let available = available.max(1);
    match max_workers {
        None => Ok(available),
        Some(0) => Err(PipelineError::Configuration(
            "max_workers must be at least 1".to_string(),
        )),
        Some(requested) if requested > available => Err(PipelineError::Configuration(format!(
            "max_workers cannot be set past CPU count: requested {requested}, available {available}"
        ))),
        Some(requested) => Ok(requested),
    }
}
