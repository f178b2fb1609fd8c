//! Linear pipeline runner.
//!
//! Runs Extract → Transform → Aggregate → Load → Validate once over a store
//! table, timing each stage and tagging any failure with the stage that
//! raised it. Nothing is retried; the first error ends the run.

use std::path::PathBuf;
use std::time::Instant;

use etl_core::error::{EtlError, ErrorKind};
use etl_core::settings::PipelineConfig;
use etl_core::table::Table;
use etl_data::aggregator::avg_weekly_sales_per_month;
use etl_data::extract::extract;
use etl_data::loader::load;
use etl_data::transform::transform;
use etl_data::validation::validation;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};

// ── Public types ──────────────────────────────────────────────────────────────

/// The five pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Extract,
    Transform,
    Aggregate,
    Load,
    Validate,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Extract => "extract",
            Stage::Transform => "transform",
            Stage::Aggregate => "aggregate",
            Stage::Load => "load",
            Stage::Validate => "validate",
        };
        f.write_str(name)
    }
}

/// A stage failure. Stages after `stage` did not run; output files from an
/// earlier run of Load must not be trusted.
#[derive(Error, Debug)]
#[error("{stage} stage failed ({kind}): {source}", kind = source.kind())]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: EtlError,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

/// Input and output locations for one run.
#[derive(Debug, Clone)]
pub struct PipelinePaths {
    /// Auxiliary Parquet table joined onto the store data.
    pub extra_data: PathBuf,
    /// Destination of the clean table.
    pub full_output: PathBuf,
    /// Destination of the monthly aggregate table.
    pub agg_output: PathBuf,
}

/// Wall-clock time spent in one stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageTiming {
    pub stage: Stage,
    pub seconds: f64,
}

/// Summary of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// Rows produced by the join.
    pub joined_rows: usize,
    /// Rows surviving the transform.
    pub clean_rows: usize,
    /// Distinct months in the aggregate.
    pub months: usize,
    /// Per-stage timings, in execution order.
    pub stage_timings: Vec<StageTiming>,
    pub full_output_exists: bool,
    pub agg_output_exists: bool,
}

// ── EtlPipeline ───────────────────────────────────────────────────────────────

/// Single-pass runner over the pipeline stages.
///
/// # Example
/// ```no_run
/// use std::path::PathBuf;
/// use etl_core::settings::PipelineConfig;
/// use etl_data::reader::read_table;
/// use etl_runtime::pipeline::{EtlPipeline, PipelinePaths};
///
/// let store = read_table(std::path::Path::new("store.csv")).unwrap();
/// let paths = PipelinePaths {
///     extra_data: PathBuf::from("extra.parquet"),
///     full_output: PathBuf::from("clean_data.csv"),
///     agg_output: PathBuf::from("agg_data.csv"),
/// };
/// let report = EtlPipeline::new(PipelineConfig::default())
///     .run(&store, &paths)
///     .unwrap();
/// println!("{} clean rows", report.clean_rows);
/// ```
pub struct EtlPipeline {
    config: PipelineConfig,
}

impl EtlPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage once over `store_data`.
    pub fn run(
        &self,
        store_data: &Table,
        paths: &PipelinePaths,
    ) -> Result<PipelineReport, PipelineError> {
        let mut timings = Vec::with_capacity(5);

        // ── Step 1: Extract ───────────────────────────────────────────────────
        let joined = timed(Stage::Extract, &mut timings, || {
            extract(store_data, &paths.extra_data, &self.config)
        })?;

        // ── Step 2: Transform ─────────────────────────────────────────────────
        let clean = timed(Stage::Transform, &mut timings, || {
            transform(&joined, &self.config)
        })?;

        // ── Step 3: Aggregate ─────────────────────────────────────────────────
        let agg = timed(Stage::Aggregate, &mut timings, || {
            avg_weekly_sales_per_month(&clean, &self.config)
        })?;

        // ── Step 4: Load ──────────────────────────────────────────────────────
        timed(Stage::Load, &mut timings, || {
            load(&clean, &paths.full_output, &agg, &paths.agg_output)
        })?;

        // ── Step 5: Validate ──────────────────────────────────────────────────
        let (full_output_exists, agg_output_exists) =
            timed(Stage::Validate, &mut timings, || check_outputs(paths))?;

        let report = PipelineReport {
            joined_rows: joined.num_rows(),
            clean_rows: clean.num_rows(),
            months: agg.num_rows(),
            stage_timings: timings,
            full_output_exists,
            agg_output_exists,
        };
        info!(
            "Pipeline finished: {} joined rows, {} clean rows, {} months",
            report.joined_rows, report.clean_rows, report.months
        );
        Ok(report)
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Run `f` as `stage`, recording its duration and tagging any error.
fn timed<T>(
    stage: Stage,
    timings: &mut Vec<StageTiming>,
    f: impl FnOnce() -> etl_core::Result<T>,
) -> Result<T, PipelineError> {
    let start = Instant::now();
    info!("Starting {} stage", stage);
    let result = f();
    timings.push(StageTiming {
        stage,
        seconds: start.elapsed().as_secs_f64(),
    });
    result.map_err(|source| {
        error!("{} stage failed: {}", stage, source);
        PipelineError { stage, source }
    })
}

/// Run the validator over both outputs, failing on the first missing one.
fn check_outputs(paths: &PipelinePaths) -> etl_core::Result<(bool, bool)> {
    let full = validation(&paths.full_output);
    let agg = validation(&paths.agg_output);
    debug!("Output check: full={}, agg={}", full, agg);
    if !full {
        return Err(EtlError::OutputMissing(paths.full_output.clone()));
    }
    if !agg {
        return Err(EtlError::OutputMissing(paths.agg_output.clone()));
    }
    Ok((full, agg))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
