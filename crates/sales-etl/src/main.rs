mod bootstrap;

use anyhow::{Context, Result};
use etl_core::settings::{ResolvedSettings, Settings};
use etl_data::reader::read_table;
use etl_runtime::pipeline::{EtlPipeline, PipelinePaths, PipelineReport};

fn main() -> Result<()> {
    let resolved = Settings::load()?;
    let settings = &resolved.settings;

    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Sales ETL v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Join key: {}, sales threshold: {}",
        resolved.pipeline.join_key,
        resolved.pipeline.sales_threshold
    );

    // A returned error exits with status 1.
    let report = run(&resolved).inspect_err(|e| tracing::error!("Pipeline failed: {:#}", e))?;
    tracing::info!("Run report: {}", serde_json::to_string(&report)?);

    Ok(())
}

fn run(resolved: &ResolvedSettings) -> Result<PipelineReport> {
    let settings = &resolved.settings;

    let store_data = read_table(&settings.store_data).with_context(|| {
        format!(
            "failed to read store data from {}",
            settings.store_data.display()
        )
    })?;
    tracing::info!(
        "Store table {}: {} rows x {} columns",
        settings.store_data.display(),
        store_data.num_rows(),
        store_data.num_columns()
    );

    let paths = PipelinePaths {
        extra_data: settings.extra_data.clone(),
        full_output: settings.full_output.clone(),
        agg_output: settings.agg_output.clone(),
    };

    let report = EtlPipeline::new(resolved.pipeline.clone()).run(&store_data, &paths)?;
    Ok(report)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn resolve(dir: &TempDir, store: &str) -> ResolvedSettings {
        let path = |name: &str| dir.path().join(name).into_os_string();
        Settings::load_from_args(vec![
            "sales-etl".into(),
            "--store-data".into(),
            path(store),
            "--extra-data".into(),
            path("extra.parquet"),
            "--full-output".into(),
            path("clean_data.csv"),
            "--agg-output".into(),
            path("agg_data.csv"),
        ])
        .expect("settings")
    }

    #[test]
    fn test_run_propagates_store_read_error() {
        let tmp = TempDir::new().expect("tempdir");

        let err = run(&resolve(&tmp, "missing.csv")).unwrap_err();

        assert!(err.to_string().starts_with("failed to read store data from"));
        assert!(!tmp.path().join("clean_data.csv").exists());
    }

    #[test]
    fn test_run_propagates_stage_error() {
        let tmp = TempDir::new().expect("tempdir");
        std::fs::write(tmp.path().join("store.csv"), "index,Weekly_Sales\n0,12000.0\n")
            .expect("write store");

        let err = run(&resolve(&tmp, "store.csv")).unwrap_err();

        let stage_err = err
            .downcast_ref::<etl_runtime::pipeline::PipelineError>()
            .expect("pipeline error");
        assert_eq!(stage_err.stage, etl_runtime::pipeline::Stage::Extract);
    }
}
