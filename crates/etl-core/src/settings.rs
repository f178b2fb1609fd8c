use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{EtlError, Result};

/// Default join key shared by the store and auxiliary tables.
pub const DEFAULT_JOIN_KEY: &str = "index";

/// Default exclusive lower bound on `Weekly_Sales`.
pub const DEFAULT_SALES_THRESHOLD: f64 = 10_000.0;

/// Default number of decimals kept in `Avg_Sales`.
pub const DEFAULT_ROUND_DECIMALS: u32 = 2;

const MAX_ROUND_DECIMALS: u32 = 10;

// ── PipelineConfig ─────────────────────────────────────────────────────────────

/// Business rules applied by the pipeline stages.
///
/// Deserialised from an optional JSON file; every field falls back to its
/// default when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Column used to join the store and auxiliary tables.
    pub join_key: String,
    /// Rows with `Weekly_Sales` at or below this value are dropped.
    pub sales_threshold: f64,
    /// Decimal places kept when rounding `Avg_Sales`.
    pub round_decimals: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            join_key: DEFAULT_JOIN_KEY.to_string(),
            sales_threshold: DEFAULT_SALES_THRESHOLD,
            round_decimals: DEFAULT_ROUND_DECIMALS,
        }
    }
}

impl PipelineConfig {
    /// Load a config from a JSON file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!("cannot read config {}: {}", path.display(), e))
        })?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no pipeline run could use.
    pub fn validate(&self) -> Result<()> {
        if self.join_key.trim().is_empty() {
            return Err(EtlError::Config("join_key must not be empty".to_string()));
        }
        if !self.sales_threshold.is_finite() {
            return Err(EtlError::Config(format!(
                "sales_threshold must be finite, got {}",
                self.sales_threshold
            )));
        }
        if self.round_decimals > MAX_ROUND_DECIMALS {
            return Err(EtlError::Config(format!(
                "round_decimals must be at most {}, got {}",
                MAX_ROUND_DECIMALS, self.round_decimals
            )));
        }
        Ok(())
    }
}

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Merge store sales with auxiliary metadata and write monthly aggregates
#[derive(Parser, Debug, Clone)]
#[command(
    name = "sales-etl",
    about = "Merge store sales with auxiliary metadata and write monthly aggregates",
    version
)]
pub struct Settings {
    /// Transactional store table (CSV or Parquet)
    #[arg(long)]
    pub store_data: PathBuf,

    /// Auxiliary metadata table (Parquet)
    #[arg(long)]
    pub extra_data: PathBuf,

    /// Destination of the cleaned table
    #[arg(long, default_value = "clean_data.csv")]
    pub full_output: PathBuf,

    /// Destination of the monthly aggregate table
    #[arg(long, default_value = "agg_data.csv")]
    pub agg_output: PathBuf,

    /// JSON pipeline config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Join key column
    #[arg(long, default_value = DEFAULT_JOIN_KEY)]
    pub join_key: String,

    /// Exclusive lower bound on Weekly_Sales
    #[arg(long, default_value_t = DEFAULT_SALES_THRESHOLD)]
    pub sales_threshold: f64,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

/// Fully resolved run parameters: CLI settings plus the effective config.
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    pub settings: Settings,
    pub pipeline: PipelineConfig,
}

impl Settings {
    /// Parse the process arguments and resolve the effective config.
    ///
    /// Usage errors, `--help` and `--version` print and exit the process the
    /// way clap normally does.
    pub fn load() -> Result<ResolvedSettings> {
        let args: Vec<std::ffi::OsString> = std::env::args_os().collect();
        if let Err(e) = Settings::try_parse_from(args.clone()) {
            e.exit();
        }
        Self::load_from_args(args)
    }

    /// Same as [`Settings::load`] but accepts an explicit argument list,
    /// enabling unit-testing without spawning subprocesses.
    ///
    /// Precedence: defaults, then the `--config` file, then flags given
    /// explicitly on the command line.
    pub fn load_from_args(args: Vec<std::ffi::OsString>) -> Result<ResolvedSettings> {
        // Build raw ArgMatches so we can query ValueSource.
        let matches = Settings::command()
            .try_get_matches_from(args.clone())
            .map_err(|e| EtlError::Config(e.to_string()))?;
        let mut settings =
            Settings::try_parse_from(args).map_err(|e| EtlError::Config(e.to_string()))?;

        let mut pipeline = match &settings.config {
            Some(path) => PipelineConfig::load_from(path)?,
            None => PipelineConfig::default(),
        };

        // NOTE: clap stores the arg id using the *field name* (underscores).
        if is_arg_explicitly_set(&matches, "join_key") || settings.config.is_none() {
            pipeline.join_key = settings.join_key.clone();
        }
        if is_arg_explicitly_set(&matches, "sales_threshold") || settings.config.is_none() {
            pipeline.sales_threshold = settings.sales_threshold;
        }
        pipeline.validate()?;

        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        Ok(ResolvedSettings { settings, pipeline })
    }
}

// ── Helper: check if an arg was explicitly set on the command line ─────────────

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(extra: &[&str]) -> Vec<std::ffi::OsString> {
        let mut v: Vec<std::ffi::OsString> = vec![
            "sales-etl".into(),
            "--store-data".into(),
            "store.csv".into(),
            "--extra-data".into(),
            "extra.parquet".into(),
        ];
        v.extend(extra.iter().map(|s| (*s).into()));
        v
    }

    fn write_config(tmp: &TempDir, json: &str) -> PathBuf {
        let path = tmp.path().join("pipeline.json");
        std::fs::write(&path, json).expect("write config");
        path
    }

    // ── PipelineConfig ────────────────────────────────────────────────────────

    #[test]
    fn test_pipeline_config_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.join_key, "index");
        assert_eq!(config.sales_threshold, 10_000.0);
        assert_eq!(config.round_decimals, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pipeline_config_partial_file_uses_defaults() {
        let tmp = TempDir::new().expect("tempdir");
        let path = write_config(&tmp, r#"{"sales_threshold": 5000}"#);

        let config = PipelineConfig::load_from(&path).expect("load");
        assert_eq!(config.join_key, "index");
        assert_eq!(config.sales_threshold, 5000.0);
        assert_eq!(config.round_decimals, 2);
    }

    #[test]
    fn test_pipeline_config_missing_file() {
        let tmp = TempDir::new().expect("tempdir");
        let err = PipelineConfig::load_from(&tmp.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));
    }

    #[test]
    fn test_pipeline_config_malformed_json() {
        let tmp = TempDir::new().expect("tempdir");
        let path = write_config(&tmp, "{not json");
        let err = PipelineConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, EtlError::JsonParse(_)));
    }

    #[test]
    fn test_pipeline_config_validation() {
        let mut config = PipelineConfig {
            join_key: " ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.join_key = "index".to_string();
        config.sales_threshold = f64::NAN;
        assert!(config.validate().is_err());

        config.sales_threshold = 1.0;
        config.round_decimals = 11;
        assert!(config.validate().is_err());
    }

    // ── Settings ──────────────────────────────────────────────────────────────

    #[test]
    fn test_settings_default_values() {
        let settings = Settings::parse_from(args(&[]));

        assert_eq!(settings.store_data, PathBuf::from("store.csv"));
        assert_eq!(settings.extra_data, PathBuf::from("extra.parquet"));
        assert_eq!(settings.full_output, PathBuf::from("clean_data.csv"));
        assert_eq!(settings.agg_output, PathBuf::from("agg_data.csv"));
        assert!(settings.config.is_none());
        assert_eq!(settings.join_key, "index");
        assert_eq!(settings.sales_threshold, 10_000.0);
        assert_eq!(settings.log_level, "INFO");
        assert!(settings.log_file.is_none());
        assert!(!settings.debug);
    }

    #[test]
    fn test_settings_requires_inputs() {
        let err = Settings::load_from_args(vec!["sales-etl".into()]).unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));
    }

    #[test]
    fn test_load_without_config_file_uses_flags() {
        let resolved =
            Settings::load_from_args(args(&["--join-key", "row_id", "--sales-threshold", "250"]))
                .expect("load");
        assert_eq!(resolved.pipeline.join_key, "row_id");
        assert_eq!(resolved.pipeline.sales_threshold, 250.0);
    }

    #[test]
    fn test_load_config_file_beats_defaults() {
        let tmp = TempDir::new().expect("tempdir");
        let path = write_config(&tmp, r#"{"join_key": "key", "sales_threshold": 1.5}"#);

        let resolved =
            Settings::load_from_args(args(&["--config", path.to_str().unwrap()])).expect("load");
        assert_eq!(resolved.pipeline.join_key, "key");
        assert_eq!(resolved.pipeline.sales_threshold, 1.5);
    }

    #[test]
    fn test_load_cli_beats_config_file() {
        let tmp = TempDir::new().expect("tempdir");
        let path = write_config(&tmp, r#"{"join_key": "key", "round_decimals": 3}"#);

        let resolved = Settings::load_from_args(args(&[
            "--config",
            path.to_str().unwrap(),
            "--join-key",
            "index",
        ]))
        .expect("load");
        assert_eq!(resolved.pipeline.join_key, "index");
        assert_eq!(resolved.pipeline.round_decimals, 3);
        assert_eq!(resolved.pipeline.sales_threshold, 10_000.0);
    }

    #[test]
    fn test_load_debug_overrides_log_level() {
        let resolved = Settings::load_from_args(args(&["--debug"])).expect("load");
        assert_eq!(resolved.settings.log_level, "DEBUG");
    }

    #[test]
    fn test_load_rejects_empty_join_key() {
        let err = Settings::load_from_args(args(&["--join-key", ""])).unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));
    }
}
