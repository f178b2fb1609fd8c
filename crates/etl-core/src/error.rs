use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of an [`EtlError`], used when reporting which kind
/// of failure aborted a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An input file is missing, unreadable or corrupt.
    Read,
    /// An expected column is absent or has an unusable type.
    Schema,
    /// A value could not be parsed (e.g. an invalid date).
    Parse,
    /// An output file could not be written.
    Write,
    /// A configuration value is missing or invalid.
    Config,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Read => "ReadError",
            ErrorKind::Schema => "SchemaError",
            ErrorKind::Parse => "ParseError",
            ErrorKind::Write => "WriteError",
            ErrorKind::Config => "ConfigError",
        };
        f.write_str(name)
    }
}

/// All errors produced by the sales ETL pipeline.
#[derive(Error, Debug)]
pub enum EtlError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A Parquet file could not be decoded.
    #[error("Failed to read parquet file {path}: {source}")]
    ParquetRead {
        path: PathBuf,
        #[source]
        source: parquet::errors::ParquetError,
    },

    /// A record batch inside a Parquet file could not be decoded.
    #[error("Failed to decode record batch from {path}: {source}")]
    ArrowRead {
        path: PathBuf,
        #[source]
        source: arrow::error::ArrowError,
    },

    /// A CSV file could not be parsed.
    #[error("Failed to read CSV file {path}: {source}")]
    CsvRead {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A required column is not present in a table.
    #[error("Missing column '{column}' in {table} table")]
    MissingColumn { table: String, column: String },

    /// A table's shape or column types do not fit the operation.
    #[error("Schema error: {0}")]
    Schema(String),

    /// A date cell did not match any recognised date format.
    #[error("Invalid date '{value}' in column '{column}' at row {row}")]
    DateParse {
        column: String,
        row: usize,
        value: String,
    },

    /// A file could not be created or written.
    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A CSV record could not be serialised.
    #[error("Failed to write CSV file {path}: {source}")]
    CsvWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// An expected output file is absent after the load step.
    #[error("Output file not found: {0}")]
    OutputMissing(PathBuf),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl EtlError {
    /// Classify this error into one of the pipeline's error kinds.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EtlError::FileRead { .. }
            | EtlError::ParquetRead { .. }
            | EtlError::ArrowRead { .. }
            | EtlError::CsvRead { .. } => ErrorKind::Read,
            EtlError::MissingColumn { .. } | EtlError::Schema(_) => ErrorKind::Schema,
            EtlError::DateParse { .. } => ErrorKind::Parse,
            EtlError::FileWrite { .. }
            | EtlError::CsvWrite { .. }
            | EtlError::OutputMissing(_) => ErrorKind::Write,
            EtlError::Config(_) | EtlError::JsonParse(_) => ErrorKind::Config,
        }
    }

    /// Shorthand for a [`EtlError::MissingColumn`].
    pub fn missing_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        EtlError::MissingColumn {
            table: table.into(),
            column: column.into(),
        }
    }
}

/// Convenience alias used throughout the ETL crates.
pub type Result<T> = std::result::Result<T, EtlError>;
