//! Load stage: CSV serialisation of the clean and aggregate tables.

use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};

use etl_core::error::{EtlError, Result};
use etl_core::formatting::format_cell;
use etl_core::table::Table;
use tracing::info;

/// Write the clean table to `full_data_path` and the aggregate table to
/// `agg_data_path`, replacing any existing files.
pub fn load(
    full_data: &Table,
    full_data_path: &Path,
    agg_data: &Table,
    agg_data_path: &Path,
) -> Result<()> {
    write_csv(full_data, full_data_path)?;
    info!(
        "Wrote {} rows x {} columns to {}",
        full_data.num_rows(),
        full_data.num_columns(),
        full_data_path.display()
    );

    write_csv(agg_data, agg_data_path)?;
    info!(
        "Wrote {} rows x {} columns to {}",
        agg_data.num_rows(),
        agg_data.num_columns(),
        agg_data_path.display()
    );
    Ok(())
}

/// Write `table` as CSV with a header row and no index column.
///
/// The file is written next to `path` and renamed into place, so a failed
/// write never leaves a truncated destination behind.
pub fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let tmp = temp_path(path);
    if let Err(e) = write_csv_file(table, &tmp) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    std::fs::rename(&tmp, path).map_err(|source| {
        let _ = std::fs::remove_file(&tmp);
        EtlError::FileWrite {
            path: path.to_path_buf(),
            source,
        }
    })
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Sibling path `<name>.tmp` used while writing.
fn temp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_csv_file(table: &Table, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|source| EtlError::FileWrite {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(file);

    let csv_err = |source: csv::Error| EtlError::CsvWrite {
        path: path.to_path_buf(),
        source,
    };

    writer.write_record(table.column_names()).map_err(csv_err)?;
    for row in 0..table.num_rows() {
        let record = table
            .columns()
            .iter()
            .map(|column| format_cell(&column.cells[row]));
        writer.write_record(record).map_err(csv_err)?;
    }

    writer.flush().map_err(|source| EtlError::FileWrite {
        path: path.to_path_buf(),
        source,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
