//! Extract stage: load the auxiliary table and inner-join it to the store data.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use etl_core::error::{EtlError, Result};
use etl_core::settings::PipelineConfig;
use etl_core::table::{Column, Table, Value};
use tracing::{debug, info, warn};

use crate::reader::read_parquet_table;

/// Suffixes applied to non-key columns present on both sides of a join.
const LEFT_SUFFIX: &str = "_x";
const RIGHT_SUFFIX: &str = "_y";

/// Read the auxiliary Parquet table at `extra_data_path` and inner-join it to
/// `store_data` on `config.join_key`.
pub fn extract(
    store_data: &Table,
    extra_data_path: &Path,
    config: &PipelineConfig,
) -> Result<Table> {
    let extra = read_parquet_table(extra_data_path)?;
    debug!(
        "Auxiliary table {}: {} rows, columns {:?}",
        extra_data_path.display(),
        extra.num_rows(),
        extra.column_names()
    );

    let joined = inner_join(store_data, &extra, &config.join_key)?;
    info!(
        "Joined {} store rows with {} auxiliary rows on '{}': {} rows",
        store_data.num_rows(),
        extra.num_rows(),
        config.join_key,
        joined.num_rows()
    );
    if joined.num_rows() == 0 {
        warn!("Join on '{}' matched no rows", config.join_key);
    }
    Ok(joined)
}

/// Inner join of `left` and `right` on the column `key`.
///
/// Rows come out in left order; each left row is followed by its matches in
/// right order, so duplicate keys yield every pairing. Output columns are the
/// left columns, then the right columns minus the key. Non-key names present
/// on both sides get `_x` (left) and `_y` (right) suffixes.
///
/// Missing keys never match. Integer and integral float keys compare by
/// numeric value.
pub fn inner_join(left: &Table, right: &Table, key: &str) -> Result<Table> {
    let left_key = left.require_column("store", key)?;
    let right_key = right.require_column("auxiliary", key)?;
    check_key_kinds(left_key, right_key)?;

    // key -> right row indices, in right order
    let mut lookup: HashMap<JoinKey, Vec<usize>> = HashMap::new();
    for (row, cell) in right_key.cells.iter().enumerate() {
        if let Some(value) = cell {
            lookup.entry(JoinKey::from(value)).or_default().push(row);
        }
    }

    let mut left_rows = Vec::new();
    let mut right_rows = Vec::new();
    for (row, cell) in left_key.cells.iter().enumerate() {
        let Some(value) = cell else { continue };
        if let Some(matches) = lookup.get(&JoinKey::from(value)) {
            for &r in matches {
                left_rows.push(row);
                right_rows.push(r);
            }
        }
    }

    let left_names: HashSet<&str> = left.column_names().into_iter().collect();
    let right_names: HashSet<&str> = right.column_names().into_iter().collect();

    let left_part = left.take_rows(&left_rows);
    let right_part = right.take_rows(&right_rows);

    let mut columns: Vec<Column> = Vec::with_capacity(left.num_columns() + right.num_columns());
    for mut col in left_part.into_columns() {
        if col.name != key && right_names.contains(col.name.as_str()) {
            col.name = format!("{}{}", col.name, LEFT_SUFFIX);
        }
        columns.push(col);
    }
    for mut col in right_part.into_columns() {
        if col.name == key {
            continue;
        }
        if left_names.contains(col.name.as_str()) {
            col.name = format!("{}{}", col.name, RIGHT_SUFFIX);
        }
        columns.push(col);
    }

    Table::new(columns)
}

// ── Join keys ─────────────────────────────────────────────────────────────────

/// Hashable form of a key value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum JoinKey {
    Int(i64),
    Float(u64),
    Bool(bool),
    Str(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl From<&Value> for JoinKey {
    fn from(value: &Value) -> Self {
        match value {
            Value::Int(i) => JoinKey::Int(*i),
            Value::Float(f) => {
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 {
                    JoinKey::Int(*f as i64)
                } else {
                    JoinKey::Float(f.to_bits())
                }
            }
            Value::Bool(b) => JoinKey::Bool(*b),
            Value::Str(s) => JoinKey::Str(s.clone()),
            Value::Date(d) => JoinKey::Date(*d),
            Value::Timestamp(ts) => JoinKey::Timestamp(*ts),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum KeyKind {
    Numeric,
    Bool,
    Str,
    Date,
    Timestamp,
}

impl KeyKind {
    fn of(value: &Value) -> Self {
        match value {
            Value::Int(_) | Value::Float(_) => KeyKind::Numeric,
            Value::Bool(_) => KeyKind::Bool,
            Value::Str(_) => KeyKind::Str,
            Value::Date(_) => KeyKind::Date,
            Value::Timestamp(_) => KeyKind::Timestamp,
        }
    }
}

/// The single kind shared by every present cell, if any.
fn uniform_kind(column: &Column) -> Option<KeyKind> {
    let kinds: HashSet<KeyKind> = column.cells.iter().flatten().map(KeyKind::of).collect();
    if kinds.len() == 1 {
        kinds.into_iter().next()
    } else {
        None
    }
}

/// Reject joins between key columns of different uniform kinds.
fn check_key_kinds(left: &Column, right: &Column) -> Result<()> {
    if let (Some(l), Some(r)) = (uniform_kind(left), uniform_kind(right)) {
        if l != r {
            return Err(EtlError::Schema(format!(
                "cannot join on '{}': {:?} keys vs {:?} keys",
                left.name, l, r
            )));
        }
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
