//! Transform stage: forward-fill, month derivation, sales filter, projection.

use etl_core::columns::{CLEAN_COLUMNS, DATE, MONTH, WEEKLY_SALES};
use etl_core::error::{EtlError, Result};
use etl_core::formatting::format_cell;
use etl_core::settings::PipelineConfig;
use etl_core::table::{Cell, Column, Table, Value};
use etl_core::time_utils::month_of;
use tracing::{debug, info};

/// Clean the joined table.
///
/// 1. Forward-fill every column.
/// 2. Derive `Month` from `Date`.
/// 3. Keep rows with `Weekly_Sales > config.sales_threshold`.
/// 4. Project to the clean columns, in order.
///
/// Steps run in this order; the forward-fill depends on the incoming row
/// order.
pub fn transform(raw_data: &Table, config: &PipelineConfig) -> Result<Table> {
    let filled = forward_fill(raw_data)?;
    let with_month = derive_month(filled)?;
    let mask = sales_mask(&with_month, config.sales_threshold)?;
    let filtered = with_month.filter_rows(&mask)?;
    let clean = filtered.select("joined", &CLEAN_COLUMNS)?;

    info!(
        "Transform kept {} of {} rows (Weekly_Sales > {})",
        clean.num_rows(),
        raw_data.num_rows(),
        config.sales_threshold
    );
    Ok(clean)
}

/// Replace each missing cell with the last present cell above it in the same
/// column. Leading missing cells stay missing.
pub fn forward_fill(table: &Table) -> Result<Table> {
    let mut columns = table.clone().into_columns();
    let mut filled_total = 0usize;
    for column in &mut columns {
        filled_total += forward_fill_cells(&mut column.cells);
    }
    debug!("Forward fill replaced {} missing cells", filled_total);
    Table::new(columns)
}

/// Forward-fill `cells` in place, returning how many cells were filled.
fn forward_fill_cells(cells: &mut [Cell]) -> usize {
    let mut last: Option<Value> = None;
    let mut filled = 0;
    for cell in cells.iter_mut() {
        match cell {
            Some(value) => last = Some(value.clone()),
            None => {
                if let Some(value) = &last {
                    *cell = Some(value.clone());
                    filled += 1;
                }
            }
        }
    }
    filled
}

/// Append (or replace) the integer `Month` column derived from `Date`.
///
/// Missing dates give a missing month; unparseable dates are an error.
pub fn derive_month(mut table: Table) -> Result<Table> {
    let dates = table.require_column("joined", DATE)?;

    let mut months: Vec<Cell> = Vec::with_capacity(dates.len());
    for (row, cell) in dates.cells.iter().enumerate() {
        let month = match cell {
            None => None,
            Some(value) => {
                let m = month_of(value).ok_or_else(|| EtlError::DateParse {
                    column: DATE.to_string(),
                    row,
                    value: format_cell(cell),
                })?;
                Some(Value::Int(i64::from(m)))
            }
        };
        months.push(month);
    }

    table.set_column(Column::new(MONTH, months))?;
    Ok(table)
}

/// Row mask for `Weekly_Sales > threshold`; missing sales fail the test.
fn sales_mask(table: &Table, threshold: f64) -> Result<Vec<bool>> {
    let sales = table.require_column("joined", WEEKLY_SALES)?;
    sales
        .cells
        .iter()
        .enumerate()
        .map(|(row, cell)| match cell {
            None => Ok(false),
            Some(value) => value.as_f64().map(|v| v > threshold).ok_or_else(|| {
                EtlError::Schema(format!(
                    "column '{}' holds a non-numeric {} value at row {}",
                    WEEKLY_SALES,
                    value.type_name(),
                    row
                ))
            }),
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
