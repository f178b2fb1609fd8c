//! Monthly aggregation of weekly sales.

use std::collections::BTreeMap;

use etl_core::columns::{AVG_SALES, MONTH, WEEKLY_SALES};
use etl_core::error::{EtlError, Result};
use etl_core::formatting::round_half_even;
use etl_core::settings::PipelineConfig;
use etl_core::table::{Column, Table, Value};
use tracing::{info, warn};

// ── SalesAccumulator ──────────────────────────────────────────────────────────

/// Running sum and count of the sales seen for one month.
///
/// The sum is Kahan-compensated, so long months average to the same value a
/// compensated groupby mean would give.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SalesAccumulator {
    pub sum: f64,
    pub count: u64,
    compensation: f64,
}

impl SalesAccumulator {
    /// Add a single sales figure to the running totals.
    pub fn add(&mut self, sales: f64) {
        let y = sales - self.compensation;
        let t = self.sum + y;
        self.compensation = (t - self.sum) - y;
        self.sum = t;
        self.count += 1;
    }

    /// Arithmetic mean, or `None` when nothing was added.
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

// ── Aggregation ───────────────────────────────────────────────────────────────

/// Average `Weekly_Sales` per `Month`, rounded to `config.round_decimals`.
///
/// Returns a `Month, Avg_Sales` table with one row per distinct month,
/// ascending. Rows with a missing month are not grouped; missing sales do not
/// count towards the mean.
pub fn avg_weekly_sales_per_month(clean_data: &Table, config: &PipelineConfig) -> Result<Table> {
    let groups = accumulate_by_month(clean_data)?;

    let mut months = Vec::with_capacity(groups.len());
    let mut averages = Vec::with_capacity(groups.len());
    for (month, acc) in &groups {
        months.push(Some(Value::Int(*month)));
        averages.push(
            acc.mean()
                .map(|m| Value::Float(round_half_even(m, config.round_decimals))),
        );
    }

    if groups.is_empty() {
        warn!("No rows to aggregate; monthly table is empty");
    }
    info!(
        "Aggregated {} rows into {} months",
        clean_data.num_rows(),
        groups.len()
    );

    Table::new(vec![
        Column::new(MONTH, months),
        Column::new(AVG_SALES, averages),
    ])
}

/// One pass over the table building `month -> (sum, count)`.
///
/// The map is ordered, so iterating it yields months ascending.
pub fn accumulate_by_month(clean_data: &Table) -> Result<BTreeMap<i64, SalesAccumulator>> {
    let months = clean_data.require_column("clean", MONTH)?;
    let sales = clean_data.require_column("clean", WEEKLY_SALES)?;

    let mut groups: BTreeMap<i64, SalesAccumulator> = BTreeMap::new();
    for (row, (month, sale)) in months.cells.iter().zip(&sales.cells).enumerate() {
        let Some(month) = month else { continue };
        let key = month_key(month).ok_or_else(|| {
            EtlError::Schema(format!(
                "column '{}' holds a non-integer {} value at row {}",
                MONTH,
                month.type_name(),
                row
            ))
        })?;
        let acc = groups.entry(key).or_default();
        if let Some(sale) = sale {
            let value = sale.as_f64().ok_or_else(|| {
                EtlError::Schema(format!(
                    "column '{}' holds a non-numeric {} value at row {}",
                    WEEKLY_SALES,
                    sale.type_name(),
                    row
                ))
            })?;
            acc.add(value);
        }
    }
    Ok(groups)
}

fn month_key(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
        _ => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
