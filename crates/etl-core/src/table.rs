//! In-memory, column-oriented table used by every pipeline stage.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{EtlError, Result};

/// A single typed, non-missing cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Numeric view of the value; `None` for non-numeric variants.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Short lowercase name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Date(_) => "date",
            Value::Timestamp(_) => "timestamp",
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

/// A cell is either a value or missing.
pub type Cell = Option<Value>;

/// A named column of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }

    /// Build a column where every cell is present.
    pub fn from_values<V: Into<Value>>(name: impl Into<String>, values: Vec<V>) -> Self {
        Self::new(name, values.into_iter().map(|v| Some(v.into())).collect())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of missing cells.
    pub fn null_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_none()).count()
    }
}

/// An ordered set of equal-length, uniquely named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    num_rows: usize,
}

impl Table {
    /// Build a table, checking that column lengths agree and names are unique.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let num_rows = columns.first().map(Column::len).unwrap_or(0);
        for (i, col) in columns.iter().enumerate() {
            if col.len() != num_rows {
                return Err(EtlError::Schema(format!(
                    "column '{}' has {} rows, expected {}",
                    col.name,
                    col.len(),
                    num_rows
                )));
            }
            if columns[..i].iter().any(|c| c.name == col.name) {
                return Err(EtlError::Schema(format!(
                    "duplicate column name '{}'",
                    col.name
                )));
            }
        }
        Ok(Self { columns, num_rows })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up a column, failing with [`EtlError::MissingColumn`] when absent.
    ///
    /// `table` names the table in the error message.
    pub fn require_column(&self, table: &str, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| EtlError::missing_column(table, name))
    }

    /// Append a column; its length must match the table.
    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if !self.columns.is_empty() && column.len() != self.num_rows {
            return Err(EtlError::Schema(format!(
                "column '{}' has {} rows, expected {}",
                column.name,
                column.len(),
                self.num_rows
            )));
        }
        if self.column_index(&column.name).is_some() {
            return Err(EtlError::Schema(format!(
                "duplicate column name '{}'",
                column.name
            )));
        }
        self.num_rows = column.len();
        self.columns.push(column);
        Ok(())
    }

    /// Replace (or append) a column by name.
    pub fn set_column(&mut self, column: Column) -> Result<()> {
        match self.column_index(&column.name) {
            Some(idx) => {
                if column.len() != self.num_rows {
                    return Err(EtlError::Schema(format!(
                        "column '{}' has {} rows, expected {}",
                        column.name,
                        column.len(),
                        self.num_rows
                    )));
                }
                self.columns[idx] = column;
                Ok(())
            }
            None => self.push_column(column),
        }
    }

    /// Keep only `names`, in the given order.
    pub fn select(&self, table: &str, names: &[&str]) -> Result<Table> {
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            columns.push(self.require_column(table, name)?.clone());
        }
        Table::new(columns)
    }

    /// Keep rows whose entry in `mask` is `true`.
    pub fn filter_rows(&self, mask: &[bool]) -> Result<Table> {
        if mask.len() != self.num_rows {
            return Err(EtlError::Schema(format!(
                "filter mask has {} entries, table has {} rows",
                mask.len(),
                self.num_rows
            )));
        }
        let columns = self
            .columns
            .iter()
            .map(|col| {
                let cells = col
                    .cells
                    .iter()
                    .zip(mask)
                    .filter(|(_, keep)| **keep)
                    .map(|(cell, _)| cell.clone())
                    .collect();
                Column::new(col.name.clone(), cells)
            })
            .collect();
        Table::new(columns)
    }

    /// Gather rows by index; indices may repeat.
    pub fn take_rows(&self, indices: &[usize]) -> Table {
        let columns: Vec<Column> = self
            .columns
            .iter()
            .map(|col| {
                let cells = indices.iter().map(|&i| col.cells[i].clone()).collect();
                Column::new(col.name.clone(), cells)
            })
            .collect();
        Table {
            num_rows: indices.len(),
            columns,
        }
    }
}
