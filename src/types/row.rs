use std::sync::Arc;

use super::{ColumnDescriptor, SqlValue};

/// A single decoded row.
/// Values are held in column order; names are shared with the statement that produced
/// the row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    names: Arc<[String]>,
    values: Vec<SqlValue>,
}

impl Row {
    pub(crate) fn new(names: Arc<[String]>, values: Vec<SqlValue>) -> Self {
        Self { names, values }
    }

    /// Gets a value by 1-based column position.
    pub fn get(&self, index: usize) -> Option<&SqlValue> {
        index.checked_sub(1).and_then(|i| self.values.get(i))
    }

    /// Gets a value by column name (case-insensitive, first match wins).
    pub fn get_named(&self, name: &str) -> Option<&SqlValue> {
        self.names
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))
            .and_then(|i| self.values.get(i))
    }

    /// Returns all column names in this row.
    pub fn columns(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }

    /// Returns the number of columns in this row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if this row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Outcome of one fetch call.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    Row(Row),
    EndOfData,
}

impl Fetched {
    pub fn into_row(self) -> Option<Row> {
        match self {
            Fetched::Row(row) => Some(row),
            Fetched::EndOfData => None,
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Fetched::EndOfData)
    }
}

/// Every remaining row of an executed query, drained in one go.
#[derive(Debug)]
pub struct QueryResult {
    columns: Vec<ColumnDescriptor>,
    rows: Vec<Row>,
}

impl QueryResult {
    pub(crate) fn new(columns: Vec<ColumnDescriptor>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Returns all rows from the result.
    pub fn rows(self) -> Vec<Row> {
        self.rows
    }

    /// Returns a reference to the rows without consuming the result.
    pub fn rows_ref(&self) -> &[Row] {
        &self.rows
    }

    /// Returns the column metadata from this result.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Returns the number of rows in this result.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if this result contains no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl IntoIterator for QueryResult {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}
