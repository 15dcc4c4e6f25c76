//! Forward-only view over one statement's rows.

use std::sync::Arc;

use crate::Value;

/// Materialized result of a single statement.
///
/// Rows are consumed by iterating the set itself (or [`ResultSet::rows`]);
/// once yielded a row cannot be read again. Execute the statement again for a
/// fresh set.
#[derive(Debug)]
pub struct ResultSet {
    columns: Arc<[String]>,
    types: Vec<String>,
    rows: std::vec::IntoIter<Vec<Value>>,
    rows_affected: u64,
    last_insert_id: Option<i64>,
}

impl ResultSet {
    pub(crate) fn new(
        columns: Vec<String>,
        types: Vec<String>,
        rows: Vec<Vec<Value>>,
        rows_affected: u64,
        last_insert_id: Option<i64>,
    ) -> Self {
        Self {
            columns: columns.into(),
            types,
            rows: rows.into_iter(),
            rows_affected,
            last_insert_id,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Declared column types as reported by the remote store.
    pub fn column_types(&self) -> &[String] {
        &self.types
    }

    /// `rows_affected` of the statement, 0 when not reported.
    pub fn row_count(&self) -> u64 {
        self.rows_affected
    }

    pub fn last_insert_id(&self) -> Option<i64> {
        self.last_insert_id
    }

    /// Rows not yet consumed.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&mut self) -> &mut Self {
        self
    }
}

impl Iterator for ResultSet {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.rows.next().map(|values| Row {
            columns: Arc::clone(&self.columns),
            values,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl ExactSizeIterator for ResultSet {}

/// A row with values aligned to the result columns.
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns a value by case-insensitive column name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let idx = self
            .columns
            .iter()
            .position(|col| col.eq_ignore_ascii_case(name))?;
        self.values.get(idx)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name)?.as_i64()
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name)?.as_f64()
    }

    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.get(name)?.as_str()
    }
}
