use std::collections::HashMap;
use std::sync::Arc;

use super::row::NormalizedRow;
use crate::types::{KeyCase, RowValues};

/// Column names and their lookup index, shared by every row of one result.
#[derive(Debug, Clone)]
pub(crate) struct ColumnLayout {
    pub(crate) names: Arc<Vec<String>>,
    pub(crate) index: Arc<HashMap<String, usize>>,
}

impl ColumnLayout {
    pub(crate) fn new(native_names: Vec<String>, key_case: KeyCase) -> Self {
        let names: Vec<String> = native_names
            .iter()
            .map(|name| key_case.apply(name))
            .collect();
        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            // duplicate names resolve to the first column, like the drivers do
            index.entry(name.clone()).or_insert(i);
        }
        Self {
            names: Arc::new(names),
            index: Arc::new(index),
        }
    }
}

/// Fully materialized result of one statement.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the statement
    pub results: Vec<NormalizedRow>,
    /// Rows affected by DML, or rows returned by a query
    pub rows_affected: usize,
    layout: Option<ColumnLayout>,
}

impl ResultSet {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            results: Vec::with_capacity(capacity),
            rows_affected: 0,
            layout: None,
        }
    }

    /// Result of a statement that returns no rows.
    #[must_use]
    pub fn affected(rows_affected: usize) -> ResultSet {
        ResultSet {
            rows_affected,
            ..ResultSet::default()
        }
    }

    /// Set the column names (as reported by the driver) and the casing applied to them.
    pub fn set_column_names(&mut self, native_names: Vec<String>, key_case: KeyCase) {
        self.layout = Some(ColumnLayout::new(native_names, key_case));
    }

    /// Normalized column names, if the statement produced a result description.
    #[must_use]
    pub fn column_names(&self) -> Option<&Arc<Vec<String>>> {
        self.layout.as_ref().map(|layout| &layout.names)
    }

    /// Add a row; ignored until column names are set.
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        if let Some(layout) = &self.layout {
            self.results
                .push(NormalizedRow::new(layout.clone(), row_values));
            self.rows_affected += 1;
        }
    }
}
