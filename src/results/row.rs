use std::collections::HashMap;
use std::sync::Arc;

use super::result_set::ColumnLayout;
use crate::types::RowValues;

/// One result row as a column-name to value mapping.
///
/// Column names are normalized by the cursor that produced the row (upper case by default).
/// [`NormalizedRow::get`] also falls back to a case-insensitive match, so `row.get("name")` and
/// `row.get("NAME")` both work regardless of engine.
#[derive(Debug, Clone)]
pub struct NormalizedRow {
    layout: ColumnLayout,
    values: Vec<RowValues>,
}

impl NormalizedRow {
    pub(crate) fn new(layout: ColumnLayout, values: Vec<RowValues>) -> Self {
        Self { layout, values }
    }

    /// Column names in select-list order.
    #[must_use]
    pub fn column_names(&self) -> &Arc<Vec<String>> {
        &self.layout.names
    }

    #[must_use]
    pub fn values(&self) -> &[RowValues] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Index of `column_name`: exact match, then upper-cased, then any casing.
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        if let Some(&idx) = self.layout.index.get(column_name) {
            return Some(idx);
        }
        if let Some(&idx) = self.layout.index.get(&column_name.to_uppercase()) {
            return Some(idx);
        }
        self.layout
            .names
            .iter()
            .position(|col| col.eq_ignore_ascii_case(column_name))
    }

    /// Value of `column_name`, or `None` if the row has no such column.
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }

    /// Iterate `(column, value)` pairs in select-list order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RowValues)> {
        self.layout
            .names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Copy the row into an owned map.
    #[must_use]
    pub fn to_map(&self) -> HashMap<String, RowValues> {
        self.iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    /// Consume the row, returning its values in select-list order.
    #[must_use]
    pub fn into_values(self) -> Vec<RowValues> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KeyCase;

    fn row(names: &[&str], key_case: KeyCase, values: Vec<RowValues>) -> NormalizedRow {
        let names = names.iter().map(|n| (*n).to_string()).collect();
        NormalizedRow::new(ColumnLayout::new(names, key_case), values)
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let r = row(
            &["id", "Name"],
            KeyCase::Upper,
            vec![RowValues::Int(7), RowValues::Text("ana".into())],
        );
        assert_eq!(r.column_names().as_slice(), ["ID", "NAME"]);
        assert_eq!(r.get("ID"), Some(&RowValues::Int(7)));
        assert_eq!(r.get("name").and_then(RowValues::as_text), Some("ana"));
        assert_eq!(r.get("missing"), None);
    }

    #[test]
    fn preserved_keys_still_match_any_casing() {
        let r = row(&["MixedCase"], KeyCase::Preserve, vec![RowValues::Null]);
        assert_eq!(r.column_names().as_slice(), ["MixedCase"]);
        assert!(r.get("mixedcase").is_some_and(RowValues::is_null));
        assert_eq!(r.to_map().len(), 1);
    }
}
