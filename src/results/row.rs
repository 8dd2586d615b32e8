use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::types::RowValues;

/// Column metadata shared by every row of one result.
#[derive(Debug)]
pub(crate) struct Columns {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Columns {
    pub(crate) fn new(names: Vec<String>) -> Self {
        // later duplicates win, same as building a map from the row
        let index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self { names, index }
    }
}

/// A single result row: column name to value.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<Columns>,
    values: Vec<RowValues>,
}

impl Row {
    /// Create a row from column names and values in the same order.
    ///
    /// Missing trailing values read back as absent, extra values are kept but are
    /// only reachable by index.
    #[must_use]
    pub fn new(column_names: Vec<String>, values: Vec<RowValues>) -> Self {
        Self::with_columns(Arc::new(Columns::new(column_names)), values)
    }

    pub(crate) fn with_columns(columns: Arc<Columns>, values: Vec<RowValues>) -> Self {
        Self { columns, values }
    }

    /// Value of the named column, if present.
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.columns
            .index
            .get(column_name)
            .and_then(|&idx| self.values.get(idx))
    }

    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }

    #[must_use]
    pub fn contains_column(&self, column_name: &str) -> bool {
        self.columns.index.contains_key(column_name)
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.columns.names
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

    /// Iterate `(column, value)` pairs in select-list order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RowValues)> {
        self.columns
            .names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Copy the row into an ordered name to value map.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, RowValues> {
        self.iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[must_use]
    pub fn into_map(self) -> BTreeMap<String, RowValues> {
        self.columns
            .names
            .iter()
            .cloned()
            .zip(self.values)
            .collect()
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.columns.names == other.columns.names && self.values == other.values
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = (&'a str, &'a RowValues);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a RowValues)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
