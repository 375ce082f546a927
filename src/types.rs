//! Product record type shared by the loader and the renderer

use serde::ser::{Serialize, SerializeMap, Serializer};

pub const CATEGORY: &str = "category";
pub const PRODUCT_PN: &str = "product_pn";
pub const PRODUCT_NAME: &str = "product_name";

/// Columns every product table must have
pub const REQUIRED_COLUMNS: [&str; 2] = [PRODUCT_PN, PRODUCT_NAME];

/// One row of the product table, keyed by header column.
///
/// Fields keep header order, so a template that iterates over a record sees
/// the columns in the order the table lists them. Values are never coerced:
/// a price of `"012"` stays `"012"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductRecord {
    fields: Vec<(String, String)>,
}

impl ProductRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing the value if the column is already present
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(c, _)| *c == column) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(c, _)| c.as_str())
    }

    pub fn category(&self) -> Option<&str> {
        self.get(CATEGORY)
    }

    pub fn product_pn(&self) -> Option<&str> {
        self.get(PRODUCT_PN)
    }

    pub fn product_name(&self) -> Option<&str> {
        self.get(PRODUCT_NAME)
    }

    /// (category, product_pn), with missing fields as empty strings
    pub fn sort_key(&self) -> (&str, &str) {
        (
            self.category().unwrap_or(""),
            self.product_pn().unwrap_or(""),
        )
    }
}

impl<K, V> FromIterator<(K, V)> for ProductRecord
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = ProductRecord::new();
        for (column, value) in iter {
            record.insert(column, value);
        }
        record
    }
}

impl Serialize for ProductRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (column, value) in &self.fields {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}
