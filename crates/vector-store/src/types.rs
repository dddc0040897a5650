use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Equality constraints on record attributes. A record is eligible only if
/// every listed attribute is present with exactly the listed value.
pub type AttributeFilter = BTreeMap<String, String>;

/// One embedded entity in the index: the text that gets embedded plus the
/// auxiliary attributes usable as equality filters.
///
/// `text` is immutable once indexed; changing reference text requires a full
/// rebuild of the owning store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReferenceRecord {
    pub text: String,
    pub attributes: BTreeMap<String, String>,
}

impl ReferenceRecord {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// True when every filter constraint matches an attribute exactly.
    /// Records missing a filtered attribute are not eligible.
    pub fn matches_filter(&self, filter: &AttributeFilter) -> bool {
        filter
            .iter()
            .all(|(name, value)| self.attribute(name) == Some(value.as_str()))
    }
}

/// One attribute column of a reference catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub nullable: bool,
}

/// Ordered description of which attributes exist for an index instance.
///
/// Persisted in the system store once per index build and read back on every
/// resolver initialization; absence means the index has never been built.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaDescriptor {
    pub columns: Vec<ColumnSpec>,
}

impl SchemaDescriptor {
    /// All-nullable text columns, the shape catalog ingestion produces.
    pub fn text_columns<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: names
                .into_iter()
                .map(|name| ColumnSpec {
                    name: name.into(),
                    nullable: true,
                })
                .collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|col| col.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Search hit: matched record content plus similarity score (higher = closer).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeMatch {
    pub text: String,
    pub attributes: BTreeMap<String, String>,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn filter_requires_every_constraint() {
        let record = ReferenceRecord::new("Brazil")
            .with_attribute("countrycode", "076")
            .with_attribute("isreporter", "1");

        let mut filter = AttributeFilter::new();
        filter.insert("isreporter".to_string(), "1".to_string());
        assert!(record.matches_filter(&filter));

        filter.insert("countrycode".to_string(), "156".to_string());
        assert!(!record.matches_filter(&filter));
    }

    #[test]
    fn filter_rejects_missing_attribute() {
        let record = ReferenceRecord::new("World");
        let mut filter = AttributeFilter::new();
        filter.insert("isreporter".to_string(), "0".to_string());
        assert!(!record.matches_filter(&filter));
    }

    #[test]
    fn schema_from_names_is_all_nullable() {
        let schema = SchemaDescriptor::text_columns(["countrycode", "name"]);
        assert_eq!(schema.columns.len(), 2);
        assert!(schema.columns.iter().all(|col| col.nullable));
        assert!(schema.contains("name"));
        assert!(!schema.contains("iso3"));
    }
}
