use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use crate::{Error, Result};

/// A record type known to the flashcard store and its ordered field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSchema {
    pub name: String,
    pub fields: Vec<String>,
}

impl RecordSchema {
    #[must_use]
    pub fn new(name: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }

    /// Builds a record from `(name, value)` pairs. The pairs must cover every
    /// field of the schema exactly once; the record keeps schema order.
    pub fn record<I, K, V>(&self, pairs: I) -> Result<Record>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut values: Vec<Option<String>> = vec![None; self.fields.len()];

        for (name, value) in pairs {
            let name = name.into();
            let slot = self
                .fields
                .iter()
                .position(|f| *f == name)
                .ok_or_else(|| self.mismatch(format!("unknown field '{name}'")))?;
            if values[slot].replace(value.into()).is_some() {
                return Err(self.mismatch(format!("field '{name}' given twice")));
            }
        }

        let fields = self
            .fields
            .iter()
            .zip(values)
            .map(|(name, value)| {
                value
                    .map(|value| Field {
                        name: name.clone(),
                        value,
                    })
                    .ok_or_else(|| self.mismatch(format!("missing field '{name}'")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Record { fields })
    }

    fn mismatch(&self, reason: String) -> Error {
        Error::SchemaMismatch {
            record_type: self.name.clone(),
            reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: String,
}

/// Field values extracted from one line. Equality ignores field order but is
/// exact on values: no trimming, no case folding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Vec<Field>,
}

impl Record {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.value.as_str())
    }

    fn sorted(&self) -> Vec<&Field> {
        let mut fields: Vec<&Field> = self.fields.iter().collect();
        fields.sort_by(|a, b| a.name.cmp(&b.name));
        fields
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .all(|f| other.get(&f.name) == Some(f.value.as_str()))
    }
}

impl Eq for Record {}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sorted().hash(state);
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let values: Vec<&str> = self.values().collect();
        f.write_str(&values.join(", "))
    }
}

pub const DESTINATION_TAG_PREFIX: &str = "did:";
pub const TITLE_TAG_PREFIX: &str = "title:";

/// Tag scoping a record to its deck. Deduplication only looks at records
/// carrying the same destination tag.
pub fn destination_tag(destination_id: i64) -> String {
    format!("{DESTINATION_TAG_PREFIX}{destination_id}")
}

/// Provenance tag naming the source document. Tags cannot hold whitespace.
pub fn title_tag(title: &str) -> String {
    let sanitized: String = title
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    format!("{TITLE_TAG_PREFIX}{sanitized}")
}

/// A record about to be written, with its placement and tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub record_type: String,
    pub destination_id: i64,
    pub record: Record,
    pub tags: Vec<String>,
}

impl NewRecord {
    #[must_use]
    pub fn new(record_type: impl Into<String>, destination_id: i64, record: Record) -> Self {
        Self {
            record_type: record_type.into(),
            destination_id,
            record,
            tags: vec![destination_tag(destination_id)],
        }
    }

    #[must_use]
    pub fn with_source_title(mut self, title: &str) -> Self {
        self.tags.push(title_tag(title));
        self
    }
}
