use std::collections::HashSet;

use crate::record::Record;

/// Records already present for one destination, grown as a run accepts new
/// ones so the same line seen twice is only created once.
#[derive(Debug, Clone, Default)]
pub struct KnownRecords {
    records: HashSet<Record>,
}

impl KnownRecords {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_new(&self, record: &Record) -> bool {
        !self.records.contains(record)
    }

    /// Adds `record`, returning `false` if it was already known.
    pub fn register(&mut self, record: Record) -> bool {
        self.records.insert(record)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<Record> for KnownRecords {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordSchema;

    fn card(front: &str, back: &str) -> Record {
        RecordSchema::new("Basic", vec!["front".into(), "back".into()])
            .record([("front", front), ("back", back)])
            .unwrap()
    }

    #[test]
    fn test_register_and_lookup() {
        let mut known = KnownRecords::new();
        assert!(known.is_new(&card("a", "b")));

        assert!(known.register(card("a", "b")));
        assert!(!known.register(card("a", "b")));
        assert!(!known.is_new(&card("a", "b")));
        assert_eq!(known.len(), 1);
    }

    #[test]
    fn test_one_differing_field_is_new() {
        let known: KnownRecords = [card("Capital of France", "Paris")].into_iter().collect();

        assert!(known.is_new(&card("Capital of France", "paris")));
        assert!(known.is_new(&card("Capital of Spain", "Paris")));
    }

    #[test]
    fn test_whitespace_is_significant() {
        let known: KnownRecords = [card("a", "b")].into_iter().collect();

        assert!(known.is_new(&card("a ", "b")));
        assert!(known.is_new(&card("a", " b")));
    }
}
