mod directory;
mod memory;

pub use directory::DirectoryNoteSource;
pub use memory::MemoryNoteSource;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use crate::markup::MarkupBody;
use crate::Result;

/// Identity of a remote document. Bodies are fetched separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHandle {
    pub id: String,
    pub title: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Created,
    Updated,
    Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOrder {
    pub field: SortField,
    #[serde(default = "default_ascending")]
    pub ascending: bool,
}

const fn default_ascending() -> bool {
    true
}

impl Default for SearchOrder {
    fn default() -> Self {
        Self {
            field: SortField::Created,
            ascending: true,
        }
    }
}

impl SearchOrder {
    /// Sorts handles in place. Ties keep their current relative order.
    pub fn sort(&self, handles: &mut [DocumentHandle]) {
        handles.sort_by(|a, b| {
            let ordering = match self.field {
                SortField::Created => a.created.cmp(&b.created),
                SortField::Updated => a.updated.cmp(&b.updated),
                SortField::Title => a.title.cmp(&b.title),
            };
            if self.ascending {
                ordering
            } else {
                ordering.reverse()
            }
        });
    }
}

/// True when every whitespace-separated term of `query` occurs in the title
/// or the body's text, ignoring case. An empty query matches everything.
///
/// Markup is not searched. A body that does not parse is searched as is, so
/// it still reaches the pipelines and fails there.
pub fn matches_query(query: &str, title: &str, body: &str) -> bool {
    let text = MarkupBody::parse(body).map_or(Cow::Borrowed(body), |m| Cow::Owned(m.text()));
    let title = title.to_lowercase();
    let body = text.to_lowercase();
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .all(|term| title.contains(&term) || body.contains(&term))
}

/// The remote note service.
///
/// Deleting an id that no longer exists succeeds, so a failed run can be
/// retried without special casing.
#[async_trait::async_trait]
pub trait NoteSource: Send + Sync {
    async fn search(&self, query: &str, order: SearchOrder) -> Result<Vec<DocumentHandle>>;

    async fn fetch_body(&self, id: &str) -> Result<String>;

    async fn create_document(&self, title: &str, body: &str) -> Result<DocumentHandle>;

    async fn update_body(&self, id: &str, body: &str) -> Result<()>;

    async fn delete_document(&self, id: &str) -> Result<()>;

    /// First document whose title is exactly `title`.
    async fn find_by_title(&self, title: &str) -> Result<Option<DocumentHandle>> {
        let handles = self.search(title, SearchOrder::default()).await?;
        Ok(handles.into_iter().find(|h| h.title == title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::render_document;

    fn handle(id: &str, title: &str, created: i64, updated: i64) -> DocumentHandle {
        DocumentHandle {
            id: id.into(),
            title: title.into(),
            created: DateTime::<Utc>::from_timestamp(created, 0).unwrap(),
            updated: DateTime::<Utc>::from_timestamp(updated, 0).unwrap(),
        }
    }

    #[test]
    fn test_matches_query() {
        assert!(matches_query("", "anything", ""));
        assert!(matches_query("flash", "Flashcards", ""));
        assert!(matches_query("flash capital", "Flashcards", "Capital of France"));
        assert!(!matches_query("flash tokyo", "Flashcards", "Capital of France"));
    }

    #[test]
    fn test_query_ignores_markup() {
        let body = render_document(&["buy milk"]);

        assert!(matches_query("milk", "Shopping list", &body));
        for term in ["note", "evernote", "xml", "div", "dtd", "br"] {
            assert!(!matches_query(term, "Shopping list", &body), "{term}");
        }
        assert!(matches_query("div", "x", "<en-note><div>unclosed"));
    }

    #[test]
    fn test_sort_order() {
        let mut handles = vec![handle("b", "B", 2, 1), handle("a", "A", 1, 3), handle("c", "C", 3, 2)];

        SearchOrder::default().sort(&mut handles);
        let ids: Vec<&str> = handles.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);

        SearchOrder {
            field: SortField::Updated,
            ascending: false,
        }
        .sort(&mut handles);
        let ids: Vec<&str> = handles.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, ["a", "c", "b"]);
    }
}
