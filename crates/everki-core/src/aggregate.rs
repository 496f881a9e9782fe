use serde::Serialize;
use tracing::{debug, info};

use crate::config::Params;
use crate::error::Mutation;
use crate::markup::{empty_document, MarkupBody};
use crate::pattern::LinePattern;
use crate::remote::{DocumentHandle, NoteSource};
use crate::scan::scan_documents;
use crate::{Error, Result};

/// Outcome of an aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateReport {
    pub staging: DocumentHandle,
    /// Matching lines appended to the staging document, in source order
    pub appended: Vec<String>,
    /// The markup block spliced into the staging body; empty when nothing
    /// matched
    pub block: String,
    /// Every scanned source document, all of which were deleted
    pub consumed: Vec<DocumentHandle>,
}

impl std::fmt::Display for AggregateReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Aggregated into '{}'.", self.staging.title)?;
        writeln!(f, "Appended:")?;
        for line in &self.appended {
            writeln!(f, " - {line}")?;
        }
        writeln!(f, "Consumed:")?;
        for doc in &self.consumed {
            writeln!(f, " - {}", doc.title)?;
        }
        Ok(())
    }
}

/// Folds the matching lines of every source document into the staging
/// document and deletes the sources.
///
/// Sources are deleted once scanned, whether or not they contributed a line.
/// Nothing is rolled back: if a deletion fails, the staging document keeps
/// what was appended and the remaining sources are scanned again next time.
pub struct Aggregator<'a> {
    params: &'a Params,
    pattern: LinePattern,
}

impl<'a> Aggregator<'a> {
    #[must_use]
    pub fn new(params: &'a Params, pattern: LinePattern) -> Self {
        Self { params, pattern }
    }

    async fn staging_document(&self, source: &dyn NoteSource) -> Result<DocumentHandle> {
        let title = &self.params.staging_title;
        if let Some(handle) = source.find_by_title(title).await? {
            return Ok(handle);
        }

        info!(title = title.as_str(), "creating staging document");
        source
            .create_document(title, &empty_document())
            .await
            .map_err(|e| Error::mutation(Mutation::CreateDocument, title.as_str(), &e))
    }

    pub async fn run(&self, source: &dyn NoteSource) -> Result<AggregateReport> {
        let staging = self.staging_document(source).await?;
        let staging_body = source.fetch_body(&staging.id).await?;
        let staging_markup =
            MarkupBody::parse(&staging_body).map_err(|e| Error::MalformedDocument {
                id: staging.id.clone(),
                title: staging.title.clone(),
                source: e,
            })?;

        let documents = scan_documents(
            source,
            &self.params.search_filter,
            self.params.order,
            Some(&staging.id),
        )
        .await?;

        let appended: Vec<String> = documents
            .iter()
            .flat_map(|doc| doc.lines.iter())
            .filter(|line| self.pattern.is_match(line))
            .cloned()
            .collect();

        let mut block = String::new();
        if let Some(updated) = staging_markup.append_lines(&appended) {
            source
                .update_body(&staging.id, &updated.body)
                .await
                .map_err(|e| Error::mutation(Mutation::UpdateDocument, staging.title.as_str(), &e))?;
            debug!(lines = appended.len(), "updated staging document");
            block = updated.block;
        }

        let mut consumed = Vec::with_capacity(documents.len());
        for doc in documents {
            source
                .delete_document(&doc.handle.id)
                .await
                .map_err(|e| Error::mutation(Mutation::DeleteDocument, doc.handle.title.as_str(), &e))?;
            debug!(title = doc.handle.title.as_str(), "deleted source document");
            consumed.push(doc.handle);
        }

        info!(
            staging = staging.title.as_str(),
            appended = appended.len(),
            consumed = consumed.len(),
            "aggregated"
        );

        Ok(AggregateReport {
            block,
            staging,
            appended,
            consumed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::render_document;
    use crate::record::RecordSchema;
    use crate::remote::{MemoryNoteSource, SearchOrder};
    use crate::scan::document_lines;

    fn params() -> Params {
        Params {
            deck: "Geography".into(),
            note_type: "Basic".into(),
            search_filter: "capitals".into(),
            parsing_regex: r"^(?P<front>.+) :: (?P<back>.+)$".into(),
            staging_title: "capitals inbox".into(),
            order: SearchOrder::default(),
        }
    }

    fn pattern(params: &Params) -> LinePattern {
        let schema = RecordSchema::new("Basic", vec!["front".into(), "back".into()]);
        LinePattern::compile(&params.parsing_regex, &schema).unwrap()
    }

    async fn staged_lines(source: &MemoryNoteSource, title: &str) -> Vec<String> {
        let handle = source.find_by_title(title).await.unwrap().unwrap();
        let body = source.fetch_body(&handle.id).await.unwrap();
        document_lines(&handle, &body).unwrap()
    }

    #[tokio::test]
    async fn test_only_matching_lines_are_staged_and_all_sources_consumed() {
        let params = params();
        let source = MemoryNoteSource::new();
        for (title, lines) in [
            ("capitals A", vec!["groceries", "call mom"]),
            (
                "capitals B",
                vec!["Capital of France :: Paris", "just a thought", "Capital of Japan :: Tokyo"],
            ),
            ("capitals C", vec!["nothing to see"]),
        ] {
            source.create_document(title, &render_document(&lines)).await.unwrap();
        }

        let report = Aggregator::new(&params, pattern(&params))
            .run(&source)
            .await
            .unwrap();

        assert_eq!(
            report.appended,
            ["Capital of France :: Paris", "Capital of Japan :: Tokyo"]
        );
        assert_eq!(report.consumed.len(), 3);
        assert_eq!(source.titles().await, ["capitals inbox"]);
        assert_eq!(
            staged_lines(&source, "capitals inbox").await,
            ["Capital of France :: Paris", "Capital of Japan :: Tokyo"]
        );
    }

    #[tokio::test]
    async fn test_filter_does_not_match_markup() {
        let params = Params {
            search_filter: "note".into(),
            ..params()
        };
        let source = MemoryNoteSource::new();
        source
            .create_document("Shopping list", &render_document(&["buy milk"]))
            .await
            .unwrap();
        source
            .create_document("Diary", &render_document(&["slept well"]))
            .await
            .unwrap();
        source
            .create_document("Lecture notes", &render_document(&["Capital of France :: Paris"]))
            .await
            .unwrap();

        let report = Aggregator::new(&params, pattern(&params))
            .run(&source)
            .await
            .unwrap();

        let consumed: Vec<&str> = report.consumed.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(consumed, ["Lecture notes"]);
        assert_eq!(source.titles().await, ["Shopping list", "Diary", "capitals inbox"]);
        assert_eq!(
            staged_lines(&source, "capitals inbox").await,
            ["Capital of France :: Paris"]
        );
    }

    #[tokio::test]
    async fn test_nothing_matching_leaves_staging_untouched() {
        let params = params();
        let source = MemoryNoteSource::new();
        let staging = source
            .create_document("capitals inbox", &render_document(&["Old :: card"]))
            .await
            .unwrap();
        let before = source.fetch_body(&staging.id).await.unwrap();
        source
            .create_document("capitals draft", &render_document(&["no cards here"]))
            .await
            .unwrap();

        let report = Aggregator::new(&params, pattern(&params))
            .run(&source)
            .await
            .unwrap();

        assert!(report.appended.is_empty());
        assert!(report.block.is_empty());
        assert_eq!(report.consumed.len(), 1);
        assert_eq!(source.fetch_body(&staging.id).await.unwrap(), before);
        assert_eq!(source.titles().await, ["capitals inbox"]);
    }

    #[tokio::test]
    async fn test_appends_after_existing_lines_and_skips_itself() {
        let params = params();
        let source = MemoryNoteSource::new();
        source
            .create_document("capitals inbox", &render_document(&["Old :: card"]))
            .await
            .unwrap();
        source
            .create_document("capitals new", &render_document(&["New :: card", "a & b :: <c>"]))
            .await
            .unwrap();

        let aggregator = Aggregator::new(&params, pattern(&params));
        let report = aggregator.run(&source).await.unwrap();
        assert_eq!(report.block, "<br/>New :: card<br/>a &amp; b :: &lt;c&gt;");

        let second = aggregator.run(&source).await.unwrap();
        assert!(second.appended.is_empty());
        assert!(second.consumed.is_empty());

        assert_eq!(
            staged_lines(&source, "capitals inbox").await,
            ["Old :: card", "New :: card", "a & b :: <c>"]
        );
    }

    #[tokio::test]
    async fn test_malformed_source_aborts_before_mutating() {
        let params = params();
        let source = MemoryNoteSource::new();
        source
            .create_document("capitals inbox", &render_document::<&str>(&[]))
            .await
            .unwrap();
        source
            .create_document("capitals good", &render_document(&["a :: b"]))
            .await
            .unwrap();
        source
            .create_document("capitals broken", "<en-note><div>c :: d")
            .await
            .unwrap();

        let result = Aggregator::new(&params, pattern(&params)).run(&source).await;
        assert!(matches!(result, Err(Error::MalformedDocument { .. })));
        assert_eq!(source.len().await, 3);
        assert!(staged_lines(&source, "capitals inbox").await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_deletion_keeps_staged_lines() {
        let params = params();
        let source = MemoryNoteSource::new();
        let first = source
            .create_document("capitals 1", &render_document(&["a :: 1"]))
            .await
            .unwrap();
        let second = source
            .create_document("capitals 2", &render_document(&["b :: 2"]))
            .await
            .unwrap();
        source.fail_delete(&second.id).await;

        let err = Aggregator::new(&params, pattern(&params))
            .run(&source)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::StorageMutation {
                operation: Mutation::DeleteDocument,
                ..
            }
        ));

        assert_eq!(staged_lines(&source, "capitals inbox").await, ["a :: 1", "b :: 2"]);
        assert!(source.fetch_body(&first.id).await.is_err());
        assert!(source.fetch_body(&second.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_update_deletes_nothing() {
        let params = params();
        let source = MemoryNoteSource::new();
        let staging = source
            .create_document("capitals inbox", &render_document::<&str>(&[]))
            .await
            .unwrap();
        source
            .create_document("capitals 1", &render_document(&["a :: 1"]))
            .await
            .unwrap();
        source.fail_update(&staging.id).await;

        let err = Aggregator::new(&params, pattern(&params))
            .run(&source)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::StorageMutation {
                operation: Mutation::UpdateDocument,
                ..
            }
        ));
        assert_eq!(source.len().await, 2);
    }

    #[test]
    fn test_summary() {
        let handle = |title: &str| DocumentHandle {
            id: title.to_lowercase(),
            title: title.into(),
            created: chrono::DateTime::<chrono::Utc>::UNIX_EPOCH,
            updated: chrono::DateTime::<chrono::Utc>::UNIX_EPOCH,
        };
        let report = AggregateReport {
            staging: handle("Inbox"),
            appended: vec!["a :: b".into()],
            block: "a :: b".into(),
            consumed: vec![handle("Draft")],
        };

        assert_eq!(
            report.to_string(),
            "Aggregated into 'Inbox'.\nAppended:\n - a :: b\nConsumed:\n - Draft\n"
        );
    }
}
