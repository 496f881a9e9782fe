use tracing::debug;

use crate::markup::MarkupBody;
use crate::remote::{DocumentHandle, NoteSource, SearchOrder};
use crate::{Error, Result};

/// A fetched document reduced to its lines.
#[derive(Debug, Clone)]
pub struct ScannedDocument {
    pub handle: DocumentHandle,
    pub lines: Vec<String>,
}

/// Fetches and parses every document matching `query`, in `order`.
///
/// All bodies are parsed before returning, so a malformed document fails
/// the scan before the caller mutates anything.
pub async fn scan_documents(
    source: &dyn NoteSource,
    query: &str,
    order: SearchOrder,
    exclude_id: Option<&str>,
) -> Result<Vec<ScannedDocument>> {
    let handles = source.search(query, order).await?;
    let mut scanned = Vec::with_capacity(handles.len());

    for handle in handles {
        if exclude_id == Some(handle.id.as_str()) {
            continue;
        }

        let body = source.fetch_body(&handle.id).await?;
        let lines = document_lines(&handle, &body)?;
        debug!(
            id = handle.id.as_str(),
            title = handle.title.as_str(),
            lines = lines.len(),
            "scanned document"
        );
        scanned.push(ScannedDocument { handle, lines });
    }

    Ok(scanned)
}

pub fn document_lines(handle: &DocumentHandle, body: &str) -> Result<Vec<String>> {
    let markup = MarkupBody::parse(body).map_err(|source| Error::MalformedDocument {
        id: handle.id.clone(),
        title: handle.title.clone(),
        source,
    })?;
    Ok(markup.lines().map(String::from).collect())
}
