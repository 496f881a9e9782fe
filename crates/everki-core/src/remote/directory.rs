use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

use super::{matches_query, DocumentHandle, NoteSource, SearchOrder};
use crate::{Error, Result};

const EXTENSION: &str = "json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredNote {
    title: String,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
    content: String,
}

impl StoredNote {
    fn handle(&self, id: String) -> DocumentHandle {
        DocumentHandle {
            id,
            title: self.title.clone(),
            created: self.created,
            updated: self.updated,
        }
    }
}

/// Notes kept as one `<uuid>.json` file each in a directory.
pub struct DirectoryNoteSource {
    root: PathBuf,
}

impl DirectoryNoteSource {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn note_path(&self, id: &str) -> Result<PathBuf> {
        // The file name is the id as written, so any uuid spelling search lists
        // can be read back.
        if Uuid::parse_str(id).is_err() {
            return Err(Error::DocumentNotFound(id.to_string()));
        }
        Ok(self.root.join(format!("{id}.{EXTENSION}")))
    }

    async fn read_note(&self, id: &str) -> Result<StoredNote> {
        let path = self.note_path(id)?;
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::DocumentNotFound(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&text)?)
    }

    async fn write_note(&self, id: &str, note: &StoredNote) -> Result<()> {
        let path = self.note_path(id)?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(note)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl NoteSource for DirectoryNoteSource {
    async fn search(&self, query: &str, order: SearchOrder) -> Result<Vec<DocumentHandle>> {
        let mut handles = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()).map(String::from) else {
                continue;
            };
            if Uuid::parse_str(&id).is_err() {
                warn!(path = %path.display(), "skipping file with a non-note name");
                continue;
            }

            let note = self.read_note(&id).await?;
            if matches_query(query, &note.title, &note.content) {
                handles.push(note.handle(id));
            }
        }

        // read_dir order is unspecified; settle ties by id before ordering.
        handles.sort_by(|a, b| a.id.cmp(&b.id));
        order.sort(&mut handles);
        Ok(handles)
    }

    async fn fetch_body(&self, id: &str) -> Result<String> {
        Ok(self.read_note(id).await?.content)
    }

    async fn create_document(&self, title: &str, body: &str) -> Result<DocumentHandle> {
        let id = Uuid::now_v7().to_string();
        let now = Utc::now();
        let note = StoredNote {
            title: title.to_string(),
            created: now,
            updated: now,
            content: body.to_string(),
        };
        self.write_note(&id, &note).await?;
        Ok(note.handle(id))
    }

    async fn update_body(&self, id: &str, body: &str) -> Result<()> {
        let mut note = self.read_note(id).await?;
        note.content = body.to_string();
        note.updated = Utc::now();
        self.write_note(id, &note).await
    }

    async fn delete_document(&self, id: &str) -> Result<()> {
        let path = self.note_path(id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectoryNoteSource::open(dir.path().join("notes")).await.unwrap();

        let note = source
            .create_document("Capitals", "<en-note><div>France :: Paris</div></en-note>")
            .await
            .unwrap();
        assert!(source.root().join(format!("{}.json", note.id)).exists());

        let found = source.search("capitals", SearchOrder::default()).await.unwrap();
        assert_eq!(found, vec![note.clone()]);
        assert!(source.search("tokyo", SearchOrder::default()).await.unwrap().is_empty());

        source
            .update_body(&note.id, "<en-note><div>Japan :: Tokyo</div></en-note>")
            .await
            .unwrap();
        assert!(source.fetch_body(&note.id).await.unwrap().contains("Tokyo"));

        source.delete_document(&note.id).await.unwrap();
        source.delete_document(&note.id).await.unwrap();
        assert!(source.search("", SearchOrder::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_uppercase_file_name_is_readable() {
        let dir = tempfile::tempdir().unwrap();
        let id = Uuid::now_v7().to_string().to_uppercase();
        let note = serde_json::json!({
            "title": "Capitals",
            "created": "2024-01-01T00:00:00Z",
            "updated": "2024-01-01T00:00:00Z",
            "content": "<en-note><div>France :: Paris</div></en-note>",
        });
        std::fs::write(dir.path().join(format!("{id}.json")), note.to_string()).unwrap();

        let source = DirectoryNoteSource::open(dir.path()).await.unwrap();
        let found = source.search("capitals", SearchOrder::default()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);
        assert!(source.fetch_body(&id).await.unwrap().contains("Paris"));

        source.delete_document(&id).await.unwrap();
        assert!(source.search("", SearchOrder::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let source = DirectoryNoteSource::open(dir.path()).await.unwrap();
        assert!(source.search("", SearchOrder::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ids_cannot_escape_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectoryNoteSource::open(dir.path()).await.unwrap();

        assert!(matches!(
            source.fetch_body("../secret").await,
            Err(Error::DocumentNotFound(_))
        ));
    }
}
