use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashSet;
use tokio::sync::Mutex;

use super::{matches_query, DocumentHandle, NoteSource, SearchOrder};
use crate::{Error, Result};

struct StoredNote {
    handle: DocumentHandle,
    body: String,
}

#[derive(Default)]
struct State {
    notes: Vec<StoredNote>,
    clock: i64,
    failing_deletes: HashSet<String>,
    failing_updates: HashSet<String>,
}

impl State {
    fn tick(&mut self) -> DateTime<Utc> {
        self.clock += 1;
        DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(self.clock)
    }

    fn note_mut(&mut self, id: &str) -> Result<&mut StoredNote> {
        self.notes
            .iter_mut()
            .find(|n| n.handle.id == id)
            .ok_or_else(|| Error::DocumentNotFound(id.to_string()))
    }
}

/// In-process note source. Timestamps come from a logical clock so creation
/// order is deterministic.
#[derive(Default)]
pub struct MemoryNoteSource {
    state: Mutex<State>,
}

impl MemoryNoteSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.notes.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn titles(&self) -> Vec<String> {
        let state = self.state.lock().await;
        state.notes.iter().map(|n| n.handle.title.clone()).collect()
    }

    /// Makes later deletes of `id` fail.
    pub async fn fail_delete(&self, id: &str) {
        self.state.lock().await.failing_deletes.insert(id.to_string());
    }

    /// Makes later body updates of `id` fail.
    pub async fn fail_update(&self, id: &str) {
        self.state.lock().await.failing_updates.insert(id.to_string());
    }
}

#[async_trait::async_trait]
impl NoteSource for MemoryNoteSource {
    async fn search(&self, query: &str, order: SearchOrder) -> Result<Vec<DocumentHandle>> {
        let state = self.state.lock().await;
        let mut handles: Vec<DocumentHandle> = state
            .notes
            .iter()
            .filter(|n| matches_query(query, &n.handle.title, &n.body))
            .map(|n| n.handle.clone())
            .collect();
        order.sort(&mut handles);
        Ok(handles)
    }

    async fn fetch_body(&self, id: &str) -> Result<String> {
        let mut state = self.state.lock().await;
        Ok(state.note_mut(id)?.body.clone())
    }

    async fn create_document(&self, title: &str, body: &str) -> Result<DocumentHandle> {
        let mut state = self.state.lock().await;
        let now = state.tick();
        let handle = DocumentHandle {
            id: format!("note-{}", state.clock),
            title: title.to_string(),
            created: now,
            updated: now,
        };
        state.notes.push(StoredNote {
            handle: handle.clone(),
            body: body.to_string(),
        });
        Ok(handle)
    }

    async fn update_body(&self, id: &str, body: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.failing_updates.contains(id) {
            return Err(Error::Io(std::io::Error::other("update rejected")));
        }
        let now = state.tick();
        let note = state.note_mut(id)?;
        note.body = body.to_string();
        note.handle.updated = now;
        Ok(())
    }

    async fn delete_document(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.failing_deletes.contains(id) {
            return Err(Error::Io(std::io::Error::other("delete rejected")));
        }
        state.notes.retain(|n| n.handle.id != id);
        Ok(())
    }
}
