mod sqlite;

pub use sqlite::SqliteStore;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dedup::KnownRecords;
use crate::record::{destination_tag, NewRecord, Record, RecordSchema};
use crate::Result;

pub type RecordId = i64;

/// A deck records are created in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub id: i64,
    pub name: String,
}

impl Destination {
    pub fn tag(&self) -> String {
        destination_tag(self.id)
    }
}

/// The local flashcard collection.
#[async_trait::async_trait]
pub trait FlashcardStore: Send + Sync {
    /// Looks up a deck by name. `None` means the name cannot be resolved.
    async fn resolve_destination(&self, name: &str) -> Result<Option<Destination>>;

    async fn schema(&self, record_type: &str) -> Result<Option<RecordSchema>>;

    /// Ids of records of `record_type` carrying `tag`.
    async fn find_record_ids(&self, record_type: &str, tag: &str) -> Result<Vec<RecordId>>;

    async fn get_record(&self, id: RecordId) -> Result<Record>;

    async fn create_record(&self, record: &NewRecord) -> Result<RecordId>;

    /// Snapshot of the records already filed under `destination`.
    async fn known_records(
        &self,
        record_type: &str,
        destination: &Destination,
    ) -> Result<KnownRecords> {
        let ids = self.find_record_ids(record_type, &destination.tag()).await?;
        let mut known = KnownRecords::new();
        for id in ids {
            known.register(self.get_record(id).await?);
        }
        debug!(
            destination = destination.name.as_str(),
            count = known.len(),
            "loaded existing records"
        );
        Ok(known)
    }
}
