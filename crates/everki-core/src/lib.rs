pub mod aggregate;
pub mod config;
pub mod dedup;
pub mod error;
pub mod markup;
pub mod pattern;
pub mod record;
pub mod remote;
pub mod scan;
pub mod store;
pub mod sync;

pub use aggregate::{AggregateReport, Aggregator};
pub use config::{Config, Params, SourceConfig, StoreConfig};
pub use dedup::KnownRecords;
pub use error::{Error, Mutation, Result};
pub use markup::{Appended, MarkupBody, MarkupError};
pub use pattern::LinePattern;
pub use record::{Field, NewRecord, Record, RecordSchema};
pub use remote::{
    DirectoryNoteSource, DocumentHandle, MemoryNoteSource, NoteSource, SearchOrder, SortField,
};
pub use store::{Destination, FlashcardStore, RecordId, SqliteStore};
pub use sync::{SourceLine, SyncReport, Synchronizer};
