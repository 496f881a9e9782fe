use serde::Serialize;
use tracing::{debug, info};

use crate::config::Params;
use crate::dedup::KnownRecords;
use crate::error::Mutation;
use crate::pattern::LinePattern;
use crate::record::{NewRecord, Record};
use crate::remote::NoteSource;
use crate::scan::scan_documents;
use crate::store::{Destination, FlashcardStore};
use crate::{Error, Result};

/// One extracted line and the title of the document it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub text: String,
    pub title: Option<String>,
}

impl SourceLine {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            title: None,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Outcome of a synchronization, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub created: Vec<Record>,
    pub skipped: Vec<Record>,
}

impl std::fmt::Display for SyncReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Synchronized.")?;
        writeln!(f, "Added:")?;
        for record in &self.created {
            writeln!(f, " - {record}")?;
        }
        writeln!(f, "Ignored:")?;
        for record in &self.skipped {
            writeln!(f, " - {record}")?;
        }
        Ok(())
    }
}

/// Creates a flashcard for every matching line not already in the deck.
pub struct Synchronizer<'a> {
    params: &'a Params,
    store: &'a dyn FlashcardStore,
    pattern: LinePattern,
    destination: Destination,
}

impl<'a> Synchronizer<'a> {
    /// Resolves the deck and record type and compiles the pattern.
    pub async fn prepare(params: &'a Params, store: &'a dyn FlashcardStore) -> Result<Self> {
        let destination = store
            .resolve_destination(&params.deck)
            .await?
            .ok_or_else(|| Error::Configuration(format!("unknown deck '{}'", params.deck)))?;

        let schema = store.schema(&params.note_type).await?.ok_or_else(|| {
            Error::Configuration(format!("unknown record type '{}'", params.note_type))
        })?;

        let pattern = LinePattern::compile(&params.parsing_regex, &schema)?;

        Ok(Self {
            params,
            store,
            pattern,
            destination,
        })
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub async fn known_records(&self) -> Result<KnownRecords> {
        self.store
            .known_records(&self.pattern.schema().name, &self.destination)
            .await
    }

    /// Pulls every document matching the search filter and merges its lines.
    pub async fn run(&self, source: &dyn NoteSource) -> Result<SyncReport> {
        let mut known = self.known_records().await?;

        let documents =
            scan_documents(source, &self.params.search_filter, self.params.order, None).await?;
        let lines = documents.into_iter().flat_map(|doc| {
            let title = doc.handle.title;
            doc.lines
                .into_iter()
                .map(move |text| SourceLine::new(text).with_title(title.clone()))
        });

        let report = self.merge(lines, &mut known).await?;
        info!(
            deck = self.destination.name.as_str(),
            created = report.created.len(),
            skipped = report.skipped.len(),
            "synchronized"
        );
        Ok(report)
    }

    /// Creates records for the matching lines `known` does not contain,
    /// registering each one as it is created.
    ///
    /// A failed creation stops the merge; records created before it stay.
    pub async fn merge<I>(&self, lines: I, known: &mut KnownRecords) -> Result<SyncReport>
    where
        I: IntoIterator<Item = SourceLine>,
    {
        let mut report = SyncReport::default();
        let record_type = &self.pattern.schema().name;

        for line in lines {
            let Some(record) = self.pattern.match_line(&line.text) else {
                continue;
            };

            if !known.is_new(&record) {
                debug!(record = %record, "already known");
                report.skipped.push(record);
                continue;
            }

            let mut new = NewRecord::new(record_type.as_str(), self.destination.id, record.clone());
            if let Some(title) = &line.title {
                new = new.with_source_title(title);
            }

            self.store
                .create_record(&new)
                .await
                .map_err(|e| Error::mutation(Mutation::CreateRecord, record.to_string(), &e))?;

            debug!(record = %record, "created");
            known.register(record.clone());
            report.created.push(record);
        }

        Ok(report)
    }
}
