use thiserror::Error;

use crate::markup::MarkupError;

/// External mutation kinds, used to label storage failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    CreateRecord,
    CreateDocument,
    UpdateDocument,
    DeleteDocument,
}

impl Mutation {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CreateRecord => "create record",
            Self::CreateDocument => "create document",
            Self::UpdateDocument => "update document",
            Self::DeleteDocument => "delete document",
        }
    }
}

impl std::fmt::Display for Mutation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Malformed document {id} ({title}): {source}")]
    MalformedDocument {
        id: String,
        title: String,
        #[source]
        source: MarkupError,
    },

    #[error("Failed to {operation} {target}: {reason}")]
    StorageMutation {
        operation: Mutation,
        target: String,
        reason: String,
    },

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Record not found: {0}")]
    RecordNotFound(i64),

    #[error("Record does not fit type {record_type}: {reason}")]
    SchemaMismatch { record_type: String, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn mutation(operation: Mutation, target: impl Into<String>, cause: &Self) -> Self {
        Self::StorageMutation {
            operation,
            target: target.into(),
            reason: cause.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
