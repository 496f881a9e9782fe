use chrono::Utc;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::path::Path;

use super::{Destination, FlashcardStore, RecordId};
use crate::record::{NewRecord, Record, RecordSchema};
use crate::{Error, Result};

const INIT_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS decks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS record_types (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    fields TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    record_type_id INTEGER NOT NULL REFERENCES record_types(id),
    deck_id INTEGER NOT NULL REFERENCES decks(id),
    fields TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_type ON records(record_type_id);
CREATE INDEX IF NOT EXISTS idx_records_deck ON records(deck_id);

CREATE TABLE IF NOT EXISTS record_tags (
    record_id INTEGER NOT NULL REFERENCES records(id) ON DELETE CASCADE,
    tag TEXT NOT NULL,
    PRIMARY KEY (record_id, tag)
);

CREATE INDEX IF NOT EXISTS idx_record_tags_tag ON record_tags(tag);
"#;

/// Flashcard collection in a SQLite database.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&format!("sqlite:{}?mode=rwc", path.display()))
            .await?;

        sqlx::query(INIT_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn open_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        sqlx::query(INIT_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn register_record_type(&self, schema: &RecordSchema) -> Result<()> {
        let mismatch = |reason: &str| Error::SchemaMismatch {
            record_type: schema.name.clone(),
            reason: reason.to_string(),
        };

        if schema.fields.is_empty() {
            return Err(mismatch("a record type needs at least one field"));
        }
        for (i, field) in schema.fields.iter().enumerate() {
            if schema.fields[..i].contains(field) {
                return Err(mismatch("field names must be unique"));
            }
        }

        sqlx::query("INSERT INTO record_types (name, fields) VALUES (?, ?)")
            .bind(&schema.name)
            .bind(serde_json::to_string(&schema.fields)?)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e {
                    if db_err.is_unique_violation() {
                        return mismatch("already registered");
                    }
                }
                Error::Database(e)
            })?;

        Ok(())
    }

    pub async fn list_record_types(&self) -> Result<Vec<RecordSchema>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT name, fields FROM record_types ORDER BY name")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(parse_schema_row).collect()
    }

    async fn record_type_id(&self, name: &str) -> Result<Option<i64>> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM record_types WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(id,)| id))
    }
}

#[async_trait::async_trait]
impl FlashcardStore for SqliteStore {
    async fn resolve_destination(&self, name: &str) -> Result<Option<Destination>> {
        sqlx::query("INSERT OR IGNORE INTO decks (name, created_at) VALUES (?, ?)")
            .bind(name)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;

        let row: Option<(i64, String)> = sqlx::query_as("SELECT id, name FROM decks WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(id, name)| Destination { id, name }))
    }

    async fn schema(&self, record_type: &str) -> Result<Option<RecordSchema>> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT name, fields FROM record_types WHERE name = ?")
                .bind(record_type)
                .fetch_optional(&self.pool)
                .await?;

        row.map(parse_schema_row).transpose()
    }

    async fn find_record_ids(&self, record_type: &str, tag: &str) -> Result<Vec<RecordId>> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT r.id
            FROM records r
            JOIN record_types t ON t.id = r.record_type_id
            JOIN record_tags g ON g.record_id = r.id
            WHERE t.name = ? AND g.tag = ?
            ORDER BY r.id
            "#,
        )
        .bind(record_type)
        .bind(tag)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn get_record(&self, id: RecordId) -> Result<Record> {
        let (fields,): (String,) = sqlx::query_as("SELECT fields FROM records WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::RecordNotFound(id))?;

        Ok(serde_json::from_str(&fields)?)
    }

    async fn create_record(&self, new: &NewRecord) -> Result<RecordId> {
        let schema = self
            .schema(&new.record_type)
            .await?
            .ok_or_else(|| Error::SchemaMismatch {
                record_type: new.record_type.clone(),
                reason: "unknown record type".into(),
            })?;
        let record = schema.record(
            new.record
                .fields()
                .iter()
                .map(|f| (f.name.as_str(), f.value.as_str())),
        )?;
        let type_id = self
            .record_type_id(&schema.name)
            .await?
            .ok_or_else(|| Error::SchemaMismatch {
                record_type: schema.name.clone(),
                reason: "unknown record type".into(),
            })?;

        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            r#"
            INSERT INTO records (record_type_id, deck_id, fields, created_at)
            SELECT ?, id, ?, ? FROM decks WHERE id = ?
            "#,
        )
        .bind(type_id)
        .bind(serde_json::to_string(&record)?)
        .bind(Utc::now().to_rfc3339())
        .bind(new.destination_id)
        .execute(&mut *tx)
        .await?;

        if id.rows_affected() == 0 {
            return Err(Error::Configuration(format!(
                "deck {} does not exist",
                new.destination_id
            )));
        }
        let id = id.last_insert_rowid();

        for tag in &new.tags {
            sqlx::query("INSERT OR IGNORE INTO record_tags (record_id, tag) VALUES (?, ?)")
                .bind(id)
                .bind(tag)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(id)
    }
}

fn parse_schema_row(row: (String, String)) -> Result<RecordSchema> {
    let (name, fields) = row;
    Ok(RecordSchema::new(name, serde_json::from_str(&fields)?))
}
