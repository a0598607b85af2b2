//! SQLite-backed [`RecordStore`].
//!
//! Schema (see `migrate.rs`): `records` holds one row per record with its
//! keyword list as a JSON array, `record_files` the owned files in upload
//! order, and `record_keywords` an inverted index used to find search
//! candidates without scanning every record.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::models::{CaseMetadata, DerivedFields, Document, DocumentRecord, KeywordEntry};

use super::{now_ts, RecordStore, StoreError};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn load_files(&self, record_id: &str) -> Result<Vec<Document>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, url, content_type FROM record_files WHERE record_id = ? ORDER BY position",
        )
        .bind(record_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<Document, StoreError> {
                Ok(Document {
                    id: row.try_get("id")?,
                    url: row.try_get("url")?,
                    content_type: row.try_get("content_type")?,
                })
            })
            .collect()
    }

    async fn record_from_row(&self, row: &SqliteRow) -> Result<DocumentRecord, StoreError> {
        let id: String = row.try_get("id")?;
        let keywords = parse_keywords(&id, row.try_get("keywords_json")?)?;
        let documents = self.load_files(&id).await?;
        Ok(DocumentRecord {
            license_id: row.try_get("license_id")?,
            documents,
            clean_text: row.try_get("clean_text")?,
            keywords,
            summary: row.try_get("summary")?,
            metadata: CaseMetadata {
                title: row.try_get("title")?,
                parties: row.try_get("parties")?,
                court: row.try_get("court")?,
                date: row.try_get("date")?,
            },
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            id,
        })
    }
}

fn parse_keywords(id: &str, json: &str) -> Result<Vec<String>, StoreError> {
    serde_json::from_str(json).map_err(|e| StoreError::Corrupt {
        id: id.to_string(),
        message: format!("keywords_json: {}", e),
    })
}

fn entry_from_row(row: &SqliteRow) -> Result<KeywordEntry, StoreError> {
    let id: String = row.try_get("id")?;
    let keywords = parse_keywords(&id, row.try_get("keywords_json")?)?;
    Ok(KeywordEntry { id, keywords })
}

const RECORD_COLUMNS: &str = "id, license_id, clean_text, keywords_json, summary, \
                              title, parties, court, date, created_at, updated_at";

#[async_trait]
impl RecordStore for SqliteStore {
    async fn create_record(
        &self,
        license_id: &str,
        documents: &[Document],
    ) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_ts();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO records (id, license_id, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(license_id)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for (position, doc) in documents.iter().enumerate() {
            sqlx::query(
                "INSERT INTO record_files (id, record_id, position, url, content_type) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&doc.id)
            .bind(&id)
            .bind(position as i64)
            .bind(&doc.url)
            .bind(&doc.content_type)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(id)
    }

    async fn load_record(&self, id: &str) -> Result<DocumentRecord, StoreError> {
        let row = sqlx::query(&format!("SELECT {RECORD_COLUMNS} FROM records WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        self.record_from_row(&row).await
    }

    async fn save_derived_fields(
        &self,
        id: &str,
        fields: &DerivedFields,
    ) -> Result<(), StoreError> {
        let keywords_json = serde_json::to_string(&fields.keywords).map_err(|e| {
            StoreError::Corrupt {
                id: id.to_string(),
                message: e.to_string(),
            }
        })?;
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE records SET
                clean_text = ?, keywords_json = ?, summary = ?,
                title = ?, parties = ?, court = ?, date = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&fields.clean_text)
        .bind(&keywords_json)
        .bind(&fields.summary)
        .bind(&fields.metadata.title)
        .bind(&fields.metadata.parties)
        .bind(&fields.metadata.court)
        .bind(&fields.metadata.date)
        .bind(now_ts())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // Dropping the transaction rolls it back.
            return Err(StoreError::NotFound(id.to_string()));
        }

        sqlx::query("DELETE FROM record_keywords WHERE record_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for (position, keyword) in fields.keywords.iter().enumerate() {
            sqlx::query("INSERT INTO record_keywords (record_id, position, keyword) VALUES (?, ?, ?)")
                .bind(id)
                .bind(position as i64)
                .bind(keyword)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn load_keyword_index(&self) -> Result<Vec<KeywordEntry>, StoreError> {
        let rows = sqlx::query("SELECT id, keywords_json FROM records ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(entry_from_row).collect()
    }

    async fn load_keyword_index_matching(
        &self,
        terms: &[String],
    ) -> Result<Vec<KeywordEntry>, StoreError> {
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; terms.len()].join(", ");
        let sql = format!(
            "SELECT id, keywords_json FROM records WHERE id IN \
             (SELECT DISTINCT record_id FROM record_keywords WHERE keyword IN ({placeholders})) \
             ORDER BY id"
        );
        let mut query = sqlx::query(&sql);
        for term in terms {
            query = query.bind(term);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(entry_from_row).collect()
    }

    async fn list_by_license(&self, license_id: &str) -> Result<Vec<DocumentRecord>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM records WHERE license_id = ? ORDER BY created_at, id"
        ))
        .bind(license_id)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(self.record_from_row(row).await?);
        }
        Ok(records)
    }
}
