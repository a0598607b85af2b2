use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create every table and index. Safe to run repeatedly.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    // One row per indexed unit; derived fields stay NULL until the pipeline runs.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS records (
            id TEXT PRIMARY KEY,
            license_id TEXT NOT NULL,
            clean_text TEXT,
            keywords_json TEXT NOT NULL DEFAULT '[]',
            summary TEXT,
            title TEXT NOT NULL DEFAULT '',
            parties TEXT NOT NULL DEFAULT '',
            court TEXT NOT NULL DEFAULT '',
            date TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Files owned by a record, in upload order
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS record_files (
            id TEXT PRIMARY KEY,
            record_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            url TEXT NOT NULL,
            content_type TEXT NOT NULL,
            UNIQUE(record_id, position),
            FOREIGN KEY (record_id) REFERENCES records(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Inverted keyword index used to find search candidates
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS record_keywords (
            record_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            keyword TEXT NOT NULL,
            PRIMARY KEY (record_id, position),
            FOREIGN KEY (record_id) REFERENCES records(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_records_license ON records(license_id, created_at)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_record_files_record ON record_files(record_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_record_keywords_keyword ON record_keywords(keyword)")
        .execute(pool)
        .await?;

    Ok(())
}
