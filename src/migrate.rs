use anyhow::Result;
use sqlx::SqlitePool;
use std::collections::HashSet;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate_pool(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Creates every table on an already-open pool. Safe to run repeatedly.
pub async fn migrate_pool(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS students (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            progress TEXT NOT NULL DEFAULT 'Not started'
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Older databases may carry this table without the later columns;
    // ensure_learning_resource_columns patches those up below.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS learning_resources (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            topic TEXT,
            content TEXT,
            relevance_tag INTEGER DEFAULT 0,
            difficulty TEXT,
            url TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS document_folders (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            folder_id TEXT NOT NULL,
            name TEXT NOT NULL,
            mime_type TEXT NOT NULL,
            size_bytes INTEGER NOT NULL,
            sha256 TEXT NOT NULL,
            data_url TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            FOREIGN KEY (folder_id) REFERENCES document_folders(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    ensure_learning_resource_columns(pool).await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_folder_id ON documents(folder_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Adds `relevance_tag`, `difficulty` and `url` to a `learning_resources`
/// table created before those columns existed. No-op when the table is absent.
pub async fn ensure_learning_resource_columns(pool: &SqlitePool) -> Result<()> {
    let table_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='learning_resources'",
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(());
    }

    let columns: HashSet<String> =
        sqlx::query_scalar::<_, String>("SELECT name FROM pragma_table_info('learning_resources')")
            .fetch_all(pool)
            .await?
            .into_iter()
            .collect();

    let wanted = [
        ("relevance_tag", "INTEGER DEFAULT 0"),
        ("difficulty", "TEXT"),
        ("url", "TEXT"),
    ];

    for (name, decl) in wanted {
        if !columns.contains(name) {
            tracing::info!(column = name, "adding missing learning_resources column");
            sqlx::query(&format!(
                "ALTER TABLE learning_resources ADD COLUMN {} {}",
                name, decl
            ))
            .execute(pool)
            .await?;
        }
    }

    Ok(())
}
