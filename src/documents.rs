//! Document folders and documents.
//!
//! Documents are stored inline as base64 data URLs. On every write the
//! payload is decoded to validate it and to derive `size_bytes` and a
//! SHA-256 digest; the original data URL is kept verbatim.

use anyhow::{bail, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{DocumentResponse, FolderResponse};

/// Metadata derived from a decoded data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrlInfo {
    pub mime_type: String,
    pub size_bytes: i64,
    pub sha256: String,
}

/// Parses `data:<mime>[;param=value...];base64,<payload>`.
///
/// A missing media type defaults to `text/plain`, as in RFC 2397. Only
/// base64-encoded payloads are accepted.
pub fn parse_data_url(data_url: &str) -> Result<DataUrlInfo> {
    let rest = match data_url.strip_prefix("data:") {
        Some(rest) => rest,
        None => bail!("invalid data URL: missing 'data:' prefix"),
    };

    let (header, payload) = match rest.split_once(',') {
        Some(parts) => parts,
        None => bail!("invalid data URL: missing ',' separator"),
    };

    let mut params = header.split(';');
    let mime_type = params.next().unwrap_or_default().trim();
    if !params.any(|p| p.eq_ignore_ascii_case("base64")) {
        bail!("invalid data URL: payload must be base64-encoded");
    }

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| anyhow::anyhow!("invalid data URL payload: {}", e))?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);

    Ok(DataUrlInfo {
        mime_type: if mime_type.is_empty() {
            "text/plain".to_string()
        } else {
            mime_type.to_ascii_lowercase()
        },
        size_bytes: bytes.len() as i64,
        sha256: format!("{:x}", hasher.finalize()),
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewFolder {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDocument {
    pub name: String,
    pub data_url: String,
}

/// Partial document update; absent fields are left as they are.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub data_url: Option<String>,
}

fn require_name(name: &str, what: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        bail!("{} name must not be empty", what);
    }
    Ok(name.to_string())
}

fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> DocumentResponse {
    DocumentResponse {
        id: row.get("id"),
        folder_id: row.get("folder_id"),
        name: row.get("name"),
        mime_type: row.get("mime_type"),
        size_bytes: row.get("size_bytes"),
        sha256: row.get("sha256"),
        data_url: row.get("data_url"),
        created_at: format_ts_iso(row.get("created_at")),
        updated_at: format_ts_iso(row.get("updated_at")),
    }
}

const DOCUMENT_COLUMNS: &str =
    "id, folder_id, name, mime_type, size_bytes, sha256, data_url, created_at, updated_at";

// ============ Folders ============

/// All folders ordered by name, each with its documents ordered by name.
pub async fn list_folders(pool: &SqlitePool) -> Result<Vec<FolderResponse>> {
    let folder_rows = sqlx::query(
        "SELECT id, name, created_at, updated_at FROM document_folders ORDER BY name ASC, id ASC",
    )
    .fetch_all(pool)
    .await?;

    let doc_rows = sqlx::query(&format!(
        "SELECT {} FROM documents ORDER BY name ASC, id ASC",
        DOCUMENT_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    let mut by_folder: HashMap<String, Vec<DocumentResponse>> = HashMap::new();
    for row in &doc_rows {
        let doc = row_to_document(row);
        by_folder.entry(doc.folder_id.clone()).or_default().push(doc);
    }

    Ok(folder_rows
        .iter()
        .map(|row| {
            let id: String = row.get("id");
            let documents = by_folder.remove(&id).unwrap_or_default();
            FolderResponse {
                id,
                name: row.get("name"),
                created_at: format_ts_iso(row.get("created_at")),
                updated_at: format_ts_iso(row.get("updated_at")),
                documents,
            }
        })
        .collect())
}

pub async fn get_folder(pool: &SqlitePool, id: &str) -> Result<FolderResponse> {
    let row = sqlx::query("SELECT id, name, created_at, updated_at FROM document_folders WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    let row = match row {
        Some(row) => row,
        None => bail!("folder not found: {}", id),
    };

    let doc_rows = sqlx::query(&format!(
        "SELECT {} FROM documents WHERE folder_id = ? ORDER BY name ASC, id ASC",
        DOCUMENT_COLUMNS
    ))
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(FolderResponse {
        id: row.get("id"),
        name: row.get("name"),
        created_at: format_ts_iso(row.get("created_at")),
        updated_at: format_ts_iso(row.get("updated_at")),
        documents: doc_rows.iter().map(row_to_document).collect(),
    })
}

pub async fn create_folder(pool: &SqlitePool, folder: &NewFolder) -> Result<FolderResponse> {
    let name = require_name(&folder.name, "folder")?;
    let id = Uuid::new_v4().to_string();
    let now = now_ts();

    sqlx::query(
        "INSERT INTO document_folders (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&name)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    get_folder(pool, &id).await
}

pub async fn rename_folder(pool: &SqlitePool, id: &str, folder: &NewFolder) -> Result<FolderResponse> {
    let name = require_name(&folder.name, "folder")?;

    let result = sqlx::query("UPDATE document_folders SET name = ?, updated_at = ? WHERE id = ?")
        .bind(&name)
        .bind(now_ts())
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        bail!("folder not found: {}", id);
    }

    get_folder(pool, id).await
}

/// Deletes a folder and every document in it.
pub async fn delete_folder(pool: &SqlitePool, id: &str) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM documents WHERE folder_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM document_folders WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        bail!("folder not found: {}", id);
    }

    tx.commit().await?;
    Ok(())
}

// ============ Documents ============

async fn folder_exists(conn: &mut SqliteConnection, id: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM document_folders WHERE id = ?")
        .bind(id)
        .fetch_one(conn)
        .await?;
    Ok(exists)
}

async fn fetch_document(conn: &mut SqliteConnection, id: &str) -> Result<DocumentResponse> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM documents WHERE id = ?",
        DOCUMENT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    match row {
        Some(row) => Ok(row_to_document(&row)),
        None => bail!("document not found: {}", id),
    }
}

pub async fn get_document(pool: &SqlitePool, id: &str) -> Result<DocumentResponse> {
    let mut conn = pool.acquire().await?;
    fetch_document(&mut conn, id).await
}

pub async fn create_document(
    pool: &SqlitePool,
    folder_id: &str,
    doc: &NewDocument,
) -> Result<DocumentResponse> {
    let name = require_name(&doc.name, "document")?;
    let info = parse_data_url(&doc.data_url)?;

    let mut tx = pool.begin().await?;

    if !folder_exists(&mut tx, folder_id).await? {
        bail!("folder not found: {}", folder_id);
    }

    let id = Uuid::new_v4().to_string();
    let now = now_ts();

    sqlx::query(
        r#"
        INSERT INTO documents (id, folder_id, name, mime_type, size_bytes, sha256, data_url, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(folder_id)
    .bind(&name)
    .bind(&info.mime_type)
    .bind(info.size_bytes)
    .bind(&info.sha256)
    .bind(&doc.data_url)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let created = fetch_document(&mut tx, &id).await?;
    tx.commit().await?;
    Ok(created)
}

/// Applies a partial update. Moving to another folder requires that
/// folder to exist; a new data URL refreshes the derived metadata.
///
/// The read, the folder check and the write share one transaction, so a
/// folder deleted concurrently surfaces as "folder not found".
pub async fn update_document(
    pool: &SqlitePool,
    id: &str,
    update: &DocumentUpdate,
) -> Result<DocumentResponse> {
    let mut tx = pool.begin().await?;
    let current = fetch_document(&mut tx, id).await?;

    let name = match &update.name {
        Some(name) => require_name(name, "document")?,
        None => current.name,
    };

    let folder_id = match &update.folder_id {
        Some(folder_id) => {
            if !folder_exists(&mut tx, folder_id).await? {
                bail!("folder not found: {}", folder_id);
            }
            folder_id.clone()
        }
        None => current.folder_id,
    };

    let (data_url, info) = match &update.data_url {
        Some(data_url) => (data_url.clone(), parse_data_url(data_url)?),
        None => (
            current.data_url,
            DataUrlInfo {
                mime_type: current.mime_type,
                size_bytes: current.size_bytes,
                sha256: current.sha256,
            },
        ),
    };

    sqlx::query(
        r#"
        UPDATE documents
        SET folder_id = ?, name = ?, mime_type = ?, size_bytes = ?, sha256 = ?, data_url = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&folder_id)
    .bind(&name)
    .bind(&info.mime_type)
    .bind(info.size_bytes)
    .bind(&info.sha256)
    .bind(&data_url)
    .bind(now_ts())
    .bind(id)
    .execute(&mut *tx)
    .await?;

    let updated = fetch_document(&mut tx, id).await?;
    tx.commit().await?;
    Ok(updated)
}

pub async fn delete_document(pool: &SqlitePool, id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM documents WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        bail!("document not found: {}", id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_data_url() {
        // "hello" in base64
        let info = parse_data_url("data:text/plain;base64,aGVsbG8=").unwrap();
        assert_eq!(info.mime_type, "text/plain");
        assert_eq!(info.size_bytes, 5);
        assert_eq!(
            info.sha256,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_parse_with_params_and_default_mime() {
        let info = parse_data_url("data:Application/PDF;name=notes.pdf;base64,AAEC").unwrap();
        assert_eq!(info.mime_type, "application/pdf");
        assert_eq!(info.size_bytes, 3);

        let info = parse_data_url("data:;base64,AA==").unwrap();
        assert_eq!(info.mime_type, "text/plain");
        assert_eq!(info.size_bytes, 1);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_data_url("https://example.com/file.pdf").is_err());
        assert!(parse_data_url("data:text/plain;base64").is_err());
        assert!(parse_data_url("data:text/plain,hello").is_err());
        assert!(parse_data_url("data:text/plain;base64,@@@").is_err());
    }

    #[test]
    fn test_errors_are_classifiable() {
        let err = parse_data_url("nope").unwrap_err();
        assert!(err.to_string().contains("invalid"));
        let err = require_name("   ", "folder").unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn test_format_ts_iso() {
        assert_eq!(format_ts_iso(0), "1970-01-01T00:00:00Z");
    }
}
