//! The learning-resource catalog.
//!
//! The chat path only ever reads the catalog, through the [`ResourceStore`]
//! trait. [`SqliteResourceStore`] is the production backend;
//! [`MemoryResourceStore`] serves tests and offline use.
//!
//! Rows are normalized on the way out: NULL `topic`/`content` become empty
//! strings, NULL or negative `relevance_tag` becomes 0, and empty
//! `difficulty`/`url` become `None`.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;
use crate::models::LearningResource;
use crate::rank::rank;
use crate::reply::format_label;

/// Read access to the full resource catalog.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Every resource, in a stable order (ties in ranking keep this order).
    async fn list_resources(&self) -> Result<Vec<LearningResource>>;
}

// ============ SQLite ============

pub struct SqliteResourceStore {
    pool: SqlitePool,
}

impl SqliteResourceStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResourceStore for SqliteResourceStore {
    async fn list_resources(&self) -> Result<Vec<LearningResource>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, topic, content, relevance_tag, difficulty, url
            FROM learning_resources
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let tag: Option<i64> = row.get("relevance_tag");
                LearningResource {
                    id: row.get("id"),
                    title: row.get::<Option<String>, _>("title").unwrap_or_default(),
                    topic: row.get::<Option<String>, _>("topic").unwrap_or_default(),
                    content: row.get::<Option<String>, _>("content").unwrap_or_default(),
                    relevance_tag: clamp_tag(tag),
                    difficulty: non_empty(row.get("difficulty")),
                    url: non_empty(row.get("url")),
                }
            })
            .collect())
    }
}

fn clamp_tag(tag: Option<i64>) -> u32 {
    let tag = tag.unwrap_or(0).max(0);
    u32::try_from(tag).unwrap_or(u32::MAX)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

// ============ In-memory ============

/// A fixed catalog held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryResourceStore {
    resources: Vec<LearningResource>,
}

impl MemoryResourceStore {
    pub fn new(resources: Vec<LearningResource>) -> Self {
        Self { resources }
    }
}

#[async_trait]
impl ResourceStore for MemoryResourceStore {
    async fn list_resources(&self) -> Result<Vec<LearningResource>> {
        Ok(self.resources.clone())
    }
}

// ============ Writes ============

/// Fields for a new catalog row.
#[derive(Debug, Clone)]
pub struct NewResource {
    pub title: String,
    pub topic: Option<String>,
    pub content: Option<String>,
    pub relevance_tag: u32,
    pub difficulty: Option<String>,
    pub url: Option<String>,
}

pub async fn insert_resource(pool: &SqlitePool, resource: &NewResource) -> Result<i64> {
    if resource.title.trim().is_empty() {
        anyhow::bail!("resource title must not be empty");
    }

    let result = sqlx::query(
        r#"
        INSERT INTO learning_resources (title, topic, content, relevance_tag, difficulty, url)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&resource.title)
    .bind(&resource.topic)
    .bind(&resource.content)
    .bind(i64::from(resource.relevance_tag))
    .bind(&resource.difficulty)
    .bind(&resource.url)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

fn sample_resources() -> Vec<NewResource> {
    vec![
        NewResource {
            title: "Binary Search Tutorial".to_string(),
            topic: Some("binary search".to_string()),
            content: Some("...".to_string()),
            relevance_tag: 2,
            difficulty: Some("beginner".to_string()),
            url: Some("https://example.com/binary-search".to_string()),
        },
        NewResource {
            title: "Pointer Introduction".to_string(),
            topic: Some("pointers".to_string()),
            content: Some("...".to_string()),
            relevance_tag: 1,
            difficulty: Some("intermediate".to_string()),
            url: Some("https://example.com/pointers".to_string()),
        },
    ]
}

/// Inserts the sample resources into an empty catalog.
///
/// Returns the number of rows inserted (zero if the catalog already has rows).
pub async fn seed_sample_resources(pool: &SqlitePool) -> Result<usize> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM learning_resources")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        return Ok(0);
    }

    let samples = sample_resources();
    for resource in &samples {
        insert_resource(pool, resource).await?;
    }
    Ok(samples.len())
}

// ============ CLI ============

/// CLI entry point for `expertagent seed`.
pub async fn run_seed(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let inserted = seed_sample_resources(&pool).await?;
    pool.close().await;

    if inserted == 0 {
        println!("Catalog already populated; nothing seeded.");
    } else {
        println!("Seeded {} learning resources.", inserted);
    }
    Ok(())
}

/// CLI entry point for `expertagent resources`.
pub async fn run_list(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let resources = SqliteResourceStore::new(pool.clone()).list_resources().await?;
    pool.close().await;

    if resources.is_empty() {
        println!("No resources.");
        return Ok(());
    }

    println!("{:<6} {:<6} {:<24} TITLE", "ID", "TAG", "TOPIC");
    for r in &resources {
        println!(
            "{:<6} {:<6} {:<24} {}",
            r.id,
            r.relevance_tag,
            r.topic,
            format_label(r)
        );
    }
    Ok(())
}

/// CLI entry point for `expertagent rank`: ranks the stored catalog against
/// the given keywords without calling the completion service.
pub async fn run_rank(config: &Config, keywords: &[String], limit: Option<usize>) -> Result<()> {
    let pool = db::connect(config).await?;
    let resources = SqliteResourceStore::new(pool.clone()).list_resources().await?;
    pool.close().await;

    let ranked = rank(&resources, keywords);
    let limit = limit.unwrap_or(config.chat.resource_limit);

    if ranked.is_empty() {
        println!("No resources.");
        return Ok(());
    }

    for (i, scored) in ranked.iter().take(limit).enumerate() {
        println!("{}. [{}] {}", i + 1, scored.score, format_label(scored.resource));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_tag() {
        assert_eq!(clamp_tag(None), 0);
        assert_eq!(clamp_tag(Some(-4)), 0);
        assert_eq!(clamp_tag(Some(7)), 7);
        assert_eq!(clamp_tag(Some(i64::MAX)), u32::MAX);
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(None), None);
        assert_eq!(non_empty(Some(String::new())), None);
        assert_eq!(non_empty(Some(" ".to_string())).as_deref(), Some(" "));
        assert_eq!(non_empty(Some("beginner".to_string())).as_deref(), Some("beginner"));
    }

    #[tokio::test]
    async fn test_memory_store_returns_catalog() {
        let store = MemoryResourceStore::new(vec![LearningResource::new(1, "A", "a", "")]);
        let listed = store.list_resources().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "A");
    }
}
