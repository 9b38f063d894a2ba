//! Chat orchestration: completion → trigger detection → ranking → reply.
//!
//! ```text
//! message ──▶ CompletionService ──▶ trigger::detect
//!                                        │ keywords?
//!                           none ◀───────┴───────▶ ResourceStore
//!                             │                        │
//!                         raw reply            rank ▶ reply::assemble
//! ```
//!
//! The completion call and the catalog read are the only awaited steps.
//! Failures from either are returned as-is; nothing is retried and no
//! partial reply is produced.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;

use crate::catalog::{ResourceStore, SqliteResourceStore};
use crate::completion::{create_service, default_system_prompt, CompletionError, CompletionService};
use crate::config::Config;
use crate::db;
use crate::rank::rank;
use crate::reply::{assemble, visible_reply};
use crate::trigger;

/// Request body accepted at the HTTP boundary.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Accepted for compatibility; not used to build context.
    #[serde(default, alias = "sessionId")]
    pub session_id: Option<String>,
}

/// Reply text plus the labels of the resources attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub resources_used: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error("resource catalog unavailable: {0}")]
    CatalogUnavailable(anyhow::Error),
}

pub struct ChatOrchestrator {
    completion: Arc<dyn CompletionService>,
    resources: Arc<dyn ResourceStore>,
    system_prompt: String,
    resource_limit: usize,
}

impl ChatOrchestrator {
    /// Orchestrator with the built-in system prompt and a limit of 3.
    pub fn new(completion: Arc<dyn CompletionService>, resources: Arc<dyn ResourceStore>) -> Self {
        Self {
            completion,
            resources,
            system_prompt: default_system_prompt(),
            resource_limit: 3,
        }
    }

    /// The configured completion service over the SQLite catalog.
    pub fn from_config(config: &Config, pool: SqlitePool) -> anyhow::Result<Self> {
        let completion = create_service(&config.completion)?;
        let resources = SqliteResourceStore::new(pool);

        let mut chat = Self::new(Arc::from(completion), Arc::new(resources))
            .with_resource_limit(config.chat.resource_limit);
        if let Some(prompt) = &config.completion.system_prompt {
            chat = chat.with_system_prompt(prompt.clone());
        }
        Ok(chat)
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_resource_limit(mut self, limit: usize) -> Self {
        self.resource_limit = limit;
        self
    }

    /// Model identifier of the underlying completion service.
    pub fn model_name(&self) -> &str {
        self.completion.model_name()
    }

    /// Handles one student message.
    ///
    /// - No marker: the raw completion text comes back untouched.
    /// - Marker with no keywords: the marker segment is stripped and no
    ///   resources are attached; the catalog is not read.
    /// - Marker with keywords: the catalog is ranked and the top
    ///   `resource_limit` labels are attached.
    pub async fn handle(&self, user_message: &str) -> Result<ChatResponse, ChatError> {
        let raw = self
            .completion
            .complete(&self.system_prompt, user_message)
            .await?;

        let keywords = trigger::detect(&raw);
        if keywords.is_empty() {
            let reply = if trigger::has_marker(&raw) {
                tracing::debug!("resource marker present without keywords");
                visible_reply(&raw)
            } else {
                raw
            };
            return Ok(ChatResponse {
                reply,
                resources_used: Vec::new(),
            });
        }

        tracing::debug!(?keywords, "resource request detected");

        let catalog = self
            .resources
            .list_resources()
            .await
            .map_err(ChatError::CatalogUnavailable)?;

        let ranked = rank(&catalog, &keywords);
        let assembled = assemble(&raw, &ranked, self.resource_limit);

        tracing::info!(
            keywords = keywords.len(),
            catalog = catalog.len(),
            attached = assembled.resources_used.len(),
            "attached learning resources"
        );

        Ok(ChatResponse {
            reply: assembled.reply,
            resources_used: assembled.resources_used,
        })
    }
}

/// CLI entry point for `expertagent chat`: runs one turn and prints the
/// reply followed by any attached resources.
pub async fn run_chat(config: &Config, message: &str) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    let chat = ChatOrchestrator::from_config(config, pool.clone())?;
    let result = chat.handle(message).await;
    pool.close().await;

    let response = result?;
    println!("{}", response.reply);
    if !response.resources_used.is_empty() {
        println!();
        println!("Resources:");
        for label in &response.resources_used {
            println!("  - {}", label);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryResourceStore;
    use crate::models::LearningResource;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedCompletion(&'static str);

    #[async_trait]
    impl CompletionService for FixedCompletion {
        fn model_name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, _system: &str, _user: &str) -> Result<String, CompletionError> {
            Ok(self.0.to_string())
        }
    }

    /// Counts catalog reads so tests can assert the store was skipped.
    #[derive(Default)]
    struct CountingStore {
        reads: AtomicUsize,
    }

    #[async_trait]
    impl ResourceStore for CountingStore {
        async fn list_resources(&self) -> anyhow::Result<Vec<LearningResource>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(vec![LearningResource::new(1, "Arrays 101", "arrays", "")])
        }
    }

    fn orchestrator(reply: &'static str, store: Arc<dyn ResourceStore>) -> ChatOrchestrator {
        ChatOrchestrator::new(Arc::new(FixedCompletion(reply)), store)
    }

    #[test]
    fn test_model_name_comes_from_service() {
        let chat = orchestrator("", Arc::new(CountingStore::default()));
        assert_eq!(chat.model_name(), "fixed");
    }

    #[tokio::test]
    async fn test_no_marker_skips_catalog() {
        let store = Arc::new(CountingStore::default());
        let chat = orchestrator("  Plain answer.  ", store.clone());
        let resp = chat.handle("hi").await.unwrap();
        assert_eq!(resp.reply, "  Plain answer.  ");
        assert!(resp.resources_used.is_empty());
        assert_eq!(store.reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_keyword_tail_strips_marker() {
        let store = Arc::new(CountingStore::default());
        let chat = orchestrator("Answer.\nRESOURCE_REQUESTED:   ", store.clone());
        let resp = chat.handle("hi").await.unwrap();
        assert_eq!(resp.reply, "Answer.");
        assert!(resp.resources_used.is_empty());
        assert_eq!(store.reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_keywords_attach_resources() {
        let store = Arc::new(CountingStore::default());
        let chat = orchestrator("Look here.\nRESOURCE_REQUESTED: arrays", store.clone());
        let resp = chat.handle("hi").await.unwrap();
        assert_eq!(resp.reply, "Look here.");
        assert_eq!(resp.resources_used, vec!["Arrays 101"]);
        assert_eq!(store.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resource_limit_is_applied() {
        let catalog: Vec<LearningResource> = (1..=5)
            .map(|i| LearningResource::new(i, format!("R{}", i), "sorting", ""))
            .collect();
        let chat = orchestrator(
            "Sorting!\nRESOURCE_REQUESTED: sorting",
            Arc::new(MemoryResourceStore::new(catalog)),
        )
        .with_resource_limit(2);
        let resp = chat.handle("sort?").await.unwrap();
        assert_eq!(resp.resources_used, vec!["R1", "R2"]);
    }

    #[test]
    fn test_request_accepts_both_session_spellings() {
        let a: ChatRequest =
            serde_json::from_str(r#"{"message":"hi","session_id":"s1"}"#).unwrap();
        let b: ChatRequest = serde_json::from_str(r#"{"message":"hi","sessionId":"s2"}"#).unwrap();
        let c: ChatRequest = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert_eq!(a.session_id.as_deref(), Some("s1"));
        assert_eq!(b.session_id.as_deref(), Some("s2"));
        assert!(c.session_id.is_none());
    }
}
