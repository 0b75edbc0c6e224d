//! Idempotent reply generation.
//!
//! [`GenerationCache::get_or_generate`] answers from storage when the same
//! fingerprint was already generated for a thread, and otherwise calls the
//! supplied generator and stores what it returns. Concurrent callers racing on
//! the same key converge on whichever insert landed first: the unique index on
//! `(thread_id, hash_key)` is the only coordination.

use async_trait::async_trait;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::db::{InsertOutcome, Store};
use crate::domain::GenerationError;
use crate::services::fingerprint::{Fingerprint, GenerationRequest};

/// A stored reply, as read back from the cache table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachedGeneration {
    pub id: i32,
    pub thread_id: i32,
    pub fingerprint: Fingerprint,
    pub model_id: String,
    pub mode: String,
    pub content: String,
    pub created_at: String,
}

impl From<crate::entities::ai_summaries::Model> for CachedGeneration {
    fn from(row: crate::entities::ai_summaries::Model) -> Self {
        Self {
            id: row.id,
            thread_id: row.thread_id,
            fingerprint: Fingerprint::from_hex(row.hash_key),
            model_id: row.model,
            mode: row.mode,
            content: row.content,
            created_at: row.created_at,
        }
    }
}

/// Result of [`GenerationCache::get_or_generate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Generation {
    pub content: String,
    pub from_cache: bool,
}

/// Persistence the cache needs: a point lookup and a collision-aware insert.
#[async_trait]
pub trait GenerationStore: Send + Sync {
    async fn find_generation(
        &self,
        thread_id: i32,
        fingerprint: &Fingerprint,
    ) -> Result<Option<CachedGeneration>, GenerationError>;

    /// Must report a unique-key collision as [`InsertOutcome::AlreadyExists`],
    /// not as an error.
    async fn insert_generation(
        &self,
        request: &GenerationRequest,
        fingerprint: &Fingerprint,
        content: &str,
    ) -> Result<InsertOutcome, GenerationError>;
}

#[async_trait]
impl GenerationStore for Store {
    async fn find_generation(
        &self,
        thread_id: i32,
        fingerprint: &Fingerprint,
    ) -> Result<Option<CachedGeneration>, GenerationError> {
        let row = self.find_summary(thread_id, fingerprint.as_str()).await?;
        Ok(row.map(CachedGeneration::from))
    }

    async fn insert_generation(
        &self,
        request: &GenerationRequest,
        fingerprint: &Fingerprint,
        content: &str,
    ) -> Result<InsertOutcome, GenerationError> {
        let outcome = self
            .insert_summary(
                request.thread_id(),
                fingerprint.as_str(),
                request.model_id(),
                request.mode(),
                content,
            )
            .await?;
        Ok(outcome)
    }
}

#[derive(Clone)]
pub struct GenerationCache {
    store: Arc<dyn GenerationStore>,
}

impl GenerationCache {
    #[must_use]
    pub fn new(store: Arc<dyn GenerationStore>) -> Self {
        Self { store }
    }

    /// Returns the stored reply for `request` or produces and stores a new one.
    ///
    /// `generate` runs only on a miss. Its failure (or a blank reply) is
    /// returned as-is and nothing is written.
    ///
    /// # Errors
    ///
    /// Propagates the generator's [`GenerationError`]; storage failures map to
    /// [`GenerationError::Storage`].
    pub async fn get_or_generate<F, Fut>(
        &self,
        request: &GenerationRequest,
        generate: F,
    ) -> Result<Generation, GenerationError>
    where
        F: FnOnce(&GenerationRequest) -> Fut + Send,
        Fut: Future<Output = Result<String, GenerationError>> + Send,
    {
        let thread_id = request.thread_id();
        let fingerprint = request.fingerprint();

        if let Some(hit) = self.store.find_generation(thread_id, &fingerprint).await? {
            metrics::counter!("generation_cache_hits_total").increment(1);
            debug!(thread_id, fingerprint = %fingerprint, "Generation cache hit");
            return Ok(Generation {
                content: hit.content,
                from_cache: true,
            });
        }

        metrics::counter!("generation_cache_misses_total").increment(1);
        debug!(thread_id, fingerprint = %fingerprint, "Generation cache miss");

        let content = generate(request).await?;
        if content.trim().is_empty() {
            return Err(GenerationError::EmptyResponse(
                "generator produced blank text".to_string(),
            ));
        }

        match self
            .store
            .insert_generation(request, &fingerprint, &content)
            .await?
        {
            InsertOutcome::Inserted => {
                info!(thread_id, fingerprint = %fingerprint, "Stored generated reply");
                Ok(Generation {
                    content,
                    from_cache: false,
                })
            }
            InsertOutcome::AlreadyExists => {
                // Another request stored this key first; its row is authoritative.
                let winner = self
                    .store
                    .find_generation(thread_id, &fingerprint)
                    .await?
                    .ok_or_else(|| {
                        GenerationError::Storage(format!(
                            "cache row for thread {thread_id} vanished after a key collision"
                        ))
                    })?;
                warn!(thread_id, fingerprint = %fingerprint, "Lost generation race, using stored reply");
                Ok(Generation {
                    content: winner.content,
                    from_cache: false,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn store_with_thread() -> (Store, i32) {
        let store = Store::open("sqlite::memory:").await.unwrap();
        let thread_id = store.create_thread("t", None).await.unwrap();
        (store, thread_id)
    }

    fn request(thread_id: i32, seed: &str) -> GenerationRequest {
        GenerationRequest::new(
            thread_id,
            seed,
            1,
            vec!["ctx".to_string()],
            "S1",
            "m1",
            "conversation",
        )
    }

    #[tokio::test]
    async fn hit_skips_generator() {
        let (store, thread_id) = store_with_thread().await;
        let cache = GenerationCache::new(Arc::new(store.clone()));
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let req = request(thread_id, "hello");

        let first = cache
            .get_or_generate(&req, |_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("X".to_string())
            })
            .await
            .unwrap();
        let second = cache
            .get_or_generate(&req, |_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("Y".to_string())
            })
            .await
            .unwrap();

        assert_eq!(first, Generation { content: "X".into(), from_cache: false });
        assert_eq!(second, Generation { content: "X".into(), from_cache: true });
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(store.summary_count(thread_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn failure_is_not_cached() {
        let (store, thread_id) = store_with_thread().await;
        let cache = GenerationCache::new(Arc::new(store.clone()));
        let req = request(thread_id, "hello");

        let err = cache
            .get_or_generate(&req, |_| async {
                Err(GenerationError::TransientUpstream {
                    status: Some(503),
                    detail: "HTTP 503: busy".to_string(),
                })
            })
            .await
            .unwrap_err();

        assert_eq!(err.upstream_status(), Some(503));
        assert_eq!(store.summary_count(thread_id).await.unwrap(), 0);

        let retried = cache
            .get_or_generate(&req, |_| async { Ok("fresh".to_string()) })
            .await
            .unwrap();
        assert!(!retried.from_cache);
        assert_eq!(retried.content, "fresh");
    }

    #[tokio::test]
    async fn blank_output_is_rejected() {
        let (store, thread_id) = store_with_thread().await;
        let cache = GenerationCache::new(Arc::new(store.clone()));

        let err = cache
            .get_or_generate(&request(thread_id, "hello"), |_| async { Ok("  \n".to_string()) })
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::EmptyResponse(_)));
        assert_eq!(store.summary_count(thread_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn same_fingerprint_is_scoped_per_thread() {
        let (store, first_thread) = store_with_thread().await;
        let second_thread = store.create_thread("u", None).await.unwrap();
        let cache = GenerationCache::new(Arc::new(store.clone()));

        cache
            .get_or_generate(&request(first_thread, "hello"), |_| async { Ok("A".to_string()) })
            .await
            .unwrap();
        let other = cache
            .get_or_generate(&request(second_thread, "hello"), |_| async { Ok("B".to_string()) })
            .await
            .unwrap();

        assert_eq!(other.content, "B");
        assert!(!other.from_cache);
    }

    /// Store that always misses on lookup until an insert collides, to force
    /// the re-read path deterministically.
    struct CollidingStore {
        winner: CachedGeneration,
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl GenerationStore for CollidingStore {
        async fn find_generation(
            &self,
            _thread_id: i32,
            _fingerprint: &Fingerprint,
        ) -> Result<Option<CachedGeneration>, GenerationError> {
            let n = self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok((n > 0).then(|| self.winner.clone()))
        }

        async fn insert_generation(
            &self,
            _request: &GenerationRequest,
            _fingerprint: &Fingerprint,
            _content: &str,
        ) -> Result<InsertOutcome, GenerationError> {
            Ok(InsertOutcome::AlreadyExists)
        }
    }

    #[tokio::test]
    async fn collision_returns_winning_row() {
        let req = request(1, "hello");
        let store = CollidingStore {
            winner: CachedGeneration {
                id: 1,
                thread_id: 1,
                fingerprint: req.fingerprint(),
                model_id: "m1".to_string(),
                mode: "conversation".to_string(),
                content: "winner".to_string(),
                created_at: crate::db::now_timestamp(),
            },
            lookups: AtomicUsize::new(0),
        };
        let cache = GenerationCache::new(Arc::new(store));

        let result = cache
            .get_or_generate(&req, |_| async { Ok("loser".to_string()) })
            .await
            .unwrap();

        assert_eq!(result.content, "winner");
    }
}
