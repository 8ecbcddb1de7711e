//! Read-mostly catalog snapshot cache with a time-to-live.
//!
//! Refresh is single-writer: a new snapshot is built off to the side and
//! swapped in whole, so concurrent readers observe either the pre- or
//! post-refresh catalog, never a partially updated one.
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use grq_core::PipelineError;

use crate::client::CatalogClient;
use crate::lexicon::FieldLexicon;
use crate::types::CatalogSnapshot;

struct CachedSnapshot {
    fetched_at: Instant,
    snapshot: Arc<CatalogSnapshot>,
}

pub struct SnapshotCache {
    client: Arc<dyn CatalogClient>,
    lexicon: FieldLexicon,
    ttl: Duration,
    slot: RwLock<Option<CachedSnapshot>>,
}

impl SnapshotCache {
    pub fn new(client: Arc<dyn CatalogClient>, lexicon: FieldLexicon, ttl: Duration) -> Self {
        Self {
            client,
            lexicon,
            ttl,
            slot: RwLock::new(None),
        }
    }

    /// Current snapshot, refreshed if the TTL has lapsed.
    pub async fn snapshot(&self) -> Result<Arc<CatalogSnapshot>, PipelineError> {
        {
            let slot = self.slot.read().await;
            if let Some(cached) = slot.as_ref() {
                if cached.fetched_at.elapsed() < self.ttl {
                    debug!("catalog snapshot served from cache");
                    return Ok(cached.snapshot.clone());
                }
            }
        }

        let mut slot = self.slot.write().await;
        // Another writer may have refreshed while we waited for the lock.
        if let Some(cached) = slot.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                return Ok(cached.snapshot.clone());
            }
        }

        let snapshot = Arc::new(self.build().await?);
        info!(
            models = snapshot.models.len(),
            "catalog snapshot refreshed"
        );
        *slot = Some(CachedSnapshot {
            fetched_at: Instant::now(),
            snapshot: snapshot.clone(),
        });
        Ok(snapshot)
    }

    async fn build(&self) -> Result<CatalogSnapshot, PipelineError> {
        let models = self.client.list_models().await.map_err(PipelineError::from)?;
        let mut fields = std::collections::HashMap::new();
        for model in &models {
            let mut described = self
                .client
                .describe_fields(&model.model_id)
                .await
                .map_err(PipelineError::from)?;
            // Fold configured synonyms into each descriptor so downstream
            // classification only ever consults the snapshot.
            for field in &mut described {
                for term in self.lexicon.terms_for(&field.field_id) {
                    if !field.synonyms.contains(term) {
                        field.synonyms.push(term.clone());
                    }
                }
            }
            fields.insert(model.model_id.clone(), described);
        }
        Ok(CatalogSnapshot {
            fetched_at: Utc::now(),
            models,
            fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, FieldDescriptor, ModelDescriptor};
    use async_trait::async_trait;
    use grq_core::ExecutionFailure;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeCatalog {
        list_calls: AtomicUsize,
    }

    #[async_trait]
    impl CatalogClient for FakeCatalog {
        async fn list_models(&self) -> Result<Vec<ModelDescriptor>, ExecutionFailure> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![ModelDescriptor {
                model_id: "advertisements".to_string(),
                display_name: "Advertisements".to_string(),
            }])
        }

        async fn describe_fields(
            &self,
            _model_id: &str,
        ) -> Result<Vec<FieldDescriptor>, ExecutionFailure> {
            Ok(vec![FieldDescriptor::new("ADVERTISER", "Advertiser", DataType::String)])
        }
    }

    #[tokio::test]
    async fn test_snapshot_served_from_cache_within_ttl() {
        let client = Arc::new(FakeCatalog { list_calls: AtomicUsize::new(0) });
        let cache = SnapshotCache::new(
            client.clone(),
            FieldLexicon::default_domain(),
            Duration::from_secs(60),
        );

        let first = cache.snapshot().await.unwrap();
        let second = cache.snapshot().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(client.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_ttl_triggers_refresh() {
        let client = Arc::new(FakeCatalog { list_calls: AtomicUsize::new(0) });
        let cache = SnapshotCache::new(
            client.clone(),
            FieldLexicon::default_domain(),
            Duration::from_millis(0),
        );

        cache.snapshot().await.unwrap();
        cache.snapshot().await.unwrap();
        assert_eq!(client.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_lexicon_folded_into_snapshot_fields() {
        let client = Arc::new(FakeCatalog { list_calls: AtomicUsize::new(0) });
        let cache = SnapshotCache::new(
            client,
            FieldLexicon::default_domain(),
            Duration::from_secs(60),
        );

        let snapshot = cache.snapshot().await.unwrap();
        let field = &snapshot.fields_of("advertisements")[0];
        assert!(field.synonyms.iter().any(|s| s == "companies"));
    }
}
