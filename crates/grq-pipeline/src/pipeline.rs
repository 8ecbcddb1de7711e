//! The assembled pipeline: one façade over all seven stages.
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use grq_catalog::{CatalogClient, ExecutionClient, FieldLexicon, SemanticScorer, SnapshotCache};
use grq_core::{
    ExecutionContext, PipelineConfig, PipelineRun, PipelineRunner, PipelineStage, UserContext,
};
use grq_gate::SecurityGate;

use crate::stages::{
    BuildStage, DiscoveryStage, ExecuteStage, IntentStage, MappingStage, ResponseStage,
    SecurityStage, SnapshotHandle,
};

/// Natural-language questions in, role-shaped answers out.
///
/// Holds the long-lived collaborators; per-request stage instances share
/// a lazy snapshot handle so each run sees one consistent catalog.
pub struct QueryPipeline {
    cache: Arc<SnapshotCache>,
    scorer: Arc<dyn SemanticScorer>,
    exec_client: Arc<dyn ExecutionClient>,
    gate: Arc<SecurityGate>,
    config: PipelineConfig,
}

impl QueryPipeline {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        exec_client: Arc<dyn ExecutionClient>,
        scorer: Arc<dyn SemanticScorer>,
        lexicon: FieldLexicon,
        config: PipelineConfig,
    ) -> Self {
        let cache = Arc::new(SnapshotCache::new(
            catalog,
            lexicon,
            Duration::from_secs(config.catalog_ttl_secs),
        ));
        Self {
            cache,
            scorer,
            exec_client,
            gate: Arc::new(SecurityGate::default()),
            config,
        }
    }

    /// Run one question through the full pipeline.
    pub async fn answer(&self, raw_query: &str, user: UserContext) -> PipelineRun {
        let ctx = ExecutionContext::new(self.config.clone());
        info!(trace_id = %ctx.trace_id, user = user.user_id.as_str(), "pipeline run started");

        let snapshot = Arc::new(SnapshotHandle::new(self.cache.clone()));
        let stages: Vec<Box<dyn PipelineStage>> = vec![
            Box::new(SecurityStage::new(self.gate.clone())),
            Box::new(IntentStage),
            Box::new(DiscoveryStage::new(self.scorer.clone(), snapshot.clone())),
            Box::new(MappingStage::new(self.scorer.clone(), snapshot.clone())),
            Box::new(BuildStage::new(snapshot.clone())),
            Box::new(ExecuteStage::new(self.exec_client.clone(), snapshot)),
            Box::new(ResponseStage::new()),
        ];

        PipelineRunner::new(stages).run(raw_query, user, &ctx).await
    }
}
