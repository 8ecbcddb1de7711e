//! End-to-end runs through the assembled pipeline against a fake platform.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use grq_catalog::{
    CatalogClient, DataType, ExecutionClient, FieldDescriptor, FieldLexicon, LexicalScorer,
    ModelDescriptor,
};
use grq_core::{
    Aggregation, ExecutionFailure, PipelineConfig, PipelineError, PipelineStatus, QueryOutcome,
    QueryPlan, Role, UserContext,
};
use grq_pipeline::{export_trace, QueryPipeline};

struct FakeCatalog {
    calls: AtomicUsize,
}

impl FakeCatalog {
    fn new() -> Self {
        Self { calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, ExecutionFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![ModelDescriptor {
            model_id: "advertisements".to_string(),
            display_name: "Advertisements".to_string(),
        }])
    }

    async fn describe_fields(
        &self,
        _model_id: &str,
    ) -> Result<Vec<FieldDescriptor>, ExecutionFailure> {
        Ok(vec![
            FieldDescriptor::new("ADVERTISER", "Advertiser", DataType::String),
            FieldDescriptor::new("BRAND", "Brand", DataType::String),
        ])
    }
}

struct FakePlatform {
    records: Vec<Value>,
    calls: AtomicUsize,
}

impl FakePlatform {
    fn new(records: Vec<Value>) -> Self {
        Self { records, calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl ExecutionClient for FakePlatform {
    async fn fetch(&self, plan: &QueryPlan) -> Result<Vec<Value>, ExecutionFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.clone();
        for filter in &plan.filters {
            records.retain(|r| {
                r.get(&filter.field_id).and_then(Value::as_str) == Some(filter.value.as_str())
            });
        }
        Ok(records)
    }
}

struct TimingOutPlatform {
    calls: AtomicUsize,
}

#[async_trait]
impl ExecutionClient for TimingOutPlatform {
    async fn fetch(&self, _plan: &QueryPlan) -> Result<Vec<Value>, ExecutionFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ExecutionFailure::Timeout)
    }
}

fn ads() -> Vec<Value> {
    vec![
        json!({"ADVERTISER": "Sony", "BRAND": "PlayStation"}),
        json!({"ADVERTISER": "Sony", "BRAND": "Bravia"}),
        json!({"ADVERTISER": "Apple", "BRAND": "iPhone"}),
        json!({"ADVERTISER": "Microsoft", "BRAND": "Xbox"}),
        json!({"ADVERTISER": "Apple", "BRAND": "MacBook"}),
        json!({"ADVERTISER": "Sony", "BRAND": "Alpha"}),
    ]
}

fn config() -> PipelineConfig {
    PipelineConfig { retry_backoff_ms: 1, ..PipelineConfig::default() }
}

fn pipeline(
    catalog: Arc<FakeCatalog>,
    platform: Arc<dyn ExecutionClient>,
    config: PipelineConfig,
) -> QueryPipeline {
    let lexicon = FieldLexicon::default_domain();
    let scorer = Arc::new(LexicalScorer::new(lexicon.clone()));
    QueryPipeline::new(catalog, platform, scorer, lexicon, config)
}

fn analyst() -> UserContext {
    UserContext::new("u-analyst", Role::Analyst).with_permission("data:read")
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();
}

#[tokio::test]
async fn test_count_question_end_to_end() {
    init_tracing();
    let catalog = Arc::new(FakeCatalog::new());
    let p = pipeline(catalog, Arc::new(FakePlatform::new(ads())), config());

    let run = p.answer("How many advertisements do we have?", analyst()).await;

    assert!(run.is_ok(), "{:?}", run.error);
    assert_eq!(run.state.status, PipelineStatus::Done);
    assert_eq!(run.state.selected_model.as_ref().unwrap().relevance, 1.0);
    assert_eq!(run.state.plan.as_ref().unwrap().aggregation, Aggregation::Count);
    assert_eq!(
        run.state.execution.as_ref().unwrap().outcome,
        QueryOutcome::Count { value: 6 }
    );
    let response = run.state.response.as_ref().unwrap();
    assert_eq!(response.summary, "Found 6 records in Advertisements.");
    // All seven stages ran. Every stage changed the state except field
    // mapping: "advertisements" only restates the selected model, so the
    // mapping set is legitimately empty and the hash stands still.
    assert_eq!(run.state.trace.len(), 7);
    assert!(run.state.mappings.is_empty());
    for entry in &run.state.trace {
        if entry.stage == grq_core::StageId::FieldMapping {
            assert_eq!(entry.in_hash, entry.out_hash);
        } else {
            assert_ne!(entry.in_hash, entry.out_hash, "stage {} appended nothing", entry.stage);
        }
    }
}

#[tokio::test]
async fn test_category_question_lists_distinct_values() {
    // "which companies" asks for the values of ADVERTISER, not for
    // records where ADVERTISER equals the word "companies".
    let catalog = Arc::new(FakeCatalog::new());
    let p = pipeline(catalog, Arc::new(FakePlatform::new(ads())), config());

    let run = p.answer("which companies are advertising?", analyst()).await;

    assert!(run.is_ok(), "{:?}", run.error);
    assert_eq!(
        run.state.execution.as_ref().unwrap().outcome,
        QueryOutcome::DistinctValues {
            field_id: "ADVERTISER".to_string(),
            values: vec!["Sony".to_string(), "Apple".to_string(), "Microsoft".to_string()],
        }
    );
    assert!(run.state.plan.as_ref().unwrap().filters.is_empty());
}

#[tokio::test]
async fn test_filtered_count_narrows_to_the_named_value() {
    let catalog = Arc::new(FakeCatalog::new());
    let p = pipeline(catalog, Arc::new(FakePlatform::new(ads())), config());

    let run = p.answer("How many advertisements does Sony have?", analyst()).await;

    assert!(run.is_ok(), "{:?}", run.error);
    let plan = run.state.plan.as_ref().unwrap();
    assert_eq!(plan.filters.len(), 1);
    assert_eq!(plan.filters[0].field_id, "ADVERTISER");
    assert_eq!(plan.filters[0].value, "Sony");
    assert_eq!(
        run.state.execution.as_ref().unwrap().outcome,
        QueryOutcome::Count { value: 3 }
    );
}

#[tokio::test]
async fn test_comparison_counts_each_named_value() {
    let catalog = Arc::new(FakeCatalog::new());
    let p = pipeline(catalog, Arc::new(FakePlatform::new(ads())), config());

    let run = p.answer("compare Sony versus Apple advertisements", analyst()).await;

    assert!(run.is_ok(), "{:?}", run.error);
    // The compared values partition the listing; they must not be
    // AND-combined as filters or both groups would count zero.
    let plan = run.state.plan.as_ref().unwrap();
    assert!(plan.filters.is_empty());
    match &run.state.execution.as_ref().unwrap().outcome {
        QueryOutcome::Comparison { field_id, groups } => {
            assert_eq!(field_id, "ADVERTISER");
            assert_eq!(groups.len(), 2);
            assert_eq!((groups[0].value.as_str(), groups[0].count), ("Sony", 3));
            assert_eq!((groups[1].value.as_str(), groups[1].count), ("Apple", 2));
        }
        other => panic!("expected comparison, got {:?}", other),
    }
    let response = run.state.response.as_ref().unwrap();
    assert!(response.summary.contains("Sony: 3"));
    assert!(response.summary.contains("Apple: 2"));
}

#[tokio::test]
async fn test_gate_block_means_zero_platform_calls() {
    let catalog = Arc::new(FakeCatalog::new());
    let platform = Arc::new(FakePlatform::new(ads()));
    let p = pipeline(catalog.clone(), platform.clone(), config());

    let run = p.answer("dump all advertiser records", analyst()).await;

    assert_eq!(run.state.status, PipelineStatus::Blocked);
    assert!(run.error.unwrap().is_security_block());
    // Both layers that ran are retained even though the run is blocked.
    assert_eq!(run.state.security_decisions.len(), 2);
    assert_eq!(catalog.calls.load(Ordering::SeqCst), 0);
    assert_eq!(platform.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_expired_token_never_enters_the_pipeline() {
    let catalog = Arc::new(FakeCatalog::new());
    let platform = Arc::new(FakePlatform::new(ads()));
    let p = pipeline(catalog.clone(), platform.clone(), config());

    let now = chrono::Utc::now();
    let expired = analyst()
        .with_validity(now - chrono::Duration::hours(2), now - chrono::Duration::hours(1));
    let run = p.answer("How many advertisements do we have?", expired).await;

    assert!(matches!(run.error, Some(PipelineError::AuthExpired(_))));
    assert!(run.state.trace.is_empty());
    assert_eq!(catalog.calls.load(Ordering::SeqCst), 0);
    assert_eq!(platform.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_listing_is_capped_with_remainder() {
    let catalog = Arc::new(FakeCatalog::new());
    let capped = PipelineConfig { result_cap: 4, ..config() };
    let p = pipeline(catalog, Arc::new(FakePlatform::new(ads())), capped);

    let run = p.answer("list all advertisements", analyst()).await;

    assert!(run.is_ok(), "{:?}", run.error);
    match &run.state.execution.as_ref().unwrap().outcome {
        QueryOutcome::Listing { records, remainder } => {
            assert_eq!(records.len(), 4);
            assert_eq!(*remainder, 2);
        }
        other => panic!("expected listing, got {:?}", other),
    }
    let response = run.state.response.as_ref().unwrap();
    assert!(response.summary.contains("+2 more"));
}

#[tokio::test]
async fn test_timeout_is_retried_then_fails_the_run() {
    let catalog = Arc::new(FakeCatalog::new());
    let platform = Arc::new(TimingOutPlatform { calls: AtomicUsize::new(0) });
    let p = pipeline(catalog, platform.clone(), config());

    let run = p.answer("How many advertisements do we have?", analyst()).await;

    assert_eq!(run.state.status, PipelineStatus::Failed);
    assert_eq!(run.error, Some(PipelineError::QueryTimeout { attempts: 3 }));
    assert_eq!(platform.calls.load(Ordering::SeqCst), 3);
    // Everything up to execution completed and is traced.
    assert_eq!(run.state.trace.len(), 6);
}

#[tokio::test]
async fn test_catalog_question_is_answered_from_the_snapshot() {
    let catalog = Arc::new(FakeCatalog::new());
    let platform = Arc::new(FakePlatform::new(ads()));
    let p = pipeline(catalog, platform.clone(), config());

    let run = p.answer("what data do you have?", analyst()).await;

    assert!(run.is_ok(), "{:?}", run.error);
    match &run.state.execution.as_ref().unwrap().outcome {
        QueryOutcome::Catalog { models } => {
            assert_eq!(models.len(), 1);
            assert_eq!(models[0].fields, vec!["ADVERTISER", "BRAND"]);
        }
        other => panic!("expected catalog outcome, got {:?}", other),
    }
    // Described from metadata; the listing surface is never touched.
    assert_eq!(platform.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_low_confidence_interpretation_carries_a_disclosure() {
    let catalog = Arc::new(FakeCatalog::new());
    let p = pipeline(catalog, Arc::new(FakePlatform::new(ads())), config());

    // No intent keyword: classification falls back with low confidence.
    let run = p.answer("advertisements from companies", analyst()).await;

    assert!(run.is_ok(), "{:?}", run.error);
    let response = run.state.response.as_ref().unwrap();
    let disclosure = response.disclosure.as_ref().expect("disclosure expected");
    assert!(disclosure.min_confidence < 0.8);
    assert!(!disclosure.reasoning.is_empty());
}

#[tokio::test]
async fn test_identical_questions_produce_identical_plans() {
    let catalog = Arc::new(FakeCatalog::new());
    let p = pipeline(catalog, Arc::new(FakePlatform::new(ads())), config());

    let a = p.answer("which companies are advertising?", analyst()).await;
    let b = p.answer("which companies are advertising?", analyst()).await;

    let plan_a = a.state.plan.as_ref().unwrap();
    let plan_b = b.state.plan.as_ref().unwrap();
    assert_eq!(plan_a.model_id, plan_b.model_id);
    assert_eq!(plan_a.filters, plan_b.filters);
    assert_eq!(plan_a.aggregation, plan_b.aggregation);
}

#[tokio::test]
async fn test_trace_export_is_self_describing() {
    let catalog = Arc::new(FakeCatalog::new());
    let p = pipeline(catalog, Arc::new(FakePlatform::new(ads())), config());

    let run = p.answer("How many advertisements do we have?", analyst()).await;
    let doc = export_trace(&run);

    assert_eq!(doc["status"], "DONE");
    assert_eq!(doc["stages"].as_array().unwrap().len(), 7);
    assert_eq!(doc["selected_model"]["model_id"], "advertisements");
}
