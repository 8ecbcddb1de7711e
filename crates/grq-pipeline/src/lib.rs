//! GRQ Pipeline: the assembled query intelligence pipeline.
//!
//! Wires the security gate, intent analysis, model discovery, field
//! mapping, query construction, execution and response synthesis into
//! one runner behind [`QueryPipeline`].
//!
//! # Example
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use grq_catalog::{CatalogClient, ExecutionClient, FieldLexicon, LexicalScorer};
//! # use grq_core::{PipelineConfig, Role, UserContext};
//! # use grq_pipeline::QueryPipeline;
//! # async fn example(catalog: Arc<dyn CatalogClient>, platform: Arc<dyn ExecutionClient>) {
//! let lexicon = FieldLexicon::default_domain();
//! let scorer = Arc::new(LexicalScorer::new(lexicon.clone()));
//! let pipeline = QueryPipeline::new(catalog, platform, scorer, lexicon, PipelineConfig::default());
//!
//! let user = UserContext::new("u-7", Role::Analyst).with_permission("data:read");
//! let run = pipeline.answer("which companies are advertising?", user).await;
//! if let Some(response) = &run.state.response {
//!     println!("{}", response.summary);
//! }
//! # }
//! ```

pub mod pipeline;
pub mod stages;
pub mod trace;

pub use pipeline::QueryPipeline;
pub use trace::export_trace;
