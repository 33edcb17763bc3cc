// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod api;
pub mod batch;
pub mod classifier;
pub mod config;
pub mod error;
pub mod lexicon;
pub mod metrics;
pub mod normalize;
pub mod policy;
pub mod scorer;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::{render_summary, BatchStatistics};
pub use crate::api::router;
pub use crate::batch::{classify_batch, classify_batch_parallel, BatchReport, BatchSource};
pub use crate::classifier::{
    classify_with, ClassificationResult, Classifier, ClassifierHandle, SentimentStrategy,
};
pub use crate::policy::{Emotion, Label, Verdict};

use axum::Router;

/// Build the full HTTP app from the process environment.
pub fn app() -> anyhow::Result<Router> {
    let config = config::ServiceConfig::from_env();
    let state = api::AppState::from_config(config)?;
    Ok(api::router(state))
}
