//! Application state.
//!
//! Shared state for all request handlers.

use std::sync::Arc;

use web2050_pipeline::GenerationPipeline;
use web2050_store::PageStore;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Lookup, generation and deletion of pages.
    pub(crate) pipeline: GenerationPipeline,
    /// Page store, for the index listing.
    pub(crate) store: Arc<dyn PageStore>,
}
