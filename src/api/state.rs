//! Shared application state for HTTP handlers

use std::sync::Arc;

use crate::store::BatchStore;

/// State handed to every handler
pub struct AppState {
    /// Published batches, fed by the ingestion thread
    pub store: Arc<BatchStore>,
}

impl AppState {
    pub fn new(store: Arc<BatchStore>) -> Self {
        Self { store }
    }
}
