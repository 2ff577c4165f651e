//! Application state for the web layer.

use std::sync::Arc;

use crate::tracker::{ManualRefresh, Tracker};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Feed records and board derivation
    pub tracker: Arc<Tracker>,

    /// Fetches the live feed on demand
    pub refresher: Arc<dyn ManualRefresh>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(tracker: Arc<Tracker>, refresher: Arc<dyn ManualRefresh>) -> Self {
        Self { tracker, refresher }
    }
}
