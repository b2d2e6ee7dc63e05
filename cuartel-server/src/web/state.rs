//! Application state for the web layer.

use crate::cache::SnapshotCache;

/// Shared application state.
pub struct AppState<F> {
    /// Published station snapshot
    pub cache: SnapshotCache<F>,

    /// Whether station records include the `personal` field
    pub include_personnel: bool,
}

impl<F> AppState<F> {
    /// Create a new app state.
    pub fn new(cache: SnapshotCache<F>, include_personnel: bool) -> Self {
        Self {
            cache,
            include_personnel,
        }
    }
}

impl<F> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            include_personnel: self.include_personnel,
        }
    }
}
