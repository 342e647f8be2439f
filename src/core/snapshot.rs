use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

use super::index::NameIndex;

/// A published index together with the time it was built
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub index: Arc<NameIndex>,
    pub refreshed_at: DateTime<Utc>,
}

/// Process-wide snapshot of the last successful refresh.
///
/// Empty at startup. Each successful cycle replaces the whole snapshot; it is
/// never merged. Readers get a cheap `Arc` clone and never block a writer for
/// longer than a pointer swap.
#[derive(Debug, Default)]
pub struct RefreshState {
    current: RwLock<Option<Snapshot>>,
}

impl RefreshState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot, if any
    pub fn load(&self) -> Option<Snapshot> {
        self.current.read().clone()
    }

    /// Current index, if any
    pub fn index(&self) -> Option<Arc<NameIndex>> {
        self.current.read().as_ref().map(|s| Arc::clone(&s.index))
    }

    /// Replace the snapshot wholesale
    pub fn replace(&self, index: Arc<NameIndex>) {
        *self.current.write() = Some(Snapshot {
            index,
            refreshed_at: Utc::now(),
        });
    }

    /// Drop the snapshot to release its memory
    pub fn clear(&self) {
        *self.current.write() = None;
    }

    pub fn is_empty(&self) -> bool {
        self.current.read().is_none()
    }
}
