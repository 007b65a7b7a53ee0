//! Per-area write serialization.
//!
//! At most one in-flight recompute per area id at a time; submissions
//! against different areas never block each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Keyed async mutexes, one per area id, created on first use.
#[derive(Default)]
pub struct AreaLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl AreaLocks {
    /// Returns the lock handle for an area id, creating it on first use.
    ///
    /// The caller holds the returned handle and awaits `lock()` on it;
    /// cloning the `Arc` outside the map lock keeps the registry itself
    /// uncontended.
    ///
    /// # Panics
    ///
    /// Panics if the registry mutex is poisoned.
    pub fn handle(&self, area_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inner.lock().expect("area lock registry poisoned");
        Arc::clone(
            map.entry(area_id.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }
}
