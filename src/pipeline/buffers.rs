// Pass-scoped raster buffers: every buffer is released exactly once, on drop

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::trace;

/// Counts the raster buffers currently alive for one owner.
#[derive(Debug, Clone, Default)]
pub struct BufferLedger {
    live: Arc<AtomicUsize>,
}

impl BufferLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked buffers not yet released.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Take ownership of `value`; it is counted until the returned guard drops.
    pub fn track<T>(&self, label: &'static str, value: T) -> Tracked<T> {
        self.live.fetch_add(1, Ordering::SeqCst);
        trace!(label, "acquired raster buffer");
        Tracked {
            value,
            label,
            live: Arc::clone(&self.live),
        }
    }
}

/// A raster buffer owned by a pass. Dropping it is the single release point.
pub struct Tracked<T> {
    value: T,
    label: &'static str,
    live: Arc<AtomicUsize>,
}

impl<T> Deref for Tracked<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: fmt::Debug> fmt::Debug for Tracked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracked")
            .field("label", &self.label)
            .field("value", &self.value)
            .finish()
    }
}

impl<T> Drop for Tracked<T> {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        trace!(label = self.label, "released raster buffer");
    }
}
