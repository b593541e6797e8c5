use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Unread notification count shared by every consumer of the feed.
///
/// Cloning yields another read handle onto the same value. Only the
/// notification store feeds it deltas; consumers can read but not mutate.
#[derive(Debug, Clone, Default)]
pub struct UnreadCounter {
    value: Arc<AtomicUsize>,
}

impl UnreadCounter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Current unread count
    pub fn value(&self) -> usize {
        self.value.load(Ordering::Acquire)
    }

    /// Apply a signed delta and return the new value. A delta that would
    /// take the count below zero clamps to zero and is logged.
    pub(crate) fn apply(&self, delta: i64) -> usize {
        if delta == 0 {
            return self.value();
        }

        let mut clamped = false;
        let previous = self
            .value
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                let next = current as i64 + delta;
                clamped = next < 0;
                Some(next.max(0) as usize)
            })
            .unwrap_or_else(|current| current);

        let next = (previous as i64 + delta).max(0) as usize;
        if clamped {
            tracing::warn!(
                "Unread counter went negative (current {}, delta {}), clamping to zero",
                previous,
                delta
            );
        }
        metrics::gauge!("notisync_unread").set(next as f64);
        next
    }

    pub(crate) fn reset(&self) {
        self.value.store(0, Ordering::Release);
        metrics::gauge!("notisync_unread").set(0.0);
    }
}
