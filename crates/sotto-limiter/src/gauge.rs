// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The global concurrent-stream admission gauge.
//!
//! Bounds how many upstream completion streams this process holds open at
//! once. Acquisition is a compare-and-swap loop; the returned [`StreamSlot`]
//! releases on drop, which covers every exit path of a stream -- normal
//! completion, upstream error, and client disconnect alike.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tracing::warn;

/// Suggested client wait when the gauge is saturated.
pub const SATURATED_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Counting gauge capping simultaneously open upstream streams.
#[derive(Clone)]
pub struct StreamGauge {
    inner: Arc<GaugeInner>,
}

struct GaugeInner {
    active: AtomicU32,
    max: u32,
}

impl StreamGauge {
    pub fn new(max_concurrent: u32) -> Self {
        Self {
            inner: Arc::new(GaugeInner {
                active: AtomicU32::new(0),
                max: max_concurrent,
            }),
        }
    }

    /// Try to admit one more stream.
    ///
    /// Returns `None` when saturated. The slot must be held for the entire
    /// lifetime of the downstream response stream.
    pub fn try_acquire(&self) -> Option<StreamSlot> {
        let mut current = self.inner.active.load(Ordering::Acquire);
        loop {
            if current >= self.inner.max {
                warn!(
                    active = current,
                    max = self.inner.max,
                    "concurrent stream gauge saturated"
                );
                return None;
            }
            match self.inner.active.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    metrics::gauge!("sotto_active_streams").set(f64::from(current + 1));
                    return Some(StreamSlot {
                        inner: Arc::clone(&self.inner),
                    });
                }
                Err(observed) => current = observed,
            }
        }
    }

    /// Streams currently admitted.
    pub fn active(&self) -> u32 {
        self.inner.active.load(Ordering::Acquire)
    }

    pub fn max(&self) -> u32 {
        self.inner.max
    }
}

impl std::fmt::Debug for StreamGauge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamGauge")
            .field("active", &self.active())
            .field("max", &self.inner.max)
            .finish()
    }
}

/// RAII admission slot; releases the gauge on drop.
pub struct StreamSlot {
    inner: Arc<GaugeInner>,
}

impl Drop for StreamSlot {
    fn drop(&mut self) {
        let previous = self.inner.active.fetch_sub(1, Ordering::AcqRel);
        metrics::gauge!("sotto_active_streams").set(f64::from(previous.saturating_sub(1)));
    }
}

impl std::fmt::Debug for StreamSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSlot").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquires_up_to_cap() {
        let gauge = StreamGauge::new(2);

        let a = gauge.try_acquire().expect("slot 1");
        let b = gauge.try_acquire().expect("slot 2");
        assert_eq!(gauge.active(), 2);

        assert!(gauge.try_acquire().is_none(), "third must be refused");

        drop(a);
        assert_eq!(gauge.active(), 1);
        let _c = gauge.try_acquire().expect("slot freed by drop");
        drop(b);
    }

    #[test]
    fn drop_releases_on_panic_path() {
        let gauge = StreamGauge::new(1);

        let result = std::panic::catch_unwind({
            let gauge = gauge.clone();
            move || {
                let _slot = gauge.try_acquire().unwrap();
                panic!("simulated handler failure");
            }
        });
        assert!(result.is_err());
        assert_eq!(gauge.active(), 0, "slot must release even on unwind");
    }

    #[test]
    fn clones_share_one_gauge() {
        let gauge = StreamGauge::new(1);
        let clone = gauge.clone();

        let _slot = gauge.try_acquire().unwrap();
        assert!(clone.try_acquire().is_none());
        assert_eq!(clone.active(), 1);
    }

    #[test]
    fn concurrent_acquires_never_exceed_cap() {
        let gauge = StreamGauge::new(8);
        let mut handles = Vec::new();

        for _ in 0..32 {
            let gauge = gauge.clone();
            handles.push(std::thread::spawn(move || {
                let slot = gauge.try_acquire();
                let admitted = slot.is_some();
                assert!(gauge.active() <= gauge.max());
                std::thread::sleep(Duration::from_millis(1));
                admitted
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(gauge.active(), 0);
    }
}
