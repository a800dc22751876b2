//! Progress reporting for segment downloads.
//!
//! Fetcher worker threads emit `SegmentProgress` events over a tokio mpsc
//! channel (`try_send`, so a slow consumer never stalls a transfer); the CLI
//! aggregates them with `ProgressTracker` and renders a one-line display.

use std::time::Instant;

/// One progress event from a segment fetcher.
#[derive(Debug, Clone, Copy)]
pub struct SegmentProgress {
    /// Task index of the segment being fetched.
    pub index: usize,
    /// Bytes present locally so far (resume offset + bytes received).
    pub bytes_done: u64,
    /// Expected final size, when the server reported a length.
    pub total_bytes: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default)]
struct SegmentSlot {
    bytes_done: u64,
    total_bytes: Option<u64>,
}

/// Aggregates per-segment progress events into run totals.
#[derive(Debug)]
pub struct ProgressTracker {
    slots: Vec<SegmentSlot>,
    started: Instant,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            started: Instant::now(),
        }
    }
}

impl ProgressTracker {
    pub fn update(&mut self, ev: &SegmentProgress) {
        if ev.index >= self.slots.len() {
            self.slots.resize(ev.index + 1, SegmentSlot::default());
        }
        let slot = &mut self.slots[ev.index];
        slot.bytes_done = ev.bytes_done;
        if ev.total_bytes.is_some() {
            slot.total_bytes = ev.total_bytes;
        }
    }

    /// Bytes present locally across all segments seen so far.
    pub fn bytes_done(&self) -> u64 {
        self.slots.iter().map(|s| s.bytes_done).sum()
    }

    /// Sum of expected sizes; None while any segment's size is still unknown.
    pub fn total_bytes(&self) -> Option<u64> {
        self.slots.iter().map(|s| s.total_bytes).sum()
    }

    /// Number of segments that have reported at least one event.
    pub fn segments_seen(&self) -> usize {
        self.slots.len()
    }

    /// Total download rate in bytes per second (0 before any time has passed).
    pub fn bytes_per_sec(&self) -> f64 {
        let elapsed = self.started.elapsed().as_secs_f64();
        if elapsed <= 0.0 {
            return 0.0;
        }
        self.bytes_done() as f64 / elapsed
    }

    /// Fraction complete in [0.0, 1.0]; None while the total is unknown.
    pub fn fraction(&self) -> Option<f64> {
        let total = self.total_bytes()?;
        if total == 0 {
            return Some(1.0);
        }
        Some((self.bytes_done() as f64 / total as f64).min(1.0))
    }
}
