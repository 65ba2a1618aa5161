use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Per-run flow counters.
///
/// Cheap atomic counters shared between the pipeline and any observer that
/// cloned the metrics handle before the run started. Pause cycles count the
/// number of times backpressure halted production; a completed run with zero
/// pause cycles means the sink always kept up.
#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    chunks_produced: Arc<AtomicU64>,
    chunks_delivered: Arc<AtomicU64>,
    pause_cycles: Arc<AtomicU64>,
    drain_notices: Arc<AtomicU64>,
    peak_occupancy: Arc<AtomicUsize>,
    started_at: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            chunks_produced: Arc::new(AtomicU64::new(0)),
            chunks_delivered: Arc::new(AtomicU64::new(0)),
            pause_cycles: Arc::new(AtomicU64::new(0)),
            drain_notices: Arc::new(AtomicU64::new(0)),
            peak_occupancy: Arc::new(AtomicUsize::new(0)),
            started_at: Instant::now(),
        }
    }

    pub(crate) fn record_produced(&self) {
        self.chunks_produced.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delivered(&self, count: u64) {
        self.chunks_delivered.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_pause(&self) {
        self.pause_cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_drain_notice(&self) {
        self.drain_notices.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_occupancy(&self, occupancy: usize) {
        self.peak_occupancy.fetch_max(occupancy, Ordering::Relaxed);
    }

    /// Chunks pulled from the source so far
    pub fn chunks_produced(&self) -> u64 {
        self.chunks_produced.load(Ordering::Relaxed)
    }

    /// Chunks delivered to the terminal consumer so far
    pub fn chunks_delivered(&self) -> u64 {
        self.chunks_delivered.load(Ordering::Relaxed)
    }

    /// Times production paused on backpressure
    pub fn pause_cycles(&self) -> u64 {
        self.pause_cycles.load(Ordering::Relaxed)
    }

    /// Drain notifications observed
    pub fn drain_notices(&self) -> u64 {
        self.drain_notices.load(Ordering::Relaxed)
    }

    /// Highest sink occupancy seen during the run
    pub fn peak_occupancy(&self) -> usize {
        self.peak_occupancy.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            chunks_produced: self.chunks_produced(),
            chunks_delivered: self.chunks_delivered(),
            pause_cycles: self.pause_cycles(),
            drain_notices: self.drain_notices(),
            peak_occupancy: self.peak_occupancy(),
            elapsed: self.started_at.elapsed(),
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A snapshot of pipeline counters at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub chunks_produced: u64,
    pub chunks_delivered: u64,
    pub pause_cycles: u64,
    pub drain_notices: u64,
    pub peak_occupancy: usize,
    pub elapsed: std::time::Duration,
}

impl MetricsSnapshot {
    /// Format counters as a human-readable one-liner
    pub fn format(&self) -> String {
        format!(
            "Produced: {}, Delivered: {}, Pause cycles: {}, Drains: {}, \
             Peak occupancy: {}, Elapsed: {:.3}s",
            self.chunks_produced,
            self.chunks_delivered,
            self.pause_cycles,
            self.drain_notices,
            self.peak_occupancy,
            self.elapsed.as_secs_f64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = PipelineMetrics::new();
        for _ in 0..10 {
            metrics.record_produced();
        }
        metrics.record_delivered(7);
        metrics.record_pause();
        assert_eq!(metrics.chunks_produced(), 10);
        assert_eq!(metrics.chunks_delivered(), 7);
        assert_eq!(metrics.pause_cycles(), 1);
    }

    #[test]
    fn peak_occupancy_keeps_the_max() {
        let metrics = PipelineMetrics::new();
        metrics.record_occupancy(3);
        metrics.record_occupancy(8);
        metrics.record_occupancy(5);
        assert_eq!(metrics.peak_occupancy(), 8);
    }

    #[test]
    fn clones_share_counters() {
        let metrics = PipelineMetrics::new();
        let observer = metrics.clone();
        metrics.record_produced();
        assert_eq!(observer.chunks_produced(), 1);
    }

    #[test]
    fn snapshot_formats() {
        let metrics = PipelineMetrics::new();
        metrics.record_produced();
        let line = metrics.snapshot().format();
        assert!(line.contains("Produced: 1"));
    }
}
