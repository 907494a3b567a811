//! Per-sink delivery counters
//!
//! Mirrored into the global `metrics` recorder with a `sink` label.

use std::sync::atomic::{AtomicU64, Ordering};

use metrics::counter;

/// Counters of a single sink
#[derive(Debug)]
pub struct SinkMetrics {
    sink: String,
    delivered: AtomicU64,
    failures: AtomicU64,
    dropped: AtomicU64,
    last_frame_id: AtomicU64,
}

impl SinkMetrics {
    pub fn new(sink: impl Into<String>) -> Self {
        Self {
            sink: sink.into(),
            delivered: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            last_frame_id: AtomicU64::new(0),
        }
    }

    pub fn record_delivered(&self, frame_id: u64) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        self.last_frame_id.store(frame_id, Ordering::Relaxed);
        counter!("lepton_frames_delivered_total", "sink" => self.sink.clone()).increment(1);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        counter!("lepton_sink_failures_total", "sink" => self.sink.clone()).increment(1);
    }

    /// Frame dropped because the sink queue was full
    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        counter!(
            "lepton_frames_dropped_total",
            "reason" => "queue_full",
            "sink" => self.sink.clone()
        )
        .increment(1);
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            delivered: self.delivered(),
            failures: self.failures(),
            dropped: self.dropped(),
            last_frame_id: self.last_frame_id.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`SinkMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub delivered: u64,
    pub failures: u64,
    pub dropped: u64,
    /// Id of the last frame written successfully (0 = none)
    pub last_frame_id: u64,
}
