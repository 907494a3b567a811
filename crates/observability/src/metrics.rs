//! Capture metrics
//!
//! Prometheus-facing recorders plus an in-memory aggregator for the end of run
//! summary.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, histogram};

/// Register descriptions for every capture metric
pub fn describe_capture_metrics() {
    describe_counter!("lepton_frames_rendered_total", "Frames rendered and published");
    describe_counter!(
        "lepton_frames_dropped_total",
        "Frames discarded, labelled by reason"
    );
    describe_counter!("lepton_resyncs_total", "Packet sequence restarts");
    describe_counter!("lepton_reboots_total", "Sensor reboots after bus desync");
    describe_counter!("lepton_segments_read_total", "Complete segment runs read");
    describe_counter!("lepton_frames_delivered_total", "Frames written by a sink");
    describe_counter!("lepton_sink_failures_total", "Failed sink writes");
    describe_gauge!("lepton_peak_sample", "Last polled peak raw sample");
    describe_gauge!("lepton_range_min", "Lower auto-range bound");
    describe_gauge!("lepton_range_max", "Upper auto-range bound");
    describe_histogram!("lepton_resets_per_read", "Sequence restarts per segment read");
}

/// Record one complete segment read
pub fn record_segment_read(resets: u32) {
    counter!("lepton_segments_read_total").increment(1);
    histogram!("lepton_resets_per_read").record(f64::from(resets));
}

/// Record a discarded read attempt
pub fn record_invalid_segment() {
    counter!("lepton_frames_dropped_total", "reason" => "invalid_segment").increment(1);
}

/// Capture aggregator
///
/// Owned by the capture worker; summarized once the worker stops.
#[derive(Debug, Clone, Default)]
pub struct CaptureStats {
    pub segments_read: u64,
    pub invalid_segments: u64,
    pub frames_rendered: u64,
    pub frames_corrupt: u64,
    pub bus_faults: u64,
    pub reboots: u64,
    /// Sequence restarts per read attempt
    pub resets: RunningStats,
    /// Wall time between consecutive rendered frames (ms)
    pub frame_interval_ms: RunningStats,
}

impl CaptureStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_read(&mut self, resets: u32, reboots: u32) {
        self.resets.push(f64::from(resets));
        self.reboots += u64::from(reboots);
    }

    pub fn record_segment(&mut self) {
        self.segments_read += 1;
    }

    pub fn record_invalid_segment(&mut self) {
        self.invalid_segments += 1;
    }

    pub fn record_frame(&mut self, interval_ms: Option<f64>) {
        self.frames_rendered += 1;
        if let Some(ms) = interval_ms {
            self.frame_interval_ms.push(ms);
        }
    }

    pub fn record_corrupt(&mut self) {
        self.frames_corrupt += 1;
    }

    pub fn record_bus_fault(&mut self) {
        self.bus_faults += 1;
    }

    pub fn summary(&self) -> CaptureSummary {
        let attempts = self.frames_rendered + self.frames_corrupt;
        CaptureSummary {
            segments_read: self.segments_read,
            invalid_segments: self.invalid_segments,
            frames_rendered: self.frames_rendered,
            frames_corrupt: self.frames_corrupt,
            bus_faults: self.bus_faults,
            reboots: self.reboots,
            corrupt_rate: if attempts > 0 {
                self.frames_corrupt as f64 / attempts as f64 * 100.0
            } else {
                0.0
            },
            resets_per_read: StatsSummary::from(&self.resets),
            frame_interval_ms: StatsSummary::from(&self.frame_interval_ms),
        }
    }
}

/// Capture summary
#[derive(Debug, Clone, Default)]
pub struct CaptureSummary {
    pub segments_read: u64,
    pub invalid_segments: u64,
    pub frames_rendered: u64,
    pub frames_corrupt: u64,
    pub bus_faults: u64,
    pub reboots: u64,
    pub corrupt_rate: f64,
    pub resets_per_read: StatsSummary,
    pub frame_interval_ms: StatsSummary,
}

impl std::fmt::Display for CaptureSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Capture Summary ===")?;
        writeln!(f, "Segments read: {}", self.segments_read)?;
        writeln!(f, "Invalid segments: {}", self.invalid_segments)?;
        writeln!(f, "Frames rendered: {}", self.frames_rendered)?;
        writeln!(
            f,
            "Corrupt frames: {} ({:.2}%)",
            self.frames_corrupt, self.corrupt_rate
        )?;
        writeln!(f, "Bus faults: {}", self.bus_faults)?;
        writeln!(f, "Sensor reboots: {}", self.reboots)?;
        writeln!(f, "Resets per read: {}", self.resets_per_read)?;
        writeln!(f, "Frame interval (ms): {}", self.frame_interval_ms)
    }
}

/// Summary of a [`RunningStats`]
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online mean/variance (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
