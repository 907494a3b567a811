//! Pipeline statistics and metrics.

use std::time::Duration;

use dispatcher::{DispatchSummary, MetricsSnapshot};
use ingestion::ReaderStats;
use observability::CaptureSummary;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Frames handed to the mailbox
    pub frames_published: u64,

    /// What the dispatcher took from the mailbox
    pub dispatch: DispatchSummary,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Capture worker aggregates
    pub capture: CaptureSummary,

    /// Packet reader lifetime counters
    pub reader: ReaderStats,

    /// Per-sink delivery counters
    pub sinks: Vec<(String, MetricsSnapshot)>,

    /// Peak telemetry polls made
    pub telemetry_polls: u64,
}

impl PipelineStats {
    /// Calculate frames per second throughput
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.frames_published as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of published frames the dispatcher never saw, as percentage
    pub fn superseded_rate(&self) -> f64 {
        let total = self.dispatch.dispatched + self.dispatch.superseded;
        if total > 0 {
            (self.dispatch.superseded as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Pipeline Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Frames published: {}", self.frames_published);
        println!("   ├─ FPS: {:.2}", self.fps());
        println!("   └─ Telemetry polls: {}", self.telemetry_polls);

        let capture = &self.capture;
        println!("\n🌡️  Capture");
        println!("   ├─ Segments read: {}", capture.segments_read);
        println!("   ├─ Invalid segments: {}", capture.invalid_segments);
        println!(
            "   ├─ Corrupt frames: {} ({:.2}%)",
            capture.frames_corrupt, capture.corrupt_rate
        );
        println!("   ├─ Bus faults: {}", capture.bus_faults);
        println!("   ├─ Resets per read: {}", capture.resets_per_read);
        println!("   └─ Frame interval (ms): {}", capture.frame_interval_ms);

        println!("\n🔌 SPI Reader");
        println!("   ├─ Packets accepted: {}", self.reader.packets_accepted);
        println!("   ├─ Resyncs: {}", self.reader.resyncs);
        println!("   └─ Sensor reboots: {}", self.reader.reboots);

        println!("\n📤 Dispatch");
        println!("   ├─ Dispatched: {}", self.dispatch.dispatched);
        println!(
            "   └─ Superseded: {} ({:.2}%)",
            self.dispatch.superseded,
            self.superseded_rate()
        );

        if !self.sinks.is_empty() {
            println!("\n📦 Sinks");
            for (i, (name, snapshot)) in self.sinks.iter().enumerate() {
                let prefix = if i == self.sinks.len() - 1 { "└─" } else { "├─" };
                println!(
                    "   {} {}: delivered={}, failed={}, dropped={}",
                    prefix, name, snapshot.delivered, snapshot.failures, snapshot.dropped
                );
            }
        }

        println!();
    }
}
