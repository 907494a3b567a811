//! Capture worker - the blocking read/assemble/render loop.
//!
//! Runs on its own thread. Everything it owns is exclusive to it; the only
//! shared state is the stop flag, the peak telemetry cell and the frame
//! mailbox.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use contracts::{CaptureConfig, LogGate, RenderedFrame, StopSignal};
use dispatcher::{FramePublisher, PeakTelemetry};
use imaging::{Colormap, RangeEstimator, Renderer};
use ingestion::{
    Absorb, DeviceControl, PacketReader, ReadOutcome, ReaderStats, SegmentAssembler, SegmentRun,
    SpiBus,
};
use observability::{CaptureStats, CaptureSummary};
use tracing::{debug, error, info};

/// Granularity of interruptible sleeps
const STOP_POLL: Duration = Duration::from_millis(20);

/// Result of one worker cycle
#[derive(Debug)]
pub enum CycleOutcome {
    /// A complete frame was rendered
    Frame(RenderedFrame),
    /// Segment stored, frame not complete yet
    Incomplete,
    /// Read or frame dropped (invalid segment id, zero sample)
    Discarded,
    /// Stop signal observed mid-read
    Stopped,
    /// The bus failed; the worker backed off before the next attempt
    BusFault,
}

/// What the worker did before it stopped
#[derive(Debug, Clone)]
pub struct WorkerReport {
    pub frames_published: u64,
    pub capture: CaptureSummary,
    pub reader: ReaderStats,
}

/// Owns the reader and every per-frame stage
pub struct CaptureWorker<B, D> {
    reader: PacketReader<B, D>,
    assembler: SegmentAssembler,
    estimator: RangeEstimator,
    renderer: Renderer,
    run: SegmentRun,
    peak: Arc<PeakTelemetry>,
    stats: CaptureStats,
    last_frame_at: Option<Instant>,
}

impl<B: SpiBus, D: DeviceControl> CaptureWorker<B, D> {
    /// Build the stages for `config` around an already configured reader
    pub fn new(reader: PacketReader<B, D>, config: &CaptureConfig, peak: Arc<PeakTelemetry>) -> Self {
        let gate = LogGate::new(config.logging.verbosity);
        let variant = reader.settings().variant;
        Self {
            reader,
            assembler: SegmentAssembler::new(variant, gate),
            estimator: RangeEstimator::from_settings(&config.render),
            renderer: Renderer::new(Colormap::builtin(config.render.colormap), gate),
            run: SegmentRun::new(),
            peak,
            stats: CaptureStats::new(),
            last_frame_at: None,
        }
    }

    /// One read attempt, and a render if it completed a frame
    pub fn step(&mut self, stop: &StopSignal) -> CycleOutcome {
        let read = match self.reader.read_segment(&mut self.run, stop) {
            Ok(read) => read,
            Err(e) => {
                error!(error = %e, "segment read failed");
                self.stats.record_bus_fault();
                sleep_unless_stopped(self.reader.settings().reboot_settle, stop);
                return CycleOutcome::BusFault;
            }
        };

        self.stats.record_read(read.resets, read.reboots);
        if read.reboots > 0 {
            self.assembler.clear_warnings();
            self.renderer.clear_warnings();
        }

        match read.outcome {
            ReadOutcome::Stopped => CycleOutcome::Stopped,
            ReadOutcome::InvalidSegment { segment } => {
                self.assembler.record_invalid(segment);
                self.discard_invalid()
            }
            ReadOutcome::Complete { segment } => {
                observability::record_segment_read(read.resets);
                self.stats.record_segment();
                match self.assembler.absorb(segment, self.run.as_bytes()) {
                    Absorb::FrameReady => self.render(),
                    Absorb::Incomplete => CycleOutcome::Incomplete,
                    Absorb::Invalid => self.discard_invalid(),
                }
            }
        }
    }

    fn discard_invalid(&mut self) -> CycleOutcome {
        observability::record_invalid_segment();
        self.stats.record_invalid_segment();
        CycleOutcome::Discarded
    }

    fn render(&mut self) -> CycleOutcome {
        let view = self.assembler.frame();
        let bounds = self.estimator.compute_bounds(&view);
        if let Some(peak) = self.estimator.last_peak() {
            self.peak.record(peak);
        }

        match self.renderer.render(&view, &bounds) {
            Some(frame) => {
                let now = Instant::now();
                let interval = self
                    .last_frame_at
                    .map(|prev| now.duration_since(prev).as_secs_f64() * 1000.0);
                self.last_frame_at = Some(now);
                self.stats.record_frame(interval);
                CycleOutcome::Frame(frame)
            }
            None => {
                self.stats.record_corrupt();
                CycleOutcome::Discarded
            }
        }
    }

    /// Loop until stopped or `max_frames` frames were published
    ///
    /// The publisher is dropped on return, which lets the dispatcher drain and
    /// exit.
    pub fn run(
        mut self,
        stop: &StopSignal,
        publisher: FramePublisher,
        max_frames: Option<u64>,
    ) -> WorkerReport {
        info!(variant = ?self.reader.settings().variant, "capture worker started");
        let mut published = 0u64;

        while !stop.is_stopped() {
            match self.step(stop) {
                CycleOutcome::Frame(frame) => {
                    debug!(frame_id = frame.frame_id, "frame published");
                    publisher.publish(frame);
                    published += 1;
                    if max_frames.is_some_and(|max| published >= max) {
                        info!(frames = published, "reached max frames limit");
                        break;
                    }
                }
                CycleOutcome::Stopped => break,
                CycleOutcome::Incomplete | CycleOutcome::Discarded | CycleOutcome::BusFault => {}
            }
        }

        self.reader.close();
        info!(frames = published, "capture worker stopped");
        WorkerReport {
            frames_published: published,
            capture: self.stats.summary(),
            reader: self.reader.stats(),
        }
    }

    pub fn reader(&self) -> &PacketReader<B, D> {
        &self.reader
    }

    /// Counters accumulated so far
    pub fn stats(&self) -> &CaptureStats {
        &self.stats
    }
}

fn sleep_unless_stopped(total: Duration, stop: &StopSignal) {
    let deadline = Instant::now() + total;
    while !stop.is_stopped() {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep((deadline - now).min(STOP_POLL));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{RangeBound, SensorVariant, TimingSettings};
    use dispatcher::frame_mailbox;
    use ingestion::{
        packet, segment_packets, segment_packets_with, ReaderSettings, ScriptedBus,
        ScriptedDevice, RESYNC_REBOOT_THRESHOLD,
    };
    use observability::testing::EventRecorder;
    use tracing::Level;

    fn config(variant: SensorVariant) -> CaptureConfig {
        let mut config = CaptureConfig::default();
        config.sensor.variant = variant;
        config.timing = TimingSettings::immediate();
        config.logging.verbosity = 255;
        config
    }

    fn worker(
        packets: Vec<Vec<u8>>,
        config: &CaptureConfig,
    ) -> CaptureWorker<ScriptedBus, ScriptedDevice> {
        let settings = ReaderSettings::new(
            config.sensor.spi_bus,
            config.sensor.speed_hz(),
            config.sensor.variant,
            &config.timing,
        );
        let reader = PacketReader::new(ScriptedBus::from_packets(packets), ScriptedDevice::new(), settings);
        CaptureWorker::new(reader, config, Arc::new(PeakTelemetry::new()))
    }

    #[test]
    fn test_single_segment_renders_each_read() {
        let config = config(SensorVariant::SingleSegment);
        let mut worker = worker(segment_packets(0, 30500), &config);

        let CycleOutcome::Frame(frame) = worker.step(&StopSignal::new()) else {
            panic!("expected a frame");
        };
        assert_eq!(frame.frame_id, 1);
        assert_eq!((frame.width, frame.height), (80, 60));
        assert_eq!(worker.stats().frames_rendered, 1);
    }

    #[test]
    fn test_multi_segment_waits_for_terminal_segment() {
        let config = config(SensorVariant::MultiSegment);
        let mut packets = Vec::new();
        for segment in 1..=4 {
            packets.extend(segment_packets(segment, 30000 + u16::from(segment) * 100));
        }
        let mut worker = worker(packets, &config);
        let stop = StopSignal::new();

        for _ in 0..3 {
            assert!(matches!(worker.step(&stop), CycleOutcome::Incomplete));
        }
        let CycleOutcome::Frame(frame) = worker.step(&stop) else {
            panic!("expected a frame after segment 4");
        };
        assert_eq!((frame.width, frame.height), (160, 120));
        assert_eq!(worker.stats().segments_read, 4);
    }

    #[test]
    fn test_invalid_segment_is_discarded() {
        let config = config(SensorVariant::MultiSegment);
        let mut worker = worker(segment_packets(0, 30000), &config);

        assert!(matches!(worker.step(&StopSignal::new()), CycleOutcome::Discarded));
        assert_eq!(worker.stats().invalid_segments, 1);
        assert_eq!(worker.stats().frames_rendered, 0);
    }

    #[test]
    fn test_zero_sample_drops_frame() {
        let config = config(SensorVariant::SingleSegment);
        let packets = segment_packets_with(0, |number, idx| {
            if number == 30 && idx == 5 {
                0
            } else {
                30500
            }
        });
        let mut worker = worker(packets, &config);

        assert!(matches!(worker.step(&StopSignal::new()), CycleOutcome::Discarded));
        assert_eq!(worker.stats().frames_corrupt, 1);
    }

    #[test]
    fn test_auto_range_publishes_peak() {
        let config = config(SensorVariant::SingleSegment);
        let packets = segment_packets_with(0, |number, idx| {
            if number == 10 && idx == 10 {
                31999
            } else {
                30100
            }
        });
        let peak = Arc::new(PeakTelemetry::new());
        let settings = ReaderSettings::new(0, 20_000_000, config.sensor.variant, &config.timing);
        let reader = PacketReader::new(ScriptedBus::from_packets(packets), ScriptedDevice::new(), settings);
        let mut worker = CaptureWorker::new(reader, &config, Arc::clone(&peak));

        let CycleOutcome::Frame(frame) = worker.step(&StopSignal::new()) else {
            panic!("expected a frame");
        };
        assert_eq!((frame.bounds.min, frame.bounds.max), (30100, 31999));
        assert_eq!(contracts::PeakSource::last_peak_sample(&*peak), 31999);
    }

    #[test]
    fn test_fixed_range_is_used_verbatim() {
        let mut config = config(SensorVariant::SingleSegment);
        config.render.range_min = RangeBound::Fixed(30000);
        config.render.range_max = RangeBound::Fixed(32000);
        let mut worker = worker(segment_packets(0, 100), &config);

        let CycleOutcome::Frame(frame) = worker.step(&StopSignal::new()) else {
            panic!("expected a frame");
        };
        assert_eq!((frame.bounds.min, frame.bounds.max), (30000, 32000));
    }

    #[test]
    fn test_bus_fault_is_reported_not_fatal() {
        let config = config(SensorVariant::SingleSegment);
        let mut worker = worker(Vec::new(), &config);

        assert!(matches!(worker.step(&StopSignal::new()), CycleOutcome::BusFault));
        assert_eq!(worker.stats().bus_faults, 1);
        assert!(!worker.reader().is_open());
    }

    #[test]
    fn test_reboot_is_counted() {
        let config = config(SensorVariant::SingleSegment);
        let mut packets = vec![packet(0, 59, 100); RESYNC_REBOOT_THRESHOLD as usize];
        packets.extend(segment_packets(0, 30500));
        let mut worker = worker(packets, &config);

        assert!(matches!(worker.step(&StopSignal::new()), CycleOutcome::Frame(_)));
        assert_eq!(worker.stats().reboots, 1);
        assert_eq!(worker.reader().device().reboots(), 1);
    }

    fn corrupt_then_clean(reboot_between: bool) -> Vec<Vec<u8>> {
        let mut packets = segment_packets_with(0, |number, idx| {
            if number == 12 && idx == 3 {
                0
            } else {
                30500
            }
        });
        if reboot_between {
            packets.extend(vec![packet(0, 59, 100); RESYNC_REBOOT_THRESHOLD as usize]);
        }
        packets.extend(segment_packets(0, 30500));
        packets
    }

    #[test]
    fn test_reboot_clears_warning_streaks() {
        const RECOVERY: &str = "frames free of zero samples again";
        let config = config(SensorVariant::SingleSegment);
        let stop = StopSignal::new();

        for (reboot_between, recoveries) in [(false, 1), (true, 0)] {
            let recorder = EventRecorder::default();
            let mut worker = worker(corrupt_then_clean(reboot_between), &config);
            recorder.record(|| {
                assert!(matches!(worker.step(&stop), CycleOutcome::Discarded));
                assert!(matches!(worker.step(&stop), CycleOutcome::Frame(_)));
            });
            assert_eq!(
                recorder.count(Level::INFO, RECOVERY),
                recoveries,
                "reboot between frames: {reboot_between}"
            );
        }
    }

    #[test]
    fn test_run_stops_at_max_frames_and_releases_publisher() {
        let config = config(SensorVariant::SingleSegment);
        let mut packets = Vec::new();
        for _ in 0..3 {
            packets.extend(segment_packets(0, 30500));
        }
        let worker = worker(packets, &config);
        let (publisher, subscriber) = frame_mailbox();

        let report = worker.run(&StopSignal::new(), publisher, Some(2));
        assert_eq!(report.frames_published, 2);
        assert_eq!(report.capture.frames_rendered, 2);
        assert_eq!(subscriber.latest().map(|f| f.frame_id), Some(2));
    }

    #[test]
    fn test_run_returns_immediately_when_stopped() {
        let config = config(SensorVariant::SingleSegment);
        let worker = worker(segment_packets(0, 30500), &config);
        let (publisher, _subscriber) = frame_mailbox();
        let stop = StopSignal::new();
        stop.stop();

        let report = worker.run(&stop, publisher, None);
        assert_eq!(report.frames_published, 0);
        assert_eq!(report.reader.packets_accepted, 0);
    }
}
