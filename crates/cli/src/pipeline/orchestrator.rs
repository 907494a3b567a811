//! Pipeline orchestrator - coordinates all components.
//!
//! The capture worker runs on a blocking thread; the dispatcher, sink workers
//! and telemetry poller run on the async runtime. Uses the synthetic sensor in
//! mock mode and spidev/i2c-dev when built with the `hardware` feature.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{CaptureConfig, ContractError, LogGate, StopSignal};
use dispatcher::{frame_mailbox, LogTelemetrySink, PeakTelemetry, TelemetryPoller};
use ingestion::{
    DeviceControl, PacketReader, ReaderSettings, ScriptedDevice, SpiBus, SyntheticBus,
    SyntheticConfig,
};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use capture::{CaptureWorker, WorkerReport};
use super::PipelineStats;

type BoxedBus = Box<dyn SpiBus + Send>;
type BoxedDevice = Box<dyn DeviceControl + Send>;

/// How long the dispatcher gets to flush sinks after capture stops
const DISPATCHER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Where packets come from
#[derive(Debug, Clone, PartialEq)]
pub enum SensorSource {
    /// spidev + i2c-dev on the board
    Hardware,
    /// Synthetic sensor with the given glitch rate
    Mock { glitch_rate: f64 },
}

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Effective capture configuration (file plus CLI overrides)
    pub capture: CaptureConfig,

    pub source: SensorSource,

    /// Maximum number of frames to render (None = unlimited)
    pub max_frames: Option<u64>,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until the frame limit, the timeout or `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<PipelineStats>
    where
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let capture = &self.config.capture;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Open the bus up front so a missing device fails the run immediately
        let (bus, device) = self.open_sensor()?;
        let gate = LogGate::new(capture.logging.verbosity);
        let settings = ReaderSettings::new(
            capture.sensor.spi_bus,
            capture.sensor.speed_hz(),
            capture.sensor.variant,
            &capture.timing,
        )
        .with_gate(gate);
        let mut reader = PacketReader::new(bus, device, settings);
        reader.ensure_open().map_err(ContractError::from).with_context(|| {
            format!(
                "Failed to open SPI bus {} at {} MHz",
                capture.sensor.spi_bus, capture.sensor.spi_speed_mhz
            )
        })?;

        info!(
            variant = ?capture.sensor.variant,
            colormap = capture.render.colormap.as_str(),
            range_min = %capture.render.range_min,
            range_max = %capture.render.range_max,
            verbosity = capture.logging.verbosity,
            "Sensor ready"
        );

        // Setup Dispatcher
        let (publisher, subscriber) = frame_mailbox();
        if capture.sinks.is_empty() {
            warn!("No sinks configured - rendered frames will be dropped");
        }
        let dispatcher = dispatcher::create_dispatcher(capture.sinks.clone(), subscriber)
            .await
            .context("Failed to create dispatcher")?;
        let sink_metrics = dispatcher.sink_metrics();
        let dispatcher_handle = dispatcher.spawn();
        info!(active_sinks = sink_metrics.len(), "Dispatcher started");

        // Peak telemetry
        let peak = Arc::new(PeakTelemetry::new());
        let poller = TelemetryPoller::spawn(
            Arc::clone(&peak),
            LogTelemetrySink,
            capture.timing.telemetry_interval(),
        );

        // Capture worker
        let stop = StopSignal::new();
        let worker = CaptureWorker::new(reader, capture, peak);
        let worker_stop = stop.clone();
        let max_frames = self.config.max_frames;
        let mut worker_handle: JoinHandle<WorkerReport> =
            tokio::task::spawn_blocking(move || worker.run(&worker_stop, publisher, max_frames));

        info!(max_frames = ?max_frames, source = ?self.config.source, "Pipeline running");

        let timeout = async {
            match self.config.timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };

        let joined = tokio::select! {
            joined = &mut worker_handle => joined,
            _ = timeout => {
                warn!(timeout_secs = self.config.timeout.map(|t| t.as_secs()), "Pipeline timed out");
                stop.stop();
                worker_handle.await
            }
            _ = shutdown => {
                warn!("Received shutdown signal, stopping pipeline...");
                stop.stop();
                worker_handle.await
            }
        };
        let report = joined.context("Capture worker panicked")?;

        // Shutdown
        info!("Shutting down pipeline...");
        let dispatch = match tokio::time::timeout(DISPATCHER_DRAIN_TIMEOUT, dispatcher_handle).await {
            Ok(Ok(summary)) => summary,
            Ok(Err(e)) => {
                warn!(error = %e, "Dispatcher task failed");
                Default::default()
            }
            Err(_) => {
                warn!("Dispatcher did not drain in time");
                Default::default()
            }
        };
        let telemetry_polls = poller.shutdown().await;

        let stats = PipelineStats {
            frames_published: report.frames_published,
            dispatch,
            duration: start_time.elapsed(),
            capture: report.capture,
            reader: report.reader,
            sinks: sink_metrics
                .iter()
                .map(|(name, metrics)| (name.clone(), metrics.snapshot()))
                .collect(),
            telemetry_polls,
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            fps = format!("{:.2}", stats.fps()),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }

    fn open_sensor(&self) -> Result<(BoxedBus, BoxedDevice)> {
        match self.config.source {
            SensorSource::Mock { glitch_rate } => {
                info!(glitch_rate, "Running in MOCK mode (no sensor required)");
                let bus = SyntheticBus::new(SyntheticConfig {
                    variant: self.config.capture.sensor.variant,
                    glitch_rate,
                    ..Default::default()
                });
                Ok((Box::new(bus), Box::new(ScriptedDevice::new())))
            }
            SensorSource::Hardware => open_hardware(),
        }
    }
}

#[cfg(feature = "hardware")]
fn open_hardware() -> Result<(BoxedBus, BoxedDevice)> {
    use ingestion::{CciDevice, SpidevBus};

    let device = CciDevice::open().context("Failed to open the sensor control channel")?;
    Ok((Box::new(SpidevBus::new()), Box::new(device)))
}

#[cfg(not(feature = "hardware"))]
fn open_hardware() -> Result<(BoxedBus, BoxedDevice)> {
    Err(crate::error::CliError::SensorUnavailable {
        message: "built without the `hardware` feature; use --mock".to_string(),
    }
    .into())
}
