//! Peak sample telemetry
//!
//! The capture worker is the single writer of [`PeakTelemetry`]; the
//! [`TelemetryPoller`] reads it on a fixed interval, independent of the frame
//! rate, and hands the value to a [`TelemetrySink`].

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::{PeakSource, TelemetrySink};
use metrics::gauge;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

/// Last peak sample seen by the range scan
#[derive(Debug, Default)]
pub struct PeakTelemetry {
    peak: AtomicU16,
}

impl PeakTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the peak of the latest scan
    pub fn record(&self, peak: u16) {
        self.peak.store(peak, Ordering::Relaxed);
    }
}

impl PeakSource for PeakTelemetry {
    fn last_peak_sample(&self) -> u16 {
        self.peak.load(Ordering::Relaxed)
    }
}

/// Logs each polled value and mirrors it into the `lepton_peak_sample` gauge
#[derive(Debug, Default)]
pub struct LogTelemetrySink;

impl TelemetrySink for LogTelemetrySink {
    fn report_peak(&mut self, peak: u16) {
        gauge!("lepton_peak_sample").set(f64::from(peak));
        info!(peak, "peak sample");
    }
}

/// Periodic poller task
pub struct TelemetryPoller {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<u64>,
}

impl TelemetryPoller {
    /// Poll `source` every `period` until shut down
    pub fn spawn<P, S>(source: Arc<P>, mut sink: S, period: Duration) -> Self
    where
        P: PeakSource + ?Sized + 'static,
        S: TelemetrySink + 'static,
    {
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // First tick completes immediately
            ticker.tick().await;

            let mut polls = 0u64;
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        sink.report_peak(source.last_peak_sample());
                        polls += 1;
                    }
                }
            }
            debug!(polls, "telemetry poller stopped");
            polls
        });
        Self { stop_tx, task }
    }

    /// Stop polling; returns the number of polls made
    pub async fn shutdown(self) -> u64 {
        let _ = self.stop_tx.send(());
        match self.task.await {
            Ok(polls) => polls,
            Err(e) => {
                error!(error = ?e, "telemetry task panicked");
                0
            }
        }
    }
}
