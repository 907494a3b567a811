//! Sink traits - consumer side of the capture worker
//!
//! Defines the abstract interfaces for frame and telemetry consumers.

use std::sync::Arc;

use crate::{ContractError, RenderedFrame};

/// Frame output trait
///
/// All frame sink implementations must implement this trait.
#[trait_variant::make(FrameSink: Send)]
pub trait LocalFrameSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Deliver one rendered frame
    ///
    /// Called at most once per successfully rendered frame.
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn deliver(&mut self, frame: Arc<RenderedFrame>) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}

/// Source of the "peak sample" telemetry scalar
///
/// Exactly one writer updates it; reads need no synchronization beyond an atomic load.
pub trait PeakSource: Send + Sync {
    /// Largest valid raw sample seen by the most recent auto-range scan
    fn last_peak_sample(&self) -> u16;
}

/// Consumer of polled peak samples
pub trait TelemetrySink: Send {
    fn report_peak(&mut self, peak: u16);
}

impl<T: PeakSource + ?Sized> PeakSource for Arc<T> {
    fn last_peak_sample(&self) -> u16 {
        (**self).last_peak_sample()
    }
}
