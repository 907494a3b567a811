//! # Dispatcher
//!
//! Frame delivery and telemetry.
//!
//! Responsibilities:
//! - Latest-frame-wins handoff from the capture thread (`frame_mailbox`)
//! - Fan-out to sinks, each isolated behind its own queue
//! - Peak sample polling on a fixed interval

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod mailbox;
pub mod metrics;
pub mod sinks;
pub mod telemetry;

pub use contracts::{FrameSink, RenderedFrame};
pub use dispatcher::{create_dispatcher, DispatchSummary, Dispatcher, DispatcherBuilder, DispatcherConfig};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use mailbox::{frame_mailbox, FramePublisher, FrameSubscriber};
pub use self::metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{LogSink, NetworkFormat, NetworkSink, NetworkSinkConfig};
pub use telemetry::{LogTelemetrySink, PeakTelemetry, TelemetryPoller};
