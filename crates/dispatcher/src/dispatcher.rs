//! Dispatcher - drains the frame mailbox and fans out to sinks

use std::sync::Arc;

use metrics::counter;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use contracts::{RenderedFrame, SinkConfig, SinkType};

use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::mailbox::FrameSubscriber;
use crate::metrics::SinkMetrics;
use crate::sinks::{LogSink, NetworkSink};

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub sinks: Vec<SinkConfig>,
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    subscriber: FrameSubscriber,
}

impl DispatcherBuilder {
    pub fn new(config: DispatcherConfig, subscriber: FrameSubscriber) -> Self {
        Self { config, subscriber }
    }

    /// Create every sink and its worker
    #[instrument(name = "dispatcher_builder_build", skip(self), fields(sink_count = self.config.sinks.len()))]
    pub async fn build(self) -> Result<Dispatcher, DispatcherError> {
        let mut handles: Vec<SinkHandle> = Vec::with_capacity(self.config.sinks.len());
        for sink_config in &self.config.sinks {
            if handles.iter().any(|h| h.name() == sink_config.name) {
                return Err(DispatcherError::DuplicateSink(sink_config.name.clone()));
            }
            handles.push(create_sink_handle(sink_config).await?);
        }
        Ok(Dispatcher::with_handles(handles, self.subscriber))
    }
}

#[instrument(
    name = "dispatcher_create_sink_handle",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
async fn create_sink_handle(config: &SinkConfig) -> Result<SinkHandle, DispatcherError> {
    match config.sink_type {
        SinkType::Log => {
            let sink = LogSink::new(&config.name);
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
        SinkType::Network => {
            let sink = NetworkSink::from_params(&config.name, &config.params)
                .await
                .map_err(|e| DispatcherError::sink_creation(&config.name, config.sink_type, e))?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
    }
}

/// What the dispatcher saw over its lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Frames taken from the mailbox and offered to the sinks
    pub dispatched: u64,
    /// Frames overwritten in the mailbox before the dispatcher got to them
    pub superseded: u64,
}

/// Fans frames out to sinks
pub struct Dispatcher {
    handles: Vec<SinkHandle>,
    subscriber: FrameSubscriber,
}

impl Dispatcher {
    /// Create a dispatcher over prepared handles
    pub fn with_handles(handles: Vec<SinkHandle>, subscriber: FrameSubscriber) -> Self {
        Self {
            handles,
            subscriber,
        }
    }

    /// Live metric handles that outlast the dispatcher task
    pub fn sink_metrics(&self) -> Vec<(String, Arc<SinkMetrics>)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), Arc::clone(h.metrics())))
            .collect()
    }

    /// Run until the publisher goes away, then drain and close every sink
    #[instrument(name = "dispatcher_run", skip(self))]
    pub async fn run(mut self) -> DispatchSummary {
        info!(sinks = self.handles.len(), "dispatcher started");

        let mut summary = DispatchSummary::default();
        let mut last_id: Option<u64> = None;

        while let Some(frame) = self.subscriber.next().await {
            // Frame ids are consecutive; a gap means overwritten frames
            if let Some(prev) = last_id {
                let skipped = frame.frame_id.saturating_sub(prev + 1);
                if skipped > 0 {
                    summary.superseded += skipped;
                    counter!("lepton_frames_dropped_total", "reason" => "superseded")
                        .increment(skipped);
                }
            }
            last_id = Some(frame.frame_id);
            summary.dispatched += 1;
            self.dispatch_frame(&frame);

            if summary.dispatched.is_multiple_of(100) {
                debug!(frames = summary.dispatched, "dispatcher progress");
            }
        }

        info!(
            frames = summary.dispatched,
            superseded = summary.superseded,
            "frame source closed, shutting down"
        );
        for handle in self.handles {
            handle.shutdown().await;
        }
        info!("dispatcher shutdown complete");
        summary
    }

    pub fn spawn(self) -> JoinHandle<DispatchSummary> {
        tokio::spawn(self.run())
    }

    fn dispatch_frame(&self, frame: &Arc<RenderedFrame>) {
        for handle in &self.handles {
            handle.try_send(Arc::clone(frame));
        }
    }
}

/// Build a dispatcher from sink configs
#[instrument(name = "dispatcher_create", skip(sink_configs, subscriber))]
pub async fn create_dispatcher(
    sink_configs: Vec<SinkConfig>,
    subscriber: FrameSubscriber,
) -> Result<Dispatcher, DispatcherError> {
    let config = DispatcherConfig {
        sinks: sink_configs,
    };
    DispatcherBuilder::new(config, subscriber).build().await
}
