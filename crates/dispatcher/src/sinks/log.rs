//! LogSink - logs a frame summary via tracing

use std::sync::Arc;

use contracts::{ContractError, FrameSink, RenderedFrame};
use tracing::{info, instrument};

/// Sink that logs one summary line per frame
pub struct LogSink {
    name: String,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl FrameSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_deliver",
        skip(self, frame),
        fields(sink = %self.name, frame_id = frame.frame_id)
    )]
    async fn deliver(&mut self, frame: Arc<RenderedFrame>) -> Result<(), ContractError> {
        info!(
            sink = %self.name,
            frame_id = frame.frame_id,
            width = frame.width,
            height = frame.height,
            range_min = frame.bounds.min,
            range_max = frame.bounds.max,
            bytes = frame.data.len(),
            "frame rendered"
        );
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}
