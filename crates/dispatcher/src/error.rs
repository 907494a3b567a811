//! Dispatcher error types

use contracts::{ContractError, SinkType};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatcherError {
    /// A configured sink could not be brought up
    #[error("{kind:?} sink '{name}' failed to start")]
    SinkCreation {
        name: String,
        kind: SinkType,
        #[source]
        source: ContractError,
    },

    /// Two sinks share a name; per-sink metrics are keyed by it
    #[error("sink name '{0}' is used more than once")]
    DuplicateSink(String),
}

impl DispatcherError {
    pub fn sink_creation(name: impl Into<String>, kind: SinkType, source: ContractError) -> Self {
        Self::SinkCreation {
            name: name.into(),
            kind,
            source,
        }
    }
}
