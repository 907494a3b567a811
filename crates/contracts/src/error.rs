//! Errors shared across crate boundaries.
//!
//! Each crate keeps its own error enum and converts into [`ContractError`]
//! where the failure has to cross into another crate (sinks, config, CLI).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("cannot parse config: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A value parsed but is out of range or inconsistent with its neighbours
    #[error("invalid config value '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// `/dev/spidev0.{bus}` failed to open, configure or read
    #[error("spi bus {bus}: {message}")]
    Bus { bus: u8, message: String },

    #[error("sink '{sink_name}' failed to write: {message}")]
    SinkWrite { sink_name: String, message: String },

    #[error("sink '{sink_name}' cannot connect: {message}")]
    SinkConnection { sink_name: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ContractError {
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}
