//! Ingestion error types

use thiserror::Error;

/// Ingestion errors
///
/// Sync loss, desync reboots and invalid segment ids are recovered inside the
/// reader and never surface here; only bus faults do. A failed reboot command
/// is logged and recovery carries on.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Bus could not be opened
    #[error("failed to open spi bus {bus} at {speed_hz} Hz: {source}")]
    BusOpen {
        bus: u8,
        speed_hz: u32,
        #[source]
        source: std::io::Error,
    },

    /// Packet read failed
    #[error("spi read failed on bus {bus}: {source}")]
    BusRead {
        bus: u8,
        #[source]
        source: std::io::Error,
    },
}

impl From<IngestionError> for contracts::ContractError {
    fn from(err: IngestionError) -> Self {
        let bus = match &err {
            IngestionError::BusOpen { bus, .. } | IngestionError::BusRead { bus, .. } => *bus,
        };
        contracts::ContractError::Bus {
            bus,
            message: err.to_string(),
        }
    }
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;
