//! Sink implementations
//!
//! Contains LogSink and NetworkSink.

mod log;
mod network;

pub use self::log::LogSink;
pub use self::network::{NetworkFormat, NetworkSink, NetworkSinkConfig};
