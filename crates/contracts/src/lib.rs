//! # Contracts
//!
//! Frozen interface contracts shared by every capture crate.
//! Business crates only depend on this crate, never on each other's internals.
//!
//! ## Wire model
//! - One packet is 164 bytes: a 4-byte header (two words) and 80 big-endian samples
//! - 60 packets form one segment; a frame is one segment (80x60) or four (160x120)

mod config;
mod error;
mod frame;
mod log_gate;
mod runtime;
mod shelf;
mod sink;
mod wire;

pub use config::*;
pub use error::*;
pub use frame::*;
pub use log_gate::*;
pub use runtime::StopSignal;
pub use shelf::{FrameView, Shelf};
pub use sink::*;
pub use wire::*;
