//! # Ingestion
//!
//! Sensor-side half of the capture loop.
//!
//! Responsibilities:
//! - Bus and control-channel seams (`SpiBus`, `DeviceControl`)
//! - Packet resynchronization and desync reboots (`PacketReader`)
//! - Per-segment storage and frame completion (`SegmentAssembler`)
//! - Scripted and synthetic buses for running without a sensor
//!
//! ## Usage
//!
//! ```ignore
//! use ingestion::{PacketReader, ReaderSettings, SegmentAssembler, SegmentRun, ReadOutcome, Absorb};
//!
//! let mut reader = PacketReader::new(bus, device, settings);
//! let mut assembler = SegmentAssembler::new(variant, gate);
//! let mut run = SegmentRun::new();
//!
//! let read = reader.read_segment(&mut run, &stop)?;
//! if let ReadOutcome::Complete { segment } = read.outcome {
//!     if assembler.absorb(segment, run.as_bytes()) == Absorb::FrameReady {
//!         // render assembler.frame()
//!     }
//! }
//! ```

mod assembler;
mod bus;
mod error;
#[cfg(feature = "hardware")]
mod hardware;
mod mock;
mod reader;

pub use assembler::{Absorb, SegmentAssembler};
pub use bus::{DeviceControl, SpiBus};
pub use error::{IngestionError, Result};
#[cfg(feature = "hardware")]
pub use hardware::{CciDevice, SpidevBus};
pub use mock::{
    packet, segment_packets, segment_packets_with, ScriptedBus, ScriptedDevice, SyntheticBus,
    SyntheticConfig,
};
pub use reader::{
    PacketReader, PacketStatus, ReadOutcome, ReaderSettings, ReaderStats, SegmentRead, SegmentRun,
    RESYNC_REBOOT_THRESHOLD,
};
