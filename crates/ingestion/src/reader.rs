//! PacketReader - resynchronizing packet reader
//!
//! Reads one 60-packet segment run per attempt. A packet whose number differs
//! from the expected index restarts the run; too many restarts in one attempt
//! means the bus lost sync and the sensor is rebooted.

use std::thread;
use std::time::Duration;

use contracts::{
    packet_number, segment_number, LogGate, SensorVariant, StopSignal, TimingSettings,
    LEVEL_RESET_SUMMARY, LEVEL_SEGMENT_DETAIL, PACKETS_PER_SEGMENT, PACKET_SIZE, SEGMENT_BYTES,
    SEGMENT_ID_PACKET,
};
use metrics::counter;
use tracing::{debug, info, instrument, warn};

use crate::bus::{DeviceControl, SpiBus};
use crate::error::{IngestionError, Result};

/// Consecutive restarts within one attempt that trigger a sensor reboot
pub const RESYNC_REBOOT_THRESHOLD: u32 = 750;

/// Attempts needing at least this many restarts get a summary log line
const RESET_SUMMARY_THRESHOLD: u32 = 30;

/// Reader settings, fixed before the worker starts
#[derive(Debug, Clone)]
pub struct ReaderSettings {
    pub bus_index: u8,
    pub speed_hz: u32,
    pub variant: SensorVariant,
    pub mismatch_backoff: Duration,
    pub reboot_settle: Duration,
    pub gate: LogGate,
}

impl ReaderSettings {
    pub fn new(bus_index: u8, speed_hz: u32, variant: SensorVariant, timing: &TimingSettings) -> Self {
        Self {
            bus_index,
            speed_hz,
            variant,
            mismatch_backoff: timing.mismatch_backoff(),
            reboot_settle: timing.reboot_settle(),
            gate: LogGate::default(),
        }
    }

    pub fn with_gate(mut self, gate: LogGate) -> Self {
        self.gate = gate;
        self
    }
}

/// Outcome of a single `poll`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketStatus {
    /// Packet number matched the expected index
    Accepted,
    /// Transient sync loss; the caller restarts at index 0
    Mismatch { got: u8 },
    /// The mismatch reached the reboot threshold; the bus was cycled
    Rebooted,
}

/// One segment run being filled packet by packet
///
/// Valid only for the attempt that filled it.
pub struct SegmentRun {
    bytes: Box<[u8]>,
}

impl Default for SegmentRun {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentRun {
    pub fn new() -> Self {
        Self {
            bytes: vec![0u8; SEGMENT_BYTES].into_boxed_slice(),
        }
    }

    pub fn packet(&self, index: usize) -> &[u8] {
        &self.bytes[index * PACKET_SIZE..(index + 1) * PACKET_SIZE]
    }

    fn packet_mut(&mut self, index: usize) -> &mut [u8] {
        &mut self.bytes[index * PACKET_SIZE..(index + 1) * PACKET_SIZE]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Result of one segment read attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// 60 in-sequence packets; `segment` is 1 for single-segment sensors
    Complete { segment: u8 },
    /// Segment nibble at packet 20 was outside 1..=4; attempt aborted
    InvalidSegment { segment: u8 },
    /// Stop signal observed
    Stopped,
}

/// Attempt summary handed back to the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentRead {
    pub outcome: ReadOutcome,
    /// Sequence restarts during this attempt
    pub resets: u32,
    /// Sensor reboots during this attempt; warning streaks must be cleared when non-zero
    pub reboots: u32,
}

/// Lifetime counters of one reader instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    pub packets_accepted: u64,
    pub resyncs: u64,
    pub reboots: u64,
}

/// Packet reader over a bus and its control channel
pub struct PacketReader<B, D> {
    bus: B,
    device: D,
    settings: ReaderSettings,
    is_open: bool,
    /// Consecutive restarts since the last full read or reboot
    resets: u32,
    stats: ReaderStats,
}

impl<B: SpiBus, D: DeviceControl> PacketReader<B, D> {
    pub fn new(bus: B, device: D, settings: ReaderSettings) -> Self {
        Self {
            bus,
            device,
            settings,
            is_open: false,
            resets: 0,
            stats: ReaderStats::default(),
        }
    }

    /// Open the bus if it is not open yet
    pub fn ensure_open(&mut self) -> Result<()> {
        if self.is_open {
            return Ok(());
        }
        let ReaderSettings {
            bus_index,
            speed_hz,
            ..
        } = self.settings;
        self.bus
            .open(bus_index, speed_hz)
            .map_err(|source| IngestionError::BusOpen {
                bus: bus_index,
                speed_hz,
                source,
            })?;
        self.is_open = true;
        debug!(bus = bus_index, speed_hz, "spi bus opened");
        Ok(())
    }

    /// Close the bus
    pub fn close(&mut self) {
        if self.is_open {
            self.bus.close();
            self.is_open = false;
            debug!(bus = self.settings.bus_index, "spi bus closed");
        }
    }

    /// Read one packet and check it against `expected`
    ///
    /// On mismatch the restart counter is incremented and the reader backs off
    /// briefly; on reaching the reboot threshold the sensor is rebooted.
    pub fn poll(&mut self, expected: usize, packet: &mut [u8]) -> Result<PacketStatus> {
        if let Err(source) = self.bus.read_packet(packet) {
            self.close();
            return Err(IngestionError::BusRead {
                bus: self.settings.bus_index,
                source,
            });
        }

        let got = packet_number(packet);
        if usize::from(got) == expected {
            self.stats.packets_accepted += 1;
            return Ok(PacketStatus::Accepted);
        }

        self.resets += 1;
        self.stats.resyncs += 1;
        counter!("lepton_resyncs_total").increment(1);
        pause(self.settings.mismatch_backoff);

        if self.resets >= RESYNC_REBOOT_THRESHOLD {
            self.reboot_sensor()?;
            return Ok(PacketStatus::Rebooted);
        }
        Ok(PacketStatus::Mismatch { got })
    }

    /// Read a complete segment run into `run`
    #[instrument(name = "reader_read_segment", skip_all, level = "trace")]
    pub fn read_segment(&mut self, run: &mut SegmentRun, stop: &StopSignal) -> Result<SegmentRead> {
        self.ensure_open()?;
        self.resets = 0;

        let mut attempt_resets = 0u32;
        let mut reboots = 0u32;
        let mut index = 0usize;
        let mut segment = 1u8;

        let outcome = loop {
            if index == PACKETS_PER_SEGMENT {
                break ReadOutcome::Complete { segment };
            }
            if stop.is_stopped() {
                break ReadOutcome::Stopped;
            }

            match self.poll(index, run.packet_mut(index))? {
                PacketStatus::Accepted => {
                    if self.settings.variant.is_segmented() && index == SEGMENT_ID_PACKET {
                        segment = segment_number(run.packet(index));
                        if !(1..=4).contains(&segment) {
                            if self.settings.gate.allows(LEVEL_SEGMENT_DETAIL) {
                                warn!(segment, "wrong segment number");
                            }
                            break ReadOutcome::InvalidSegment { segment };
                        }
                    }
                    index += 1;
                }
                PacketStatus::Mismatch { .. } => {
                    attempt_resets += 1;
                    index = 0;
                }
                PacketStatus::Rebooted => {
                    attempt_resets += 1;
                    reboots += 1;
                    index = 0;
                }
            }
        };

        if attempt_resets >= RESET_SUMMARY_THRESHOLD
            && self.settings.gate.allows(LEVEL_RESET_SUMMARY)
        {
            info!(resets = attempt_resets, "done reading");
        }

        Ok(SegmentRead {
            outcome,
            resets: attempt_resets,
            reboots,
        })
    }

    /// Close, reboot, settle, reopen
    fn reboot_sensor(&mut self) -> Result<()> {
        warn!(
            resets = self.resets,
            settle_ms = self.settings.reboot_settle.as_millis() as u64,
            "bus desynchronized, rebooting sensor"
        );
        self.close();
        if let Err(e) = self.device.reboot() {
            warn!(error = %e, "sensor reboot command failed");
        }
        self.resets = 0;
        self.stats.reboots += 1;
        counter!("lepton_reboots_total").increment(1);
        pause(self.settings.reboot_settle);
        self.ensure_open()
    }

    /// Consecutive restarts since the last full read or reboot
    pub fn resets(&self) -> u32 {
        self.resets
    }

    pub fn stats(&self) -> ReaderStats {
        self.stats
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn settings(&self) -> &ReaderSettings {
        &self.settings
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn device(&self) -> &D {
        &self.device
    }
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{packet, segment_packets, ScriptedBus, ScriptedDevice};

    fn settings(variant: SensorVariant) -> ReaderSettings {
        ReaderSettings::new(0, 20_000_000, variant, &TimingSettings::immediate())
    }

    fn reader(bus: ScriptedBus, variant: SensorVariant) -> PacketReader<ScriptedBus, ScriptedDevice> {
        PacketReader::new(bus, ScriptedDevice::new(), settings(variant))
    }

    #[test]
    fn test_sequential_run_completes() {
        let bus = ScriptedBus::from_packets(segment_packets(0, 100));
        let mut reader = reader(bus, SensorVariant::SingleSegment);
        let mut run = SegmentRun::new();

        let read = reader.read_segment(&mut run, &StopSignal::new()).unwrap();
        assert_eq!(read.outcome, ReadOutcome::Complete { segment: 1 });
        assert_eq!(read.resets, 0);
        assert_eq!(read.reboots, 0);
        assert_eq!(run.packet(59)[1], 59);
    }

    #[test]
    fn test_mismatch_resets_index_and_counts_once() {
        let bus = ScriptedBus::from_packets(vec![packet(0, 5, 100)]);
        let mut reader = reader(bus, SensorVariant::SingleSegment);
        reader.ensure_open().unwrap();
        let mut buf = [0u8; PACKET_SIZE];

        let status = reader.poll(0, &mut buf).unwrap();
        assert_eq!(status, PacketStatus::Mismatch { got: 5 });
        assert_eq!(reader.resets(), 1);
        assert_eq!(reader.stats().resyncs, 1);
    }

    #[test]
    fn test_out_of_sequence_packet_restarts_run() {
        let mut packets = segment_packets(0, 100);
        // Packet 10 goes missing: the run restarts from 0 and the next full run completes
        packets.remove(10);
        packets.extend(segment_packets(0, 200));
        let bus = ScriptedBus::from_packets(packets);
        let mut reader = reader(bus, SensorVariant::SingleSegment);
        let mut run = SegmentRun::new();

        let read = reader.read_segment(&mut run, &StopSignal::new()).unwrap();
        assert_eq!(read.outcome, ReadOutcome::Complete { segment: 1 });
        assert!(read.resets >= 1);
        assert_eq!(contracts::read_word(run.packet(0), 2), 200);
    }

    #[test]
    fn test_reboot_after_threshold() {
        let mut packets = vec![packet(0, 59, 100); RESYNC_REBOOT_THRESHOLD as usize];
        packets.extend(segment_packets(0, 100));
        let bus = ScriptedBus::from_packets(packets);
        let mut reader = reader(bus, SensorVariant::SingleSegment);
        let mut run = SegmentRun::new();

        let read = reader.read_segment(&mut run, &StopSignal::new()).unwrap();
        assert_eq!(read.outcome, ReadOutcome::Complete { segment: 1 });
        assert_eq!(read.reboots, 1);
        assert_eq!(reader.device().reboots(), 1);
        assert_eq!(reader.resets(), 0);
        assert_eq!(reader.bus().opens(), 2);
        assert_eq!(reader.bus().closes(), 1);
    }

    #[test]
    fn test_failed_reboot_command_still_recovers() {
        let mut packets = vec![packet(0, 59, 100); RESYNC_REBOOT_THRESHOLD as usize];
        packets.extend(segment_packets(0, 100));
        let bus = ScriptedBus::from_packets(packets);
        let mut reader =
            PacketReader::new(bus, ScriptedDevice::failing(), settings(SensorVariant::SingleSegment));
        let mut run = SegmentRun::new();

        let read = reader.read_segment(&mut run, &StopSignal::new()).unwrap();
        assert_eq!(read.outcome, ReadOutcome::Complete { segment: 1 });
        assert_eq!(read.reboots, 1);
        assert_eq!(reader.device().reboots(), 1);
        assert_eq!(reader.resets(), 0);
        assert_eq!(reader.bus().closes(), 1);
        assert_eq!(reader.bus().opens(), 2);
        assert!(reader.is_open());
    }

    #[test]
    fn test_unopenable_bus_reports_open_error() {
        let mut reader = reader(ScriptedBus::unopenable(), SensorVariant::SingleSegment);
        let mut run = SegmentRun::new();

        let err = reader.read_segment(&mut run, &StopSignal::new()).unwrap_err();
        assert!(matches!(err, IngestionError::BusOpen { bus: 0, .. }));
        assert!(!reader.is_open());
        assert_eq!(reader.stats().packets_accepted, 0);
    }

    #[test]
    fn test_just_below_threshold_does_not_reboot() {
        let mut packets = vec![packet(0, 59, 100); RESYNC_REBOOT_THRESHOLD as usize - 1];
        packets.extend(segment_packets(0, 100));
        let bus = ScriptedBus::from_packets(packets);
        let mut reader = reader(bus, SensorVariant::SingleSegment);
        let mut run = SegmentRun::new();

        let read = reader.read_segment(&mut run, &StopSignal::new()).unwrap();
        assert_eq!(read.reboots, 0);
        assert_eq!(read.resets, RESYNC_REBOOT_THRESHOLD - 1);
        assert_eq!(reader.device().reboots(), 0);
    }

    #[test]
    fn test_segment_id_extracted_at_packet_20() {
        let bus = ScriptedBus::from_packets(segment_packets(3, 100));
        let mut reader = reader(bus, SensorVariant::MultiSegment);
        let mut run = SegmentRun::new();

        let read = reader.read_segment(&mut run, &StopSignal::new()).unwrap();
        assert_eq!(read.outcome, ReadOutcome::Complete { segment: 3 });
    }

    #[test]
    fn test_invalid_segment_aborts_attempt() {
        let bus = ScriptedBus::from_packets(segment_packets(0, 100));
        let mut reader = reader(bus, SensorVariant::MultiSegment);
        let mut run = SegmentRun::new();

        let read = reader.read_segment(&mut run, &StopSignal::new()).unwrap();
        assert_eq!(read.outcome, ReadOutcome::InvalidSegment { segment: 0 });
        // Aborted right after packet 20
        assert_eq!(reader.stats().packets_accepted, 21);
    }

    #[test]
    fn test_single_segment_ignores_nibble() {
        let bus = ScriptedBus::from_packets(segment_packets(7, 100));
        let mut reader = reader(bus, SensorVariant::SingleSegment);
        let mut run = SegmentRun::new();

        let read = reader.read_segment(&mut run, &StopSignal::new()).unwrap();
        assert_eq!(read.outcome, ReadOutcome::Complete { segment: 1 });
    }

    #[test]
    fn test_stop_signal_checked_before_reads() {
        let bus = ScriptedBus::from_packets(segment_packets(0, 100));
        let mut reader = reader(bus, SensorVariant::SingleSegment);
        let mut run = SegmentRun::new();
        let stop = StopSignal::new();
        stop.stop();

        let read = reader.read_segment(&mut run, &stop).unwrap();
        assert_eq!(read.outcome, ReadOutcome::Stopped);
        assert_eq!(reader.stats().packets_accepted, 0);
    }

    #[test]
    fn test_read_error_closes_bus() {
        let bus = ScriptedBus::from_packets(Vec::new());
        let mut reader = reader(bus, SensorVariant::SingleSegment);
        let mut run = SegmentRun::new();

        let err = reader.read_segment(&mut run, &StopSignal::new()).unwrap_err();
        assert!(matches!(err, IngestionError::BusRead { .. }));
        assert!(!reader.is_open());
    }
}
