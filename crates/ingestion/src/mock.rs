//! Mock bus and device
//!
//! Used for tests and for running without a sensor attached.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::thread;
use std::time::Duration;

use contracts::{
    SensorVariant, PACKETS_PER_SEGMENT, PACKET_SIZE, PACKET_WORDS, SAMPLES_PER_PACKET,
    SEGMENT_ID_PACKET,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::bus::{DeviceControl, SpiBus};

/// Build one packet: segment nibble in byte 0, number in byte 1, every sample `value`
pub fn packet(segment: u8, number: u8, value: u16) -> Vec<u8> {
    let mut raw = vec![0u8; PACKET_SIZE];
    raw[0] = (segment & 0x0f) << 4;
    raw[1] = number;
    for word in 2..PACKET_WORDS {
        raw[word * 2..word * 2 + 2].copy_from_slice(&value.to_be_bytes());
    }
    raw
}

/// Build a full in-sequence run; the segment id sits on packet 20 only
pub fn segment_packets(segment: u8, value: u16) -> Vec<Vec<u8>> {
    (0..PACKETS_PER_SEGMENT)
        .map(|number| {
            let id = if number == SEGMENT_ID_PACKET { segment } else { 0 };
            packet(id, number as u8, value)
        })
        .collect()
}

/// Build a full run whose samples come from `sample(packet, sample_index)`
pub fn segment_packets_with(
    segment: u8,
    mut sample: impl FnMut(usize, usize) -> u16,
) -> Vec<Vec<u8>> {
    (0..PACKETS_PER_SEGMENT)
        .map(|number| {
            let id = if number == SEGMENT_ID_PACKET { segment } else { 0 };
            let mut raw = packet(id, number as u8, 0);
            for idx in 0..SAMPLES_PER_PACKET {
                let word = idx + 2;
                raw[word * 2..word * 2 + 2].copy_from_slice(&sample(number, idx).to_be_bytes());
            }
            raw
        })
        .collect()
}

/// Bus replaying a fixed packet script
///
/// Reading past the end of the script fails with `UnexpectedEof`.
#[derive(Debug, Default)]
pub struct ScriptedBus {
    script: VecDeque<Vec<u8>>,
    opens: usize,
    closes: usize,
    fail_open: bool,
}

impl ScriptedBus {
    pub fn from_packets(packets: impl IntoIterator<Item = Vec<u8>>) -> Self {
        Self {
            script: packets.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Bus whose `open` always fails
    pub fn unopenable() -> Self {
        Self {
            fail_open: true,
            ..Default::default()
        }
    }

    pub fn opens(&self) -> usize {
        self.opens
    }

    pub fn closes(&self) -> usize {
        self.closes
    }
}

impl SpiBus for ScriptedBus {
    fn open(&mut self, _bus_index: u8, _speed_hz: u32) -> io::Result<()> {
        if self.fail_open {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such device"));
        }
        self.opens += 1;
        Ok(())
    }

    fn close(&mut self) {
        self.closes += 1;
    }

    fn read_packet(&mut self, packet: &mut [u8]) -> io::Result<()> {
        let next = self
            .script
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "packet script exhausted"))?;
        packet.copy_from_slice(&next);
        Ok(())
    }
}

/// Control channel recording reboots and register writes
#[derive(Debug, Default)]
pub struct ScriptedDevice {
    reboots: usize,
    registers: HashMap<u16, u16>,
    fail_reboot: bool,
}

impl ScriptedDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Device whose reboot command always fails
    pub fn failing() -> Self {
        Self {
            fail_reboot: true,
            ..Default::default()
        }
    }

    pub fn reboots(&self) -> usize {
        self.reboots
    }
}

impl DeviceControl for ScriptedDevice {
    fn reboot(&mut self) -> io::Result<()> {
        self.reboots += 1;
        if self.fail_reboot {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "device busy"));
        }
        Ok(())
    }

    fn read_register(&mut self, register: u16) -> io::Result<u16> {
        Ok(self.registers.get(&register).copied().unwrap_or(0))
    }

    fn write_register(&mut self, register: u16, value: u16) -> io::Result<()> {
        self.registers.insert(register, value);
        Ok(())
    }
}

/// Synthetic sensor configuration
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub variant: SensorVariant,
    /// Background level in raw sensor units
    pub baseline: u16,
    /// Peak height of the moving hot spot above baseline
    pub hotspot: u16,
    /// Per-sample noise amplitude
    pub noise: u16,
    /// Probability that a packet is replaced by an out-of-sequence one
    pub glitch_rate: f64,
    /// Pause after each complete segment
    pub segment_interval: Duration,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            variant: SensorVariant::SingleSegment,
            baseline: 29_800,
            hotspot: 2_400,
            noise: 40,
            glitch_rate: 0.0,
            segment_interval: Duration::from_millis(37),
            seed: 42,
        }
    }
}

/// Endless synthetic stream: a warm spot drifting over a flat background
pub struct SyntheticBus {
    config: SyntheticConfig,
    rng: StdRng,
    /// Next packet number to emit
    number: usize,
    /// Segment id of the run being emitted (1-based)
    segment: u8,
    /// Frames fully emitted so far; drives the hot spot position
    tick: u64,
    open: bool,
}

impl SyntheticBus {
    pub fn new(config: SyntheticConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            number: 0,
            segment: 1,
            tick: 0,
            open: false,
        }
    }

    fn sample(&mut self, number: usize, idx: usize) -> u16 {
        let variant = self.config.variant;
        let (row, col) = match variant {
            SensorVariant::SingleSegment => (number, idx),
            SensorVariant::MultiSegment => (
                number / 2 + 30 * usize::from(self.segment - 1),
                idx + 80 * (number % 2),
            ),
        };
        let width = variant.width() as f64;
        let height = variant.height() as f64;
        let phase = self.tick as f64 * 0.05;
        let cx = width * (0.5 + 0.35 * phase.cos());
        let cy = height * (0.5 + 0.35 * phase.sin());
        let dx = (col as f64 - cx) / width;
        let dy = (row as f64 - cy) / height;
        let falloff = (-(dx * dx + dy * dy) * 40.0).exp();

        let noise = if self.config.noise > 0 {
            self.rng.random_range(0..=self.config.noise)
        } else {
            0
        };
        let value = f64::from(self.config.baseline)
            + f64::from(self.config.hotspot) * falloff
            + f64::from(noise);
        value.clamp(1.0, f64::from(u16::MAX)) as u16
    }

    fn advance(&mut self) {
        self.number += 1;
        if self.number < PACKETS_PER_SEGMENT {
            return;
        }
        self.number = 0;
        if self.segment == self.config.variant.terminal_segment() {
            self.segment = 1;
            self.tick += 1;
        } else {
            self.segment += 1;
        }
        if !self.config.segment_interval.is_zero() {
            thread::sleep(self.config.segment_interval);
        }
    }
}

impl SpiBus for SyntheticBus {
    fn open(&mut self, bus_index: u8, speed_hz: u32) -> io::Result<()> {
        debug!(bus = bus_index, speed_hz, "synthetic bus opened");
        self.open = true;
        self.number = 0;
        self.segment = 1;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn read_packet(&mut self, packet: &mut [u8]) -> io::Result<()> {
        if !self.open {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "bus not open"));
        }

        if self.config.glitch_rate > 0.0 && self.rng.random_bool(self.config.glitch_rate) {
            // Discard-style packet: number out of sequence
            packet.fill(0);
            packet[0] = 0x0f;
            packet[1] = 0xff;
            return Ok(());
        }

        let number = self.number;
        let id = if self.config.variant.is_segmented() && number == SEGMENT_ID_PACKET {
            self.segment
        } else {
            0
        };
        packet[0] = (id & 0x0f) << 4;
        packet[1] = number as u8;
        packet[2] = 0;
        packet[3] = 0;
        for idx in 0..SAMPLES_PER_PACKET {
            let value = self.sample(number, idx);
            let word = idx + 2;
            packet[word * 2..word * 2 + 2].copy_from_slice(&value.to_be_bytes());
        }
        self.advance();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{packet_number, read_word, segment_number};

    #[test]
    fn test_packet_builder_layout() {
        let raw = packet(3, 20, 0x1234);
        assert_eq!(raw.len(), PACKET_SIZE);
        assert_eq!(segment_number(&raw), 3);
        assert_eq!(packet_number(&raw), 20);
        assert_eq!(read_word(&raw, 2), 0x1234);
        assert_eq!(read_word(&raw, 81), 0x1234);
    }

    #[test]
    fn test_scripted_bus_exhausts() {
        let mut bus = ScriptedBus::from_packets(vec![packet(0, 0, 1)]);
        let mut buf = [0u8; PACKET_SIZE];
        assert!(bus.read_packet(&mut buf).is_ok());
        let err = bus.read_packet(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_synthetic_bus_emits_sequence() {
        let mut bus = SyntheticBus::new(SyntheticConfig {
            variant: SensorVariant::MultiSegment,
            segment_interval: Duration::ZERO,
            ..Default::default()
        });
        bus.open(0, 20_000_000).unwrap();
        let mut buf = [0u8; PACKET_SIZE];

        for seg in 1..=4u8 {
            for number in 0..PACKETS_PER_SEGMENT {
                bus.read_packet(&mut buf).unwrap();
                assert_eq!(usize::from(packet_number(&buf)), number);
                if number == SEGMENT_ID_PACKET {
                    assert_eq!(segment_number(&buf), seg);
                }
                assert!(read_word(&buf, 2) > 0);
            }
        }
    }

    #[test]
    fn test_synthetic_bus_requires_open() {
        let mut bus = SyntheticBus::new(SyntheticConfig::default());
        let mut buf = [0u8; PACKET_SIZE];
        assert!(bus.read_packet(&mut buf).is_err());
    }
}
