//! Wire layout of the sensor's SPI video stream.

use serde::{Deserialize, Serialize};

/// Bytes per packet on the bus
pub const PACKET_SIZE: usize = 164;

/// 16-bit words per packet (header words included)
pub const PACKET_WORDS: usize = PACKET_SIZE / 2;

/// Leading words of every packet that carry ID/CRC, never image data
pub const HEADER_WORDS: usize = 2;

/// Image samples carried by one packet
pub const SAMPLES_PER_PACKET: usize = PACKET_WORDS - HEADER_WORDS;

/// Packets per segment
pub const PACKETS_PER_SEGMENT: usize = 60;

/// Bytes in one complete segment run
pub const SEGMENT_BYTES: usize = PACKET_SIZE * PACKETS_PER_SEGMENT;

/// Words in one complete segment run
pub const SEGMENT_WORDS: usize = PACKET_WORDS * PACKETS_PER_SEGMENT;

/// Packet index at which multi-segment sensors report the segment number
pub const SEGMENT_ID_PACKET: usize = 20;

/// Rows contributed by one segment of a multi-segment frame
pub const ROWS_PER_SEGMENT: usize = 30;

/// Sensor variant (frame geometry)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorVariant {
    /// 80x60, one segment per frame (Lepton 2.x)
    #[default]
    SingleSegment,
    /// 160x120, four 30-row segments per frame (Lepton 3.x)
    MultiSegment,
}

impl SensorVariant {
    /// Frame width in pixels
    pub const fn width(self) -> usize {
        match self {
            Self::SingleSegment => 80,
            Self::MultiSegment => 160,
        }
    }

    /// Frame height in pixels
    pub const fn height(self) -> usize {
        match self {
            Self::SingleSegment => 60,
            Self::MultiSegment => 120,
        }
    }

    /// Number of segments (and shelves) composing one frame
    pub const fn segment_count(self) -> usize {
        match self {
            Self::SingleSegment => 1,
            Self::MultiSegment => 4,
        }
    }

    /// Segment id whose arrival completes a frame
    pub const fn terminal_segment(self) -> u8 {
        self.segment_count() as u8
    }

    /// Whether packets carry a segment id nibble
    pub const fn is_segmented(self) -> bool {
        matches!(self, Self::MultiSegment)
    }

    /// Map the command-line sensor generation (2 or 3) to a variant
    pub fn from_generation(generation: u8) -> Option<Self> {
        match generation {
            2 => Some(Self::SingleSegment),
            3 => Some(Self::MultiSegment),
            _ => None,
        }
    }
}

/// Packet number carried in byte 1
#[inline]
pub fn packet_number(packet: &[u8]) -> u8 {
    packet[1]
}

/// Segment id carried in the high nibble of byte 0
#[inline]
pub fn segment_number(packet: &[u8]) -> u8 {
    (packet[0] >> 4) & 0x0f
}

/// Big-endian word `index` of a raw byte run
#[inline]
pub fn read_word(raw: &[u8], index: usize) -> u16 {
    u16::from_be_bytes([raw[index * 2], raw[index * 2 + 1]])
}

/// Whether word `index` of a segment run is a header word
#[inline]
pub fn is_header_word(index: usize) -> bool {
    index % PACKET_WORDS < HEADER_WORDS
}
