//! Word index to pixel coordinate mapping

use contracts::{
    SensorVariant, HEADER_WORDS, PACKET_WORDS, ROWS_PER_SEGMENT, SAMPLES_PER_PACKET, SEGMENT_WORDS,
};

/// Destination `(row, column)` of word `word` of segment `segment` (1-based)
///
/// Returns `None` for header words, words past the run, and segment ids the
/// variant does not have.
///
/// Single segment: one packet is one 80-pixel row.
/// Multi segment: a 160-pixel row spans a packet pair, left half first, and
/// segment `k` covers rows `30 * (k - 1)..30 * k`.
pub fn pixel_coordinate(variant: SensorVariant, segment: u8, word: usize) -> Option<(usize, usize)> {
    if word >= SEGMENT_WORDS || word % PACKET_WORDS < HEADER_WORDS {
        return None;
    }
    if segment == 0 || usize::from(segment) > variant.segment_count() {
        return None;
    }

    let column = word % PACKET_WORDS - HEADER_WORDS;
    match variant {
        SensorVariant::SingleSegment => Some((word / PACKET_WORDS, column)),
        SensorVariant::MultiSegment => {
            let pair = PACKET_WORDS * 2;
            let half = (word % pair) / PACKET_WORDS;
            let row = word / pair + ROWS_PER_SEGMENT * usize::from(segment - 1);
            Some((row, column + SAMPLES_PER_PACKET * half))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_header_words_have_no_pixel() {
        for packet in 0..60 {
            assert_eq!(pixel_coordinate(SensorVariant::SingleSegment, 1, packet * 82), None);
            assert_eq!(pixel_coordinate(SensorVariant::MultiSegment, 2, packet * 82 + 1), None);
        }
    }

    #[test]
    fn test_single_segment_rows_follow_packets() {
        let v = SensorVariant::SingleSegment;
        assert_eq!(pixel_coordinate(v, 1, 2), Some((0, 0)));
        assert_eq!(pixel_coordinate(v, 1, 81), Some((0, 79)));
        assert_eq!(pixel_coordinate(v, 1, 84), Some((1, 0)));
        assert_eq!(pixel_coordinate(v, 1, SEGMENT_WORDS - 1), Some((59, 79)));
    }

    #[test]
    fn test_multi_segment_interleaves_packet_pairs() {
        let v = SensorVariant::MultiSegment;
        // Even packet: left half, odd packet: right half of the same row
        assert_eq!(pixel_coordinate(v, 1, 2), Some((0, 0)));
        assert_eq!(pixel_coordinate(v, 1, 81), Some((0, 79)));
        assert_eq!(pixel_coordinate(v, 1, 84), Some((0, 80)));
        assert_eq!(pixel_coordinate(v, 1, 163), Some((0, 159)));
        assert_eq!(pixel_coordinate(v, 1, 166), Some((1, 0)));
        // Segment offsets stack 30 rows each
        assert_eq!(pixel_coordinate(v, 2, 2), Some((30, 0)));
        assert_eq!(pixel_coordinate(v, 4, SEGMENT_WORDS - 1), Some((119, 159)));
    }

    #[test]
    fn test_unknown_segments_rejected() {
        assert_eq!(pixel_coordinate(SensorVariant::SingleSegment, 2, 2), None);
        assert_eq!(pixel_coordinate(SensorVariant::MultiSegment, 0, 2), None);
        assert_eq!(pixel_coordinate(SensorVariant::MultiSegment, 5, 2), None);
        assert_eq!(pixel_coordinate(SensorVariant::MultiSegment, 1, SEGMENT_WORDS), None);
    }

    #[test]
    fn test_every_pixel_covered_exactly_once() {
        for variant in [SensorVariant::SingleSegment, SensorVariant::MultiSegment] {
            let mut seen = HashSet::new();
            for segment in 1..=variant.segment_count() as u8 {
                for word in 0..SEGMENT_WORDS {
                    if let Some((row, col)) = pixel_coordinate(variant, segment, word) {
                        assert!(row < variant.height() && col < variant.width());
                        assert!(seen.insert((row, col)), "{variant:?} pixel ({row}, {col}) mapped twice");
                    }
                }
            }
            assert_eq!(seen.len(), variant.width() * variant.height());
        }
    }
}
