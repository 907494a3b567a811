//! Shelf / FrameView - raw segment storage shared by assembly, ranging and rendering

use crate::{is_header_word, read_word, SensorVariant, SEGMENT_BYTES, SEGMENT_WORDS};

/// Raw bytes of one segment's most recently completed packet run
///
/// Overwritten wholesale on the next write for that segment, never cleared.
#[derive(Clone, PartialEq, Eq)]
pub struct Shelf {
    bytes: Box<[u8]>,
}

impl std::fmt::Debug for Shelf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shelf").field("len", &self.bytes.len()).finish()
    }
}

impl Default for Shelf {
    fn default() -> Self {
        Self::new()
    }
}

impl Shelf {
    pub fn new() -> Self {
        Self {
            bytes: vec![0u8; SEGMENT_BYTES].into_boxed_slice(),
        }
    }

    /// Build a shelf from a complete run
    ///
    /// # Panics
    /// If `run` is not exactly one segment long.
    pub fn from_run(run: &[u8]) -> Self {
        let mut shelf = Self::new();
        shelf.write(run);
        shelf
    }

    /// Replace the shelf content with a complete run
    ///
    /// # Panics
    /// If `run` is not exactly one segment long.
    pub fn write(&mut self, run: &[u8]) {
        self.bytes.copy_from_slice(run);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Image samples as `(word_index, value)`, header words skipped
    pub fn samples(&self) -> impl Iterator<Item = (usize, u16)> + '_ {
        (0..SEGMENT_WORDS)
            .filter(|&index| !is_header_word(index))
            .map(move |index| (index, read_word(&self.bytes, index)))
    }
}

/// Borrowed view of every shelf composing one frame
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    variant: SensorVariant,
    shelves: &'a [Shelf],
}

impl<'a> FrameView<'a> {
    /// # Panics
    /// If the number of shelves does not match the variant.
    pub fn new(variant: SensorVariant, shelves: &'a [Shelf]) -> Self {
        assert_eq!(
            shelves.len(),
            variant.segment_count(),
            "shelf count does not match sensor variant"
        );
        Self { variant, shelves }
    }

    pub fn variant(&self) -> SensorVariant {
        self.variant
    }

    /// Shelves paired with their 1-based segment id
    pub fn segments(&self) -> impl Iterator<Item = (u8, &'a Shelf)> + 'a {
        self.shelves
            .iter()
            .enumerate()
            .map(|(idx, shelf)| (idx as u8 + 1, shelf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PACKETS_PER_SEGMENT, SAMPLES_PER_PACKET};

    #[test]
    fn test_samples_skip_header_words() {
        let mut run = vec![0xffu8; SEGMENT_BYTES];
        run[4] = 0x01;
        run[5] = 0x02;
        let shelf = Shelf::from_run(&run);

        let samples: Vec<_> = shelf.samples().collect();
        assert_eq!(samples.len(), SAMPLES_PER_PACKET * PACKETS_PER_SEGMENT);
        assert_eq!(samples[0], (2, 0x0102));
        assert!(samples.iter().all(|(idx, _)| !is_header_word(*idx)));
    }

    #[test]
    fn test_segments_are_one_based() {
        let shelves = vec![Shelf::new(); 4];
        let view = FrameView::new(SensorVariant::MultiSegment, &shelves);
        let ids: Vec<u8> = view.segments().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    #[should_panic(expected = "shelf count")]
    fn view_rejects_wrong_shelf_count() {
        let shelves = vec![Shelf::new()];
        let _ = FrameView::new(SensorVariant::MultiSegment, &shelves);
    }
}
