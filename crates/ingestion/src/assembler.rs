//! SegmentAssembler - per-segment shelves and frame completion

use contracts::{
    FrameView, LogGate, SensorVariant, Shelf, LEVEL_RECOVERY, LEVEL_STREAK_WARNING,
};
use tracing::{info, warn};

/// Consecutive invalid segment ids between two warnings
const STREAK_WARNING_INTERVAL: u32 = 12;

/// Result of absorbing one segment run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Absorb {
    /// Shelves now hold a complete frame
    FrameReady,
    /// Stored, frame not complete yet
    Incomplete,
    /// Segment id out of range; shelves untouched
    Invalid,
}

/// Keeps the latest run of every segment and reports when a frame is complete
///
/// Every arrival of the terminal segment completes a frame built from whatever
/// the shelves hold. Shelves are overwritten, never cleared, so a segment lost
/// in transit leaves its previous run in place. Shelves never written hold
/// zero samples, which the renderer rejects.
pub struct SegmentAssembler {
    variant: SensorVariant,
    shelves: Vec<Shelf>,
    invalid_streak: u32,
    gate: LogGate,
}

impl SegmentAssembler {
    pub fn new(variant: SensorVariant, gate: LogGate) -> Self {
        Self {
            variant,
            shelves: vec![Shelf::new(); variant.segment_count()],
            invalid_streak: 0,
            gate,
        }
    }

    /// Store `run` on the shelf of `segment`
    pub fn absorb(&mut self, segment: u8, run: &[u8]) -> Absorb {
        if segment == 0 || usize::from(segment) > self.variant.segment_count() {
            self.record_invalid(segment);
            return Absorb::Invalid;
        }
        self.record_valid();

        self.shelves[usize::from(segment - 1)].write(run);

        if segment == self.variant.terminal_segment() {
            Absorb::FrameReady
        } else {
            Absorb::Incomplete
        }
    }

    /// Count an invalid segment id reported outside `absorb` (aborted read)
    pub fn record_invalid(&mut self, segment: u8) {
        self.invalid_streak += 1;
        if self.invalid_streak % STREAK_WARNING_INTERVAL == 0
            && self.gate.allows(LEVEL_STREAK_WARNING)
        {
            warn!(
                segment,
                streak = self.invalid_streak,
                "invalid segment number"
            );
        }
    }

    fn record_valid(&mut self) {
        if self.invalid_streak > 0 {
            if self.gate.allows(LEVEL_RECOVERY) {
                info!(
                    streak = self.invalid_streak,
                    "segment numbers valid again"
                );
            }
            self.invalid_streak = 0;
        }
    }

    /// Reset the warning streak (after a sensor reboot)
    pub fn clear_warnings(&mut self) {
        self.invalid_streak = 0;
    }

    pub fn invalid_streak(&self) -> u32 {
        self.invalid_streak
    }

    /// View of the shelves as they are now
    pub fn frame(&self) -> FrameView<'_> {
        FrameView::new(self.variant, &self.shelves)
    }

    pub fn variant(&self) -> SensorVariant {
        self.variant
    }
}
