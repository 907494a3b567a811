//! RangeEstimator - per-frame scaling bounds

use contracts::{FrameView, RangeBound, RenderSettings, ScaleBounds};
use metrics::gauge;
use tracing::trace;

/// Bounds used before the first auto scan succeeds
pub const DEFAULT_RANGE_MIN: u16 = 30_000;
pub const DEFAULT_RANGE_MAX: u16 = 32_000;

/// Resolves the min/max used to scale each frame
///
/// Fixed bounds never change after construction. Auto bounds are rescanned on
/// every frame; a frame without a single nonzero sample keeps the previous
/// bounds.
#[derive(Debug, Clone)]
pub struct RangeEstimator {
    min_bound: RangeBound,
    max_bound: RangeBound,
    current: ScaleBounds,
    /// Scan maximum of the most recent auto scan
    peak: Option<u16>,
}

impl RangeEstimator {
    pub fn new(min_bound: RangeBound, max_bound: RangeBound) -> Self {
        let current = ScaleBounds::new(
            min_bound.fixed().unwrap_or(DEFAULT_RANGE_MIN),
            max_bound.fixed().unwrap_or(DEFAULT_RANGE_MAX),
        );
        Self {
            min_bound,
            max_bound,
            current,
            peak: None,
        }
    }

    pub fn from_settings(settings: &RenderSettings) -> Self {
        Self::new(settings.range_min, settings.range_max)
    }

    /// Whether either bound is recomputed per frame
    pub fn is_auto(&self) -> bool {
        self.min_bound.is_auto() || self.max_bound.is_auto()
    }

    /// Bounds for `frame`
    pub fn compute_bounds(&mut self, frame: &FrameView<'_>) -> ScaleBounds {
        if !self.is_auto() {
            return self.current;
        }

        // Widening search: max rises from the floor, min falls from the ceiling
        let mut max = u16::MIN;
        let mut min = u16::MAX;
        for (_, shelf) in frame.segments() {
            for (_, value) in shelf.samples() {
                if value == 0 {
                    continue;
                }
                max = max.max(value);
                min = min.min(value);
            }
        }
        if max == 0 {
            trace!("no nonzero samples, keeping previous bounds");
            return self.current;
        }

        if self.max_bound.is_auto() {
            self.peak = Some(max);
        }
        let min = self.min_bound.fixed().unwrap_or(min);
        let max = self.max_bound.fixed().unwrap_or(max);
        self.current = ScaleBounds::new(min, max);
        gauge!("lepton_range_min").set(f64::from(min));
        gauge!("lepton_range_max").set(f64::from(max));
        self.current
    }

    /// Bounds applied to the last frame
    pub fn current(&self) -> ScaleBounds {
        self.current
    }

    /// Hottest sample seen by the latest auto-max scan that found one
    pub fn last_peak(&self) -> Option<u16> {
        self.peak
    }
}
