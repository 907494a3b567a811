//! Renderer - raw samples to RGB pixels

use bytes::Bytes;
use contracts::{
    FrameView, ImageFormat, LogGate, RenderedFrame, ScaleBounds, LEVEL_RECOVERY,
    LEVEL_STREAK_WARNING,
};
use metrics::counter;
use tracing::{info, warn};

use crate::colormap::Colormap;
use crate::coords::pixel_coordinate;
use crate::error::CorruptSample;

/// Consecutive dropped frames between two warnings
const STREAK_WARNING_INTERVAL: u32 = 12;

/// Colormap index of one sample
#[inline]
pub fn normalize(sample: u16, bounds: &ScaleBounds) -> usize {
    let scaled = (f32::from(sample) - f32::from(bounds.min)) * bounds.scale;
    scaled.clamp(0.0, 255.0) as usize
}

/// Render `frame` into a complete RGB buffer
///
/// Pure: identical input yields byte-identical output. A zero sample anywhere
/// abandons the frame and no partial buffer is returned.
pub fn render_frame(
    frame: &FrameView<'_>,
    bounds: &ScaleBounds,
    colormap: &Colormap,
    frame_id: u64,
) -> Result<RenderedFrame, CorruptSample> {
    let variant = frame.variant();
    let (width, height) = (variant.width(), variant.height());
    let format = ImageFormat::Rgb8;
    let bpp = format.bytes_per_pixel();
    let mut data = vec![0u8; width * height * bpp];

    for (segment, shelf) in frame.segments() {
        for (word, sample) in shelf.samples() {
            if sample == 0 {
                return Err(CorruptSample { segment, word });
            }
            let Some((row, column)) = pixel_coordinate(variant, segment, word) else {
                continue;
            };
            let offset = (row * width + column) * bpp;
            data[offset..offset + bpp].copy_from_slice(&colormap.lookup(normalize(sample, bounds)));
        }
    }

    Ok(RenderedFrame {
        frame_id,
        width: width as u32,
        height: height as u32,
        format,
        bounds: *bounds,
        data: Bytes::from(data),
    })
}

/// Stateful wrapper around `render_frame`
///
/// Numbers successful frames and rate-limits corrupt-frame warnings.
pub struct Renderer {
    colormap: Colormap,
    gate: LogGate,
    zero_streak: u32,
    next_frame_id: u64,
}

impl Renderer {
    pub fn new(colormap: Colormap, gate: LogGate) -> Self {
        Self {
            colormap,
            gate,
            zero_streak: 0,
            next_frame_id: 1,
        }
    }

    /// Render one frame; `None` when the frame was dropped
    pub fn render(&mut self, frame: &FrameView<'_>, bounds: &ScaleBounds) -> Option<RenderedFrame> {
        match render_frame(frame, bounds, &self.colormap, self.next_frame_id) {
            Ok(rendered) => {
                if self.zero_streak > 0 {
                    if self.gate.allows(LEVEL_RECOVERY) {
                        info!(streak = self.zero_streak, "frames free of zero samples again");
                    }
                    self.zero_streak = 0;
                }
                self.next_frame_id += 1;
                counter!("lepton_frames_rendered_total").increment(1);
                Some(rendered)
            }
            Err(corrupt) => {
                self.zero_streak += 1;
                counter!("lepton_frames_dropped_total", "reason" => "corrupt_sample").increment(1);
                if self.zero_streak % STREAK_WARNING_INTERVAL == 0
                    && self.gate.allows(LEVEL_STREAK_WARNING)
                {
                    warn!(
                        segment = corrupt.segment,
                        word = corrupt.word,
                        streak = self.zero_streak,
                        "zero sample, frame dropped"
                    );
                }
                None
            }
        }
    }

    /// Reset the warning streak (after a sensor reboot)
    pub fn clear_warnings(&mut self) {
        self.zero_streak = 0;
    }

    pub fn zero_streak(&self) -> u32 {
        self.zero_streak
    }

    /// Frames rendered so far
    pub fn rendered(&self) -> u64 {
        self.next_frame_id - 1
    }
}
