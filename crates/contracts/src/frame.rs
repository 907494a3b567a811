//! RenderedFrame - Renderer output
//!
//! One complete, displayable frame handed to the sinks.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Scaling bounds applied to one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleBounds {
    /// Raw sample mapped to colormap index 0
    pub min: u16,

    /// Raw sample mapped to colormap index 255
    pub max: u16,

    /// `255 / (max - min)`, or 0 when `max <= min`
    pub scale: f32,
}

impl ScaleBounds {
    /// Build bounds, guarding the degenerate `max <= min` case
    pub fn new(min: u16, max: u16) -> Self {
        let scale = if max > min {
            255.0 / f32::from(max - min)
        } else {
            0.0
        };
        Self { min, max, scale }
    }
}

/// Rendered frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedFrame {
    /// Monotonic sequence of successfully rendered frames
    pub frame_id: u64,

    /// Frame width in pixels
    pub width: u32,

    /// Frame height in pixels
    pub height: u32,

    /// Pixel format
    pub format: ImageFormat,

    /// Bounds used to scale this frame
    pub bounds: ScaleBounds,

    /// Pixel bytes, row-major
    pub data: Bytes,
}

impl RenderedFrame {
    /// Pixel at (row, column) as an RGB triple
    pub fn pixel(&self, row: usize, column: usize) -> [u8; 3] {
        let offset = (row * self.width as usize + column) * 3;
        [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ]
    }
}

/// Image format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    Rgb8,
}

impl ImageFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb8 => 3,
        }
    }
}
